/// An error type for elevation sources.
#[derive(thiserror::Error, Debug)]
pub enum ElevationError {
    /// Error opening or reading a DEM file.
    #[error("failed to read DEM file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error decoding the DEM raster.
    #[error("failed to decode DEM raster. {0}")]
    TiffDecodingError(#[from] tiff::TiffError),

    /// The DEM raster carries no usable georeferencing tags.
    #[error("DEM is not georeferenced: {0}")]
    NotGeoreferenced(std::path::PathBuf),

    /// The DEM raster is in a layout this sampler does not handle.
    #[error("unsupported DEM layout: {0}")]
    UnsupportedDem(String),

    /// Error building the HTTP client for a remote service.
    #[error("failed to build elevation service client. {0}")]
    HttpClientError(#[from] reqwest::Error),
}
