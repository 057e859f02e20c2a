/// An error type for the georeferencing module.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    /// Pixel data does not match the declared grid shape.
    #[error("data length ({0}) does not match the grid size ({1})")]
    InvalidChannelShape(usize, usize),

    /// The target coordinate reference system is invalid or a point cannot
    /// be projected into it.
    #[error("reprojection failed: {0}")]
    Reprojection(String),

    /// The ground-control transform is singular.
    #[error("singular ground-control transform: {0}")]
    SingularTransform(String),

    /// Error writing the output raster.
    #[error("failed to write raster. {0}")]
    Write(#[from] std::io::Error),

    /// Error encoding the output raster.
    #[error("failed to encode raster. {0}")]
    Encoding(#[from] tiff::TiffError),
}
