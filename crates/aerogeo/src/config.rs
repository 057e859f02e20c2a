use std::path::PathBuf;

use aerogeo_footprint::ProjectorParams;

/// Where terrain elevation comes from, chosen once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElevationConfig {
    /// No elevation source: every image uses its own flat-plane estimate.
    Disabled,
    /// A local elevation raster (GeoTIFF DEM).
    LocalRaster(PathBuf),
    /// An Open-Elevation-compatible lookup endpoint.
    RemoteService(String),
}

/// Immutable configuration for one pipeline run.
///
/// A run's configuration is fixed up front and shared read-only by every
/// worker; nothing here changes between images, which is what makes the
/// per-image processing embarrassingly parallel.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// EPSG code of the output CRS.
    pub epsg: u32,
    /// Correct yaw for magnetic declination.
    pub correct_declination: bool,
    /// Apply lens distortion correction when calibration data is found.
    pub lens_correction: bool,
    /// Apply per-band histogram equalization.
    pub equalize: bool,
    /// Write cloud-optimized GeoTIFFs.
    pub cloud_optimized: bool,
    /// The elevation source for footprint refinement.
    pub elevation: ElevationConfig,
    /// Terrain-intersection refinement tuning.
    pub projector: ProjectorParams,
    /// Affine residual tolerance in output pixels before the projective
    /// ground-control fit takes over.
    pub residual_threshold_px: f64,
}

impl RunConfig {
    /// A configuration targeting the given EPSG code with every optional
    /// behavior off and default tuning.
    pub fn new(epsg: u32) -> Self {
        Self {
            epsg,
            correct_declination: false,
            lens_correction: false,
            equalize: false,
            cloud_optimized: false,
            elevation: ElevationConfig::Disabled,
            projector: ProjectorParams::default(),
            residual_threshold_px: 0.5,
        }
    }
}
