#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// target coordinate reference systems.
pub mod crs;

/// per-band histogram equalization.
pub mod equalize;

/// error types for the georeferencing module.
pub mod error;

/// the per-image georeferencing sequence.
pub mod georef;

/// GeoTIFF output.
pub mod geotiff;

/// pixel grid container.
pub mod grid;

/// ground-control transforms.
pub mod transform;

/// lens distortion correction.
pub mod undistort;

/// inverse-map warping.
pub mod warp;

pub use crate::crs::Crs;
pub use crate::error::RasterError;
pub use crate::georef::{georeference_rgb, GeorefOptions, GeorefOutput};
pub use crate::geotiff::{write_geotiff_mono8, write_geotiff_rgb8, GeoTiffOptions};
pub use crate::grid::{GridSize, PixelGrid};
pub use crate::transform::{fit_transform, GeoTransform, GroundControlPoint, PixelToWorld};
pub use crate::undistort::{CameraIntrinsics, LensCalibration};
