//! The georeferencing sequence for one image.
//!
//! Optional lens correction and equalization first, then ground-control
//! fitting from the footprint corners, inverse-map warping into the target
//! CRS, and GeoTIFF output.

use std::path::{Path, PathBuf};

use aerogeo_camera::OpticsModel;
use aerogeo_footprint::Footprint;

use crate::crs::Crs;
use crate::equalize::equalize_histogram;
use crate::error::RasterError;
use crate::geotiff::{write_geotiff_rgb8, GeoTiffOptions};
use crate::grid::PixelGrid;
use crate::transform::{fit_transform, GeoTransform, GroundControlPoint, PixelToWorld};
use crate::undistort::{undistort_grid, CameraIntrinsics, LensCalibration};
use crate::warp::{warp_to_world, NODATA};

/// Options for [`georeference_rgb`].
#[derive(Debug, Clone, Copy)]
pub struct GeorefOptions {
    /// EPSG code of the target CRS.
    pub epsg: u32,
    /// Lens distortion coefficients to apply, when correction is enabled
    /// and the calibration database knows the camera.
    pub lens_calibration: Option<LensCalibration>,
    /// Apply per-band histogram equalization.
    pub equalize: bool,
    /// Write cloud-optimized output (overview pyramid, bounded strips).
    pub cloud_optimized: bool,
    /// Affine-fit residual tolerance, in output pixels, beyond which the
    /// projective transform is used.
    pub residual_threshold_px: f64,
}

impl GeorefOptions {
    /// Options for a target CRS with everything else at defaults.
    pub fn new(epsg: u32) -> Self {
        Self {
            epsg,
            lens_calibration: None,
            equalize: false,
            cloud_optimized: false,
            residual_threshold_px: 0.5,
        }
    }
}

/// What the georeferencer produced for one image.
#[derive(Debug, Clone)]
pub struct GeorefOutput {
    /// Path of the written raster.
    pub path: PathBuf,
    /// Output geotransform in GDAL order.
    pub geotransform: [f64; 6],
    /// EPSG code of the output.
    pub epsg: u32,
    /// The fitted source-pixel-to-world mapping, tagged with the CRS.
    pub mapping: GeoTransform,
    /// Whether the projective fallback was needed (oblique shot).
    pub used_projective: bool,
}

/// Georeference an RGB pixel grid against its footprint and write the
/// result to `output_path`.
///
/// # Errors
///
/// [`RasterError::Reprojection`] for an unsupported target CRS or a
/// degenerate output extent, [`RasterError::SingularTransform`] when the
/// control points do not determine a mapping, and [`RasterError::Write`] /
/// [`RasterError::Encoding`] when the output cannot be written.
pub fn georeference_rgb(
    grid: &PixelGrid<f32, 3>,
    optics: &OpticsModel,
    footprint: &Footprint,
    output_path: impl AsRef<Path>,
    options: &GeorefOptions,
) -> Result<GeorefOutput, RasterError> {
    let output_path = output_path.as_ref();
    let crs = Crs::from_epsg(options.epsg)?;

    let mut working = match options.lens_calibration {
        Some(calibration) if !calibration.is_identity() => {
            let intrinsics = CameraIntrinsics::from_optics(optics);
            undistort_grid(grid, &intrinsics, &calibration)
        }
        _ => grid.clone(),
    };

    if options.equalize {
        equalize_histogram(&mut working);
    }

    let world: Vec<(f64, f64)> = footprint
        .corners
        .iter()
        .map(|&corner| crs.forward(corner))
        .collect();

    let (w, h) = (working.cols() as f64, working.rows() as f64);
    let gcps = [
        GroundControlPoint {
            pixel: (0.0, 0.0),
            world: world[0],
        },
        GroundControlPoint {
            pixel: (w - 1.0, 0.0),
            world: world[1],
        },
        GroundControlPoint {
            pixel: (w - 1.0, h - 1.0),
            world: world[2],
        },
        GroundControlPoint {
            pixel: (0.0, h - 1.0),
            world: world[3],
        },
    ];

    // Residual tolerance in world units: a fraction of the output pixel.
    let span_x = world
        .iter()
        .map(|c| c.0)
        .fold(f64::NEG_INFINITY, f64::max)
        - world.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let approx_pixel = span_x / w;
    let threshold = options.residual_threshold_px * approx_pixel;

    let mapping = fit_transform(&gcps, threshold)?;
    let used_projective = matches!(mapping, PixelToWorld::Projective(_));
    if used_projective {
        log::debug!("oblique geometry, using projective ground-control fit");
    }

    let warped = warp_to_world(&working, &mapping)?;
    let out = warped.grid.to_u8();

    write_geotiff_rgb8(
        output_path,
        &out,
        warped.geotransform,
        &GeoTiffOptions {
            epsg: crs.epsg(),
            geographic: crs.is_geographic(),
            cloud_optimized: options.cloud_optimized,
            nodata: Some(NODATA),
        },
    )?;

    log::info!(
        "georeferenced {}x{} image to {} (EPSG:{})",
        grid.cols(),
        grid.rows(),
        output_path.display(),
        crs.epsg()
    );

    Ok(GeorefOutput {
        path: output_path.to_path_buf(),
        geotransform: warped.geotransform,
        epsg: crs.epsg(),
        mapping: GeoTransform {
            mapping,
            epsg: crs.epsg(),
        },
        used_projective,
    })
}
