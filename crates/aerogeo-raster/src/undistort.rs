//! Lens distortion correction with the Brown-Conrady radial/tangential
//! model.
//!
//! Calibration coefficients come from an external per-camera/lens database;
//! this module only applies them. The corrected image is built by inverse
//! mapping: for each undistorted output pixel, the distortion model gives
//! the source position in the captured image, which is bilinearly sampled.

use rayon::prelude::*;

use aerogeo_camera::OpticsModel;

use crate::grid::PixelGrid;
use crate::warp::bilinear_sample;

/// Brown-Conrady distortion coefficients for a camera/lens pairing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LensCalibration {
    /// First radial coefficient.
    pub k1: f64,
    /// Second radial coefficient.
    pub k2: f64,
    /// Third radial coefficient.
    pub k3: f64,
    /// First tangential coefficient.
    pub p1: f64,
    /// Second tangential coefficient.
    pub p2: f64,
}

impl LensCalibration {
    /// Whether all coefficients are zero, i.e. correction is a no-op.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Pinhole intrinsics in pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length along x, pixels.
    pub fx: f64,
    /// Focal length along y, pixels.
    pub fy: f64,
    /// Principal point x, pixels.
    pub cx: f64,
    /// Principal point y, pixels.
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Intrinsics implied by an optics model, with the principal point at
    /// the image center.
    pub fn from_optics(optics: &OpticsModel) -> Self {
        let fx = optics.focal_length_mm / optics.sensor_width_mm * optics.image_width as f64;
        let fy = optics.focal_length_mm / optics.sensor_height_mm * optics.image_height as f64;
        Self {
            fx,
            fy,
            cx: optics.image_width as f64 / 2.0,
            cy: optics.image_height as f64 / 2.0,
        }
    }
}

/// Apply the distortion model to an undistorted pixel position, returning
/// where that ray actually landed in the captured image.
pub fn distort_point(
    x: f64,
    y: f64,
    intrinsics: &CameraIntrinsics,
    calibration: &LensCalibration,
) -> (f64, f64) {
    let (fx, fy, cx, cy) = (intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy);
    let LensCalibration { k1, k2, k3, p1, p2 } = *calibration;

    // normalized image-plane coordinates
    let xn = (x - cx) / fx;
    let yn = (y - cy) / fy;

    let r2 = xn * xn + yn * yn;
    let radial = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));

    let xd = xn * radial + 2.0 * p1 * xn * yn + p2 * (r2 + 2.0 * xn * xn);
    let yd = yn * radial + p1 * (r2 + 2.0 * yn * yn) + 2.0 * p2 * xn * yn;

    (fx * xd + cx, fy * yd + cy)
}

/// Resample a grid into its undistorted geometry.
///
/// Output pixels whose distorted source falls outside the captured frame
/// stay at zero.
pub fn undistort_grid<const C: usize>(
    src: &PixelGrid<f32, C>,
    intrinsics: &CameraIntrinsics,
    calibration: &LensCalibration,
) -> PixelGrid<f32, C> {
    if calibration.is_identity() {
        return src.clone();
    }

    let cols = src.cols();
    let (src_max_x, src_max_y) = ((src.cols() - 1) as f32, (src.rows() - 1) as f32);
    let mut dst = PixelGrid::<f32, C>::from_size_val(src.size(), 0.0);

    dst.as_slice_mut()
        .par_chunks_exact_mut(cols * C)
        .enumerate()
        .for_each(|(row, dst_row)| {
            for (col, pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let (sx, sy) = distort_point(col as f64, row as f64, intrinsics, calibration);
                let (sx, sy) = (sx as f32, sy as f32);
                if sx >= 0.0 && sx <= src_max_x && sy >= 0.0 && sy <= src_max_y {
                    pixel.copy_from_slice(&bilinear_sample(src, sx, sy));
                }
            }
        });

    dst
}
