//! Inverse-map resampling of the source grid into a world-aligned output.
//!
//! The output raster covers the bounding box of the projected footprint.
//! Each output pixel center is mapped back through the inverse transform to
//! a source pixel position and bilinearly sampled; pixels that land outside
//! the source stay at the fill value, recorded as nodata in the output.

use rayon::prelude::*;

use crate::error::RasterError;
use crate::grid::{GridSize, PixelGrid};
use crate::transform::PixelToWorld;

/// Fill value for output pixels with no source coverage.
pub const NODATA: f32 = 0.0;

/// Bilinear sample of an interleaved grid at a fractional pixel position.
///
/// Coordinates follow the map convention: a value of 0.0 samples the center
/// of pixel 0. The caller keeps `u`/`v` inside the grid.
pub(crate) fn bilinear_sample<const C: usize>(
    grid: &PixelGrid<f32, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let (rows, cols) = (grid.rows(), grid.cols());

    let iu0 = (u.trunc() as usize).min(cols - 1);
    let iv0 = (v.trunc() as usize).min(rows - 1);
    let iu1 = (iu0 + 1).min(cols - 1);
    let iv1 = (iv0 + 1).min(rows - 1);

    let frac_u = u.fract();
    let frac_v = v.fract();
    let w00 = (1.0 - frac_u) * (1.0 - frac_v);
    let w01 = frac_u * (1.0 - frac_v);
    let w10 = (1.0 - frac_u) * frac_v;
    let w11 = frac_u * frac_v;

    let data = grid.as_slice();
    let base00 = (iv0 * cols + iu0) * C;
    let base01 = (iv0 * cols + iu1) * C;
    let base10 = (iv1 * cols + iu0) * C;
    let base11 = (iv1 * cols + iu1) * C;

    let mut pixel = [0.0; C];
    for (k, value) in pixel.iter_mut().enumerate() {
        *value = data[base00 + k] * w00
            + data[base01 + k] * w01
            + data[base10 + k] * w10
            + data[base11 + k] * w11;
    }
    pixel
}

/// A warped raster plus the affine geotransform of its pixel grid, in GDAL
/// order `[origin_x, pixel_width, 0, origin_y, 0, -pixel_height]`.
#[derive(Debug, Clone)]
pub struct WarpedRaster<const C: usize> {
    /// The resampled pixel data.
    pub grid: PixelGrid<f32, C>,
    /// Output geotransform in GDAL order.
    pub geotransform: [f64; 6],
}

/// Resample `src` into a north-up world grid through a fitted transform.
///
/// The output resolution is chosen so the output width matches the source
/// width, with square pixels.
pub fn warp_to_world<const C: usize>(
    src: &PixelGrid<f32, C>,
    mapping: &PixelToWorld,
) -> Result<WarpedRaster<C>, RasterError> {
    let (w, h) = (src.cols() as f64, src.rows() as f64);
    let corners = [
        mapping.apply(0.0, 0.0),
        mapping.apply(w - 1.0, 0.0),
        mapping.apply(w - 1.0, h - 1.0),
        mapping.apply(0.0, h - 1.0),
    ];

    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    let span_x = max_x - min_x;
    let span_y = max_y - min_y;
    if !(span_x > 0.0 && span_y > 0.0) || !span_x.is_finite() || !span_y.is_finite() {
        return Err(RasterError::Reprojection(format!(
            "footprint spans a degenerate output extent ({span_x} x {span_y})"
        )));
    }

    let out_width = src.cols().max(1);
    let pixel_size = span_x / out_width as f64;
    let out_height = (span_y / pixel_size).ceil().max(1.0) as usize;

    let inverse = mapping.inverse()?;
    let mut grid = PixelGrid::<f32, C>::from_size_val(
        GridSize {
            width: out_width,
            height: out_height,
        },
        NODATA,
    );

    // Valid sample range in map convention: centers 0 to n-1.
    let (src_max_x, src_max_y) = ((src.cols() - 1) as f32, (src.rows() - 1) as f32);
    grid.as_slice_mut()
        .par_chunks_exact_mut(out_width * C)
        .enumerate()
        .for_each(|(row, out_row)| {
            let world_y = max_y - (row as f64 + 0.5) * pixel_size;
            for (col, pixel) in out_row.chunks_exact_mut(C).enumerate() {
                let world_x = min_x + (col as f64 + 0.5) * pixel_size;
                let (sx, sy) = inverse.apply(world_x, world_y);
                let (sx, sy) = (sx as f32, sy as f32);
                if sx >= 0.0 && sx <= src_max_x && sy >= 0.0 && sy <= src_max_y {
                    pixel.copy_from_slice(&bilinear_sample(src, sx, sy));
                }
            }
        });

    Ok(WarpedRaster {
        grid,
        geotransform: [min_x, pixel_size, 0.0, max_y, 0.0, -pixel_size],
    })
}
