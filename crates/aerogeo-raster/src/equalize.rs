//! Per-band histogram equalization.
//!
//! The classic CDF remap over 256 bins, applied to each band
//! independently. Input values are expected in the 0-255 range of the
//! working format.

use crate::grid::PixelGrid;

const BINS: usize = 256;

/// Equalize each band of a grid in place.
pub fn equalize_histogram<const C: usize>(grid: &mut PixelGrid<f32, C>) {
    let pixels = grid.rows() * grid.cols();
    if pixels == 0 {
        return;
    }

    for channel in 0..C {
        let mut hist = [0usize; BINS];
        for pixel in grid.as_slice().chunks_exact(C) {
            let bin = pixel[channel].round().clamp(0.0, 255.0) as usize;
            hist[bin] += 1;
        }

        let mut cdf = [0usize; BINS];
        let mut running = 0;
        for (bin, &count) in hist.iter().enumerate() {
            running += count;
            cdf[bin] = running;
        }

        let cdf_min = cdf
            .iter()
            .copied()
            .find(|&c| c > 0)
            .unwrap_or(0);
        if pixels == cdf_min {
            // Single-valued band; equalization is undefined, leave it be.
            continue;
        }

        let scale = 255.0 / (pixels - cdf_min) as f64;
        let mut lut = [0.0f32; BINS];
        for (bin, value) in lut.iter_mut().enumerate() {
            *value = ((cdf[bin].saturating_sub(cdf_min)) as f64 * scale) as f32;
        }

        for pixel in grid.as_slice_mut().chunks_exact_mut(C) {
            let bin = pixel[channel].round().clamp(0.0, 255.0) as usize;
            pixel[channel] = lut[bin];
        }
    }
}
