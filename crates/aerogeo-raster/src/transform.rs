//! Pixel-to-world transforms fitted from ground-control points.
//!
//! Four corner correspondences are fitted with a 6-parameter affine first;
//! when the shot is oblique enough that the affine residual exceeds the
//! threshold, the exact four-point projective transform takes over. The
//! selection is driven by the measured residual, not the pose, so a
//! near-nadir shot keeps the cheaper, better-conditioned affine.

use nalgebra::DMatrix;

use crate::error::RasterError;

/// A pairing of a pixel coordinate with its world coordinate in the target
/// CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPoint {
    /// Pixel coordinate (column, row).
    pub pixel: (f64, f64),
    /// World coordinate in the target CRS.
    pub world: (f64, f64),
}

/// A mapping from pixel coordinates to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelToWorld {
    /// Row-major 2x3 affine `[a, b, c, d, e, f]`:
    /// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
    Affine([f64; 6]),
    /// Row-major 3x3 projective matrix, `m[8] == 1`.
    Projective([f64; 9]),
}

/// A fitted pixel-to-world mapping tagged with its target CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// The pixel-to-world mapping.
    pub mapping: PixelToWorld,
    /// EPSG code of the world coordinates.
    pub epsg: u32,
}

impl PixelToWorld {
    /// Apply the mapping to a pixel coordinate.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Affine(m) => (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5]),
            Self::Projective(m) => {
                let w = m[6] * x + m[7] * y + m[8];
                (
                    (m[0] * x + m[1] * y + m[2]) / w,
                    (m[3] * x + m[4] * y + m[5]) / w,
                )
            }
        }
    }

    /// The inverse mapping (world to pixel).
    ///
    /// # Errors
    ///
    /// [`RasterError::SingularTransform`] when the mapping does not invert.
    pub fn inverse(&self) -> Result<PixelToWorld, RasterError> {
        match self {
            Self::Affine(m) => {
                let det = m[0] * m[4] - m[1] * m[3];
                if det.abs() < f64::EPSILON {
                    return Err(RasterError::SingularTransform(
                        "affine determinant is zero".into(),
                    ));
                }
                let inv_det = 1.0 / det;
                let a = m[4] * inv_det;
                let b = -m[1] * inv_det;
                let d = -m[3] * inv_det;
                let e = m[0] * inv_det;
                let c = -(a * m[2] + b * m[5]);
                let f = -(d * m[2] + e * m[5]);
                Ok(Self::Affine([a, b, c, d, e, f]))
            }
            Self::Projective(m) => {
                let det = determinant3x3(m);
                if det.abs() < f64::EPSILON {
                    return Err(RasterError::SingularTransform(
                        "projective determinant is zero".into(),
                    ));
                }
                let adj = adjugate3x3(m);
                // Normalize so the bottom-right entry stays 1.
                let scale = adj[8] / det;
                if scale.abs() < f64::EPSILON {
                    return Err(RasterError::SingularTransform(
                        "projective inverse is not normalizable".into(),
                    ));
                }
                let mut inv = [0.0; 9];
                for (dst, src) in inv.iter_mut().zip(adj) {
                    *dst = src / det / scale;
                }
                Ok(Self::Projective(inv))
            }
        }
    }
}

#[rustfmt::skip]
fn determinant3x3(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) -
    m[1] * (m[3] * m[8] - m[5] * m[6]) +
    m[2] * (m[3] * m[7] - m[4] * m[6])
}

#[rustfmt::skip]
fn adjugate3x3(m: &[f64; 9]) -> [f64; 9] {
    [
        m[4] * m[8] - m[5] * m[7],
        m[2] * m[7] - m[1] * m[8],
        m[1] * m[5] - m[2] * m[4],
        m[5] * m[6] - m[3] * m[8],
        m[0] * m[8] - m[2] * m[6],
        m[2] * m[3] - m[0] * m[5],
        m[3] * m[7] - m[4] * m[6],
        m[1] * m[6] - m[0] * m[7],
        m[0] * m[4] - m[1] * m[3],
    ]
}

/// Largest distance between a mapped pixel and its world coordinate.
pub fn max_residual(mapping: &PixelToWorld, gcps: &[GroundControlPoint]) -> f64 {
    gcps.iter()
        .map(|gcp| {
            let (x, y) = mapping.apply(gcp.pixel.0, gcp.pixel.1);
            let (dx, dy) = (x - gcp.world.0, y - gcp.world.1);
            (dx * dx + dy * dy).sqrt()
        })
        .fold(0.0, f64::max)
}

fn fit_affine(gcps: &[GroundControlPoint]) -> Result<PixelToWorld, RasterError> {
    let n = gcps.len();
    let mut design = DMatrix::zeros(n, 3);
    let mut wx = DMatrix::zeros(n, 1);
    let mut wy = DMatrix::zeros(n, 1);
    for (i, gcp) in gcps.iter().enumerate() {
        design[(i, 0)] = gcp.pixel.0;
        design[(i, 1)] = gcp.pixel.1;
        design[(i, 2)] = 1.0;
        wx[(i, 0)] = gcp.world.0;
        wy[(i, 0)] = gcp.world.1;
    }

    let normal = design.transpose() * &design;
    let lu = normal.lu();
    let bx = lu
        .solve(&(design.transpose() * wx))
        .ok_or_else(|| RasterError::SingularTransform("degenerate control points".into()))?;
    let by = lu
        .solve(&(design.transpose() * wy))
        .ok_or_else(|| RasterError::SingularTransform("degenerate control points".into()))?;

    Ok(PixelToWorld::Affine([
        bx[(0, 0)],
        bx[(1, 0)],
        bx[(2, 0)],
        by[(0, 0)],
        by[(1, 0)],
        by[(2, 0)],
    ]))
}

fn fit_projective(gcps: &[GroundControlPoint; 4]) -> Result<PixelToWorld, RasterError> {
    // Direct linear solve for h with h[8] fixed to 1: each correspondence
    // contributes one row for x' and one for y'.
    let mut a = DMatrix::zeros(8, 8);
    let mut b = DMatrix::zeros(8, 1);
    for (i, gcp) in gcps.iter().enumerate() {
        let (x, y) = gcp.pixel;
        let (u, v) = gcp.world;
        a[(2 * i, 0)] = x;
        a[(2 * i, 1)] = y;
        a[(2 * i, 2)] = 1.0;
        a[(2 * i, 6)] = -u * x;
        a[(2 * i, 7)] = -u * y;
        b[(2 * i, 0)] = u;
        a[(2 * i + 1, 3)] = x;
        a[(2 * i + 1, 4)] = y;
        a[(2 * i + 1, 5)] = 1.0;
        a[(2 * i + 1, 6)] = -v * x;
        a[(2 * i + 1, 7)] = -v * y;
        b[(2 * i + 1, 0)] = v;
    }

    let h = a
        .lu()
        .solve(&b)
        .ok_or_else(|| RasterError::SingularTransform("degenerate control points".into()))?;

    Ok(PixelToWorld::Projective([
        h[(0, 0)],
        h[(1, 0)],
        h[(2, 0)],
        h[(3, 0)],
        h[(4, 0)],
        h[(5, 0)],
        h[(6, 0)],
        h[(7, 0)],
        1.0,
    ]))
}

/// Fit a pixel-to-world mapping from four corner control points.
///
/// The affine fit is kept when its largest residual stays at or below
/// `residual_threshold` (in world units); otherwise the exact projective
/// transform through the four corners is used.
pub fn fit_transform(
    gcps: &[GroundControlPoint; 4],
    residual_threshold: f64,
) -> Result<PixelToWorld, RasterError> {
    let affine = fit_affine(gcps)?;
    let residual = max_residual(&affine, gcps);
    if residual <= residual_threshold {
        return Ok(affine);
    }
    log::debug!(
        "affine residual {residual:.3} exceeds threshold {residual_threshold:.3}, \
         falling back to projective"
    );
    fit_projective(gcps)
}
