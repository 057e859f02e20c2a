//! Projection of the four sensor-corner rays onto the terrain surface.
//!
//! The ground elevation under each corner depends on where the corner ray
//! lands, which depends on the elevation, so the intersection runs as a
//! bounded fixed-point loop: project at the current elevation estimate,
//! re-sample the elevation there, repeat until the estimate settles or the
//! iteration cap is reached. Hitting the cap is not an error; the last
//! estimate is used.

use glam::DVec3;

use aerogeo_camera::{CameraPose, OpticsModel};
use aerogeo_elevation::{ElevationSampler, GeoPoint};

use crate::error::FootprintError;
use crate::geodesy::{geo_offset, offset_geo};
use crate::rotation::{corner_rays, world_from_camera};

/// Two corners closer than this are considered coincident, meters.
const MIN_CORNER_SEPARATION_M: f64 = 0.01;
/// Polygons smaller than this are considered degenerate, square meters.
const MIN_AREA_M2: f64 = 1.0;

/// Tuning knobs for the terrain-intersection refinement.
#[derive(Debug, Clone, Copy)]
pub struct ProjectorParams {
    /// Stop refining once every corner's elevation estimate moves less than
    /// this between iterations, meters.
    pub tolerance_m: f64,
    /// Upper bound on refinement iterations.
    pub max_iterations: u32,
    /// Rays are clamped to this slant length; a clamped corner marks the
    /// footprint low-confidence, meters.
    pub max_ray_length_m: f64,
}

impl Default for ProjectorParams {
    fn default() -> Self {
        Self {
            tolerance_m: 0.1,
            max_iterations: 10,
            max_ray_length_m: 10_000.0,
        }
    }
}

/// The ground polygon observed by the sensor, with corners in image order:
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Ground corners, image corner order, WGS84 degrees.
    pub corners: [GeoPoint; 4],
    /// Horizontal field of view used for the projection, radians.
    pub fov_x: f64,
    /// Vertical field of view used for the projection, radians.
    pub fov_y: f64,
    /// Set when a near-horizon ray was clamped to the maximum length.
    pub low_confidence: bool,
}

impl Footprint {
    /// The corners as a closed ring (first corner repeated), the form
    /// GeoJSON polygons expect.
    pub fn closed_ring(&self) -> [GeoPoint; 5] {
        [
            self.corners[0],
            self.corners[1],
            self.corners[2],
            self.corners[3],
            self.corners[0],
        ]
    }

    /// Polygon area in square meters, via the shoelace formula on local
    /// east/north offsets around `origin`.
    pub fn area_m2(&self, origin: GeoPoint) -> f64 {
        let pts: Vec<(f64, f64)> = self
            .corners
            .iter()
            .map(|&c| geo_offset(origin, c))
            .collect();
        shoelace_area(&pts)
    }
}

fn shoelace_area(pts: &[(f64, f64)]) -> f64 {
    let mut twice_area = 0.0;
    for i in 0..pts.len() {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % pts.len()];
        twice_area += x0 * y1 - x1 * y0;
    }
    (twice_area / 2.0).abs()
}

/// Project the sensor footprint onto the terrain.
///
/// The flat-plane estimate from the pose's own MSL/AGL pair seeds the
/// refinement; `sampler` supplies elevations at candidate ground points.
/// Samples the provider cannot resolve fall back to the previous estimate
/// for that corner, so an unavailable elevation source degrades to the
/// flat-plane footprint instead of failing.
///
/// # Arguments
///
/// * `pose` - The acquisition pose, orientation per [`crate::rotation`].
/// * `optics` - The capturing optics; field of view is derived from it.
/// * `sampler` - The configured elevation source.
/// * `params` - Refinement tuning (tolerance, iteration cap, ray clamp).
///
/// # Errors
///
/// [`FootprintError::DegenerateFootprint`] when a corner ray points at or
/// above the horizon, corners coincide, or the polygon has no usable area;
/// [`FootprintError::InvalidOptics`] when the optics cannot form an image.
pub fn project(
    pose: &CameraPose,
    optics: &OpticsModel,
    sampler: &dyn ElevationSampler,
    params: &ProjectorParams,
) -> Result<Footprint, FootprintError> {
    if optics.focal_length_mm <= 0.0 {
        return Err(FootprintError::InvalidOptics(format!(
            "focal length {} mm",
            optics.focal_length_mm
        )));
    }
    if optics.sensor_width_mm <= 0.0 || optics.sensor_height_mm <= 0.0 {
        return Err(FootprintError::InvalidOptics(format!(
            "sensor {}x{} mm",
            optics.sensor_width_mm, optics.sensor_height_mm
        )));
    }

    let fov_x = optics.fov_x();
    let fov_y = optics.fov_y();
    let rotation = world_from_camera(pose);
    let rays = corner_rays(fov_x, fov_y).map(|ray| rotation * ray);

    for ray in &rays {
        if ray.z >= 0.0 {
            return Err(FootprintError::DegenerateFootprint(format!(
                "corner ray points at or above the horizon (pitch {} deg)",
                pose.pitch_deg
            )));
        }
    }

    let origin = GeoPoint::new(pose.longitude, pose.latitude);
    let mut elevations = [pose.ground_elevation(); 4];
    let mut low_confidence = false;
    let mut fallback_logged = false;

    for iteration in 0..params.max_iterations {
        let candidates = ground_candidates(pose, origin, &rays, &elevations, params)?;
        let geo: Vec<GeoPoint> = candidates.iter().map(|c| c.geo).collect();
        low_confidence |= candidates.iter().any(|c| c.clamped);

        let samples = sampler.sample_many(&geo);
        let mut max_delta = 0.0_f64;
        for (elevation, sample) in elevations.iter_mut().zip(&samples) {
            match sample.meters {
                Some(meters) => {
                    max_delta = max_delta.max((meters - *elevation).abs());
                    *elevation = meters;
                }
                None if !fallback_logged => {
                    log::warn!(
                        "elevation unavailable at ({:.6}, {:.6}), keeping flat-plane estimate",
                        sample.point.lon,
                        sample.point.lat
                    );
                    fallback_logged = true;
                }
                None => {}
            }
        }

        if max_delta < params.tolerance_m {
            break;
        }
        if iteration + 1 == params.max_iterations {
            log::debug!(
                "terrain refinement hit the {} iteration cap (last delta {max_delta:.2} m)",
                params.max_iterations
            );
        }
    }

    let finals = ground_candidates(pose, origin, &rays, &elevations, params)?;
    low_confidence |= finals.iter().any(|c| c.clamped);

    let enu: Vec<(f64, f64)> = finals.iter().map(|c| (c.east, c.north)).collect();
    for i in 0..enu.len() {
        for j in (i + 1)..enu.len() {
            let (dx, dy) = (enu[i].0 - enu[j].0, enu[i].1 - enu[j].1);
            if (dx * dx + dy * dy).sqrt() < MIN_CORNER_SEPARATION_M {
                return Err(FootprintError::DegenerateFootprint(format!(
                    "corners {i} and {j} coincide"
                )));
            }
        }
    }
    let area = shoelace_area(&enu);
    if area < MIN_AREA_M2 {
        return Err(FootprintError::DegenerateFootprint(format!(
            "near-zero polygon area ({area:.3} m2)"
        )));
    }

    Ok(Footprint {
        corners: [finals[0].geo, finals[1].geo, finals[2].geo, finals[3].geo],
        fov_x,
        fov_y,
        low_confidence,
    })
}

struct GroundCandidate {
    east: f64,
    north: f64,
    geo: GeoPoint,
    clamped: bool,
}

fn ground_candidates(
    pose: &CameraPose,
    origin: GeoPoint,
    rays: &[DVec3; 4],
    elevations: &[f64; 4],
    params: &ProjectorParams,
) -> Result<Vec<GroundCandidate>, FootprintError> {
    rays.iter()
        .zip(elevations)
        .map(|(ray, &elevation)| {
            let height = pose.altitude_msl - elevation;
            if height <= 0.0 {
                return Err(FootprintError::DegenerateFootprint(format!(
                    "camera altitude {:.1} m is below the terrain estimate {elevation:.1} m",
                    pose.altitude_msl
                )));
            }
            let slant = height / -ray.z;
            let clamped = slant > params.max_ray_length_m;
            let slant = slant.min(params.max_ray_length_m);
            let east = slant * ray.x;
            let north = slant * ray.y;
            Ok(GroundCandidate {
                east,
                north,
                geo: offset_geo(origin, east, north),
                clamped,
            })
        })
        .collect()
}
