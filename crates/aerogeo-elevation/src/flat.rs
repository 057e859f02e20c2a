use crate::sample::{ElevationOrigin, ElevationSample, GeoPoint};
use crate::ElevationSampler;

/// Flat-plane elevation: every point sits at the ground elevation implied by
/// the image's own MSL/AGL pair (`absolute_altitude - relative_altitude`).
///
/// Constant time, never fails, and idempotent by construction.
#[derive(Debug, Clone, Copy)]
pub struct FlatPlane {
    ground_elevation_m: f64,
}

impl FlatPlane {
    /// A plane at the given ground elevation in meters.
    pub fn new(ground_elevation_m: f64) -> Self {
        Self { ground_elevation_m }
    }
}

impl ElevationSampler for FlatPlane {
    fn sample(&self, point: GeoPoint) -> ElevationSample {
        ElevationSample::resolved(point, self.ground_elevation_m, ElevationOrigin::FlatPlane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_everywhere() {
        let plane = FlatPlane::new(20.0);
        let a = plane.sample(GeoPoint::new(-122.0, 45.0));
        let b = plane.sample(GeoPoint::new(8.5, 47.3));
        assert_eq!(a.meters, Some(20.0));
        assert_eq!(b.meters, Some(20.0));
        assert_eq!(a.origin, ElevationOrigin::FlatPlane);
    }

    #[test]
    fn idempotent_per_point() {
        let plane = FlatPlane::new(-4.25);
        let p = GeoPoint::new(2.35, 48.86);
        assert_eq!(plane.sample(p), plane.sample(p));
    }
}
