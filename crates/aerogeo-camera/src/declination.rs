//! Magnetic declination correction for compass-referenced yaw.
//!
//! Gimbal yaw is measured against magnetic north; footprint projection
//! needs true north. The correction adds the local declination to yaw when
//! enabled. The declination value comes from a [`DeclinationModel`], a
//! deterministic function of position and date that callers can replace
//! with a full geomagnetic model; the shipped [`DipoleDeclination`] is the
//! first-order IGRF dipole, which is accurate to a few degrees and adequate
//! for this best-effort correction.

use crate::pose::{normalize_degrees, CameraPose, CaptureTime};

/// An error type for declination lookups.
#[derive(thiserror::Error, Debug)]
pub enum DeclinationError {
    /// The model has no coverage for the requested date.
    #[error("no model coverage for year {0}")]
    DateOutOfRange(i32),

    /// The query position is not a valid geographic coordinate.
    #[error("invalid position: lat {lat}, lon {lon}")]
    InvalidPosition {
        /// Latitude of the rejected query, degrees.
        lat: f64,
        /// Longitude of the rejected query, degrees.
        lon: f64,
    },
}

/// A source of magnetic declination values.
///
/// Implementations must be deterministic in position and date.
pub trait DeclinationModel {
    /// Declination at a geographic position and date, degrees, positive
    /// east of true north.
    fn declination_deg(
        &self,
        latitude: f64,
        longitude: f64,
        when: &CaptureTime,
    ) -> Result<f64, DeclinationError>;
}

// IGRF-13 epoch 2020 dipole coefficients (nT) and secular variation (nT/yr).
const G10: f64 = -29404.8;
const G11: f64 = -1450.9;
const H11: f64 = 4652.5;
const G10_SV: f64 = 5.7;
const G11_SV: f64 = 7.4;
const H11_SV: f64 = -25.9;
const EPOCH: f64 = 2020.0;

/// First-order (dipole) geomagnetic declination model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DipoleDeclination;

impl DeclinationModel for DipoleDeclination {
    fn declination_deg(
        &self,
        latitude: f64,
        longitude: f64,
        when: &CaptureTime,
    ) -> Result<f64, DeclinationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DeclinationError::InvalidPosition {
                lat: latitude,
                lon: longitude,
            });
        }
        // Linear secular variation only holds near the model epoch.
        if !(2015..=2035).contains(&when.year) {
            return Err(DeclinationError::DateOutOfRange(when.year));
        }

        let dt = when.decimal_year() - EPOCH;
        let g10 = G10 + dt * G10_SV;
        let g11 = G11 + dt * G11_SV;
        let h11 = H11 + dt * H11_SV;

        let theta = (90.0 - latitude).to_radians();
        let phi = longitude.to_radians();

        // Surface field of a centered dipole in local geomagnetic components.
        let b_theta = g10 * theta.sin() - (g11 * phi.cos() + h11 * phi.sin()) * theta.cos();
        let b_phi = g11 * phi.sin() - h11 * phi.cos();

        let north = -b_theta;
        let east = b_phi;
        Ok(east.atan2(north).to_degrees())
    }
}

/// Apply magnetic-declination correction to a pose's yaw.
///
/// When `enabled` is false the pose is returned unchanged. A failed
/// declination lookup is non-fatal: it is logged and the pose is returned
/// unchanged, since an uncorrected heading is still usable.
pub fn correct_yaw(pose: CameraPose, enabled: bool, model: &dyn DeclinationModel) -> CameraPose {
    if !enabled {
        return pose;
    }
    match model.declination_deg(pose.latitude, pose.longitude, &pose.captured_at) {
        Ok(declination) => {
            let yaw_deg = normalize_degrees(pose.yaw_deg + declination);
            log::debug!(
                "declination {declination:.2} deg applied: yaw {:.2} -> {yaw_deg:.2}",
                pose.yaw_deg
            );
            CameraPose { yaw_deg, ..pose }
        }
        Err(err) => {
            log::warn!("declination lookup failed, yaw left uncorrected: {err}");
            pose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pose_at(latitude: f64, longitude: f64, yaw_deg: f64, year: i32) -> CameraPose {
        CameraPose {
            latitude,
            longitude,
            altitude_msl: 120.0,
            altitude_agl: 100.0,
            roll_deg: 0.0,
            pitch_deg: 0.0,
            yaw_deg,
            captured_at: CaptureTime::parse(&format!("{year}:06:01 12:00:00")).unwrap(),
        }
    }

    #[test]
    fn dipole_is_deterministic() {
        let pose = pose_at(45.0, -122.0, 0.0, 2024);
        let model = DipoleDeclination;
        let a = model
            .declination_deg(pose.latitude, pose.longitude, &pose.captured_at)
            .unwrap();
        let b = model
            .declination_deg(pose.latitude, pose.longitude, &pose.captured_at)
            .unwrap();
        assert_relative_eq!(a, b);
    }

    #[test]
    fn pacific_northwest_declination_is_easterly() {
        let pose = pose_at(45.0, -122.0, 0.0, 2024);
        let d = DipoleDeclination
            .declination_deg(pose.latitude, pose.longitude, &pose.captured_at)
            .unwrap();
        // The dipole model should land in the right quadrant and rough
        // magnitude for Oregon (true value is about +14.5 east).
        assert!(d > 5.0 && d < 25.0, "declination {d}");
    }

    #[test]
    fn disabled_correction_is_identity() {
        let pose = pose_at(45.0, -122.0, 10.0, 2024);
        let corrected = correct_yaw(pose, false, &DipoleDeclination);
        assert_eq!(corrected, pose);
    }

    #[test]
    fn correction_shifts_and_wraps_yaw() {
        let pose = pose_at(45.0, -122.0, 355.0, 2024);
        let corrected = correct_yaw(pose, true, &DipoleDeclination);
        assert!(corrected.yaw_deg >= 0.0 && corrected.yaw_deg < 360.0);
        assert!(corrected.yaw_deg != pose.yaw_deg);
        // Only yaw may change.
        assert_eq!(corrected.pitch_deg, pose.pitch_deg);
        assert_eq!(corrected.roll_deg, pose.roll_deg);
    }

    #[test]
    fn lookup_failure_leaves_pose_unchanged() {
        let pose = pose_at(45.0, -122.0, 10.0, 1980);
        let corrected = correct_yaw(pose, true, &DipoleDeclination);
        assert_eq!(corrected, pose);
    }
}
