//! The fixed orientation convention shared across the pipeline.
//!
//! World frame: local east-north-up (ENU) centered at the camera. Camera
//! frame: +X to the image right, +Y down the image, +Z along the boresight.
//! Angles, all in degrees at the API surface:
//!
//! * `yaw` — heading clockwise from true north (the direction the image top
//!   edge faces),
//! * `pitch` — boresight tilt from nadir toward the heading (0 = straight
//!   down, 90 = horizon),
//! * `roll` — sideways tilt about the heading axis; positive roll swings
//!   the view to the left of the heading.
//!
//! The world-from-camera rotation composes yaw, then pitch, then roll:
//! `R = Rz(-yaw) * Rx(pitch) * Ry(roll) * M0`, where `M0 = diag(1, -1, -1)`
//! maps the nadir-looking, north-up camera onto ENU. The magnetic
//! declination correction feeds the same yaw definition.

use glam::{DMat3, DVec3};

use aerogeo_camera::CameraPose;

/// World-from-camera rotation matrix for a pose.
pub fn world_from_camera(pose: &CameraPose) -> DMat3 {
    let yaw = pose.yaw_deg.to_radians();
    let pitch = pose.pitch_deg.to_radians();
    let roll = pose.roll_deg.to_radians();

    let m0 = DMat3::from_diagonal(DVec3::new(1.0, -1.0, -1.0));
    DMat3::from_rotation_z(-yaw) * DMat3::from_rotation_x(pitch) * DMat3::from_rotation_y(roll) * m0
}

/// Unit rays through the four image corners in camera space, ordered
/// top-left, top-right, bottom-right, bottom-left.
///
/// Each corner sits half a field of view off the boresight in each axis.
pub fn corner_rays(fov_x: f64, fov_y: f64) -> [DVec3; 4] {
    let tx = (fov_x / 2.0).tan();
    let ty = (fov_y / 2.0).tan();
    [
        DVec3::new(-tx, -ty, 1.0).normalize(),
        DVec3::new(tx, -ty, 1.0).normalize(),
        DVec3::new(tx, ty, 1.0).normalize(),
        DVec3::new(-tx, ty, 1.0).normalize(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerogeo_camera::CaptureTime;
    use approx::assert_relative_eq;

    fn pose(yaw_deg: f64, pitch_deg: f64, roll_deg: f64) -> CameraPose {
        CameraPose {
            latitude: 45.0,
            longitude: -122.0,
            altitude_msl: 120.0,
            altitude_agl: 100.0,
            roll_deg,
            pitch_deg,
            yaw_deg,
            captured_at: CaptureTime::parse("2024:05:01 10:30:00").unwrap(),
        }
    }

    #[test]
    fn nadir_boresight_points_down() {
        let r = world_from_camera(&pose(0.0, 0.0, 0.0));
        let boresight = r * DVec3::Z;
        assert_relative_eq!(boresight.z, -1.0, epsilon = 1e-12);

        // Image top (-Y in camera space) faces north at zero yaw.
        let image_top = r * -DVec3::Y;
        assert_relative_eq!(image_top.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn yaw_rotates_heading_clockwise() {
        let r = world_from_camera(&pose(90.0, 0.0, 0.0));
        // Heading east: the image top now faces east.
        let image_top = r * -DVec3::Y;
        assert_relative_eq!(image_top.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(image_top.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pitch_tips_boresight_toward_heading() {
        let r = world_from_camera(&pose(0.0, 90.0, 0.0));
        let boresight = r * DVec3::Z;
        // At 90 degrees the boresight lies on the horizon, pointing north.
        assert_relative_eq!(boresight.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(boresight.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn roll_tips_boresight_sideways() {
        let r = world_from_camera(&pose(0.0, 0.0, 10.0));
        let boresight = r * DVec3::Z;
        // Positive roll swings the view west of a northbound heading.
        assert!(boresight.x < 0.0);
        assert_relative_eq!(boresight.y, 0.0, epsilon = 1e-12);
        assert!(boresight.z < 0.0);
    }

    #[test]
    fn rotation_is_orthonormal() {
        let r = world_from_camera(&pose(37.0, 21.0, -8.0));
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        let should_be_identity = r * r.transpose();
        assert_relative_eq!(should_be_identity.x_axis.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(should_be_identity.y_axis.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(should_be_identity.x_axis.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn corner_rays_are_ordered_and_unit() {
        let rays = corner_rays(1.2, 0.9);
        for ray in rays {
            assert_relative_eq!(ray.length(), 1.0, epsilon = 1e-12);
        }
        // Top corners have negative camera-Y, left corners negative camera-X.
        assert!(rays[0].x < 0.0 && rays[0].y < 0.0);
        assert!(rays[1].x > 0.0 && rays[1].y < 0.0);
        assert!(rays[2].x > 0.0 && rays[2].y > 0.0);
        assert!(rays[3].x < 0.0 && rays[3].y > 0.0);
    }
}
