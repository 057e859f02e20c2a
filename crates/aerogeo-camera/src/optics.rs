/// Width and height of the 35 mm reference frame, millimeters.
const FULL_FRAME_MM: (f64, f64) = (36.0, 24.0);

/// The optics of the capturing sensor.
///
/// Field-of-view angles are always derived from the focal length and the
/// physical sensor size; they are never stored, so they cannot drift out of
/// sync. Constructed once per image and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticsModel {
    /// Focal length, millimeters.
    pub focal_length_mm: f64,
    /// Physical sensor width, millimeters.
    pub sensor_width_mm: f64,
    /// Physical sensor height, millimeters.
    pub sensor_height_mm: f64,
    /// Image width, pixels.
    pub image_width: u32,
    /// Image height, pixels.
    pub image_height: u32,
    /// 35 mm-equivalent focal length, when reported.
    pub focal_length_35mm: Option<f64>,
}

impl OpticsModel {
    /// Horizontal field of view, radians.
    pub fn fov_x(&self) -> f64 {
        2.0 * (self.sensor_width_mm / (2.0 * self.focal_length_mm)).atan()
    }

    /// Vertical field of view, radians.
    pub fn fov_y(&self) -> f64 {
        2.0 * (self.sensor_height_mm / (2.0 * self.focal_length_mm)).atan()
    }

    /// Ground sample distance at the given height above ground, meters per
    /// pixel along the sensor width.
    pub fn ground_sample_distance(&self, altitude_agl_m: f64) -> f64 {
        (self.sensor_width_mm * altitude_agl_m) / (self.focal_length_mm * self.image_width as f64)
    }

    /// Sensor dimensions implied by a 35 mm-equivalent focal length.
    ///
    /// The crop factor relates the physical focal length to its full-frame
    /// equivalent; scaling the 36x24 mm reference frame by it recovers the
    /// sensor size when no reference-table entry exists.
    pub fn sensor_from_crop_factor(focal_length_mm: f64, focal_length_35mm: f64) -> (f64, f64) {
        let crop = focal_length_35mm / focal_length_mm;
        (FULL_FRAME_MM.0 / crop, FULL_FRAME_MM.1 / crop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mini3_optics() -> OpticsModel {
        OpticsModel {
            focal_length_mm: 4.5,
            sensor_width_mm: 6.3,
            sensor_height_mm: 4.7,
            image_width: 4000,
            image_height: 3000,
            focal_length_35mm: None,
        }
    }

    #[test]
    fn fov_matches_closed_form() {
        let optics = mini3_optics();
        assert_relative_eq!(optics.fov_x(), 2.0 * (6.3f64 / 9.0).atan());
        assert_relative_eq!(optics.fov_y(), 2.0 * (4.7f64 / 9.0).atan());
        assert!(optics.fov_x() > optics.fov_y());
    }

    #[test]
    fn longer_focal_narrows_fov() {
        let wide = mini3_optics();
        let tele = OpticsModel {
            focal_length_mm: 9.0,
            ..wide
        };
        assert!(tele.fov_x() < wide.fov_x());
        assert!(tele.fov_y() < wide.fov_y());
    }

    #[test]
    fn crop_factor_fallback() {
        // 4.5 mm with a 24 mm equivalent is a crop factor of 5.33.
        let (w, h) = OpticsModel::sensor_from_crop_factor(4.5, 24.0);
        assert_relative_eq!(w, 6.75, epsilon = 1e-12);
        assert_relative_eq!(h, 4.5, epsilon = 1e-12);
    }

    #[test]
    fn gsd_scales_with_altitude() {
        let optics = mini3_optics();
        let gsd100 = optics.ground_sample_distance(100.0);
        assert_relative_eq!(gsd100, 6.3 * 100.0 / (4.5 * 4000.0));
        assert_relative_eq!(optics.ground_sample_distance(200.0), 2.0 * gsd100);
    }
}
