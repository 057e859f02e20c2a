use crate::error::CameraError;

/// Capture timestamp in the EXIF `YYYY:MM:DD HH:MM:SS` form.
///
/// Only calendar arithmetic needed by the declination model is provided; the
/// value is otherwise opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
    /// Second, 0-59.
    pub second: u32,
}

const DAYS_BEFORE_MONTH: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl CaptureTime {
    /// Parse an EXIF `DateTimeOriginal` string such as `2024:05:01 10:30:00`.
    pub fn parse(s: &str) -> Result<Self, CameraError> {
        let malformed = || CameraError::MalformedTimestamp(s.to_string());

        let (date, time) = s.trim().split_once(' ').ok_or_else(malformed)?;
        let mut date_parts = date.splitn(3, ':');
        let mut time_parts = time.splitn(3, ':');

        let next_u32 = |parts: &mut std::str::SplitN<'_, char>| -> Result<u32, CameraError> {
            parts
                .next()
                .and_then(|p| p.trim().parse::<u32>().ok())
                .ok_or_else(malformed)
        };

        let year = date_parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(malformed)?;
        let month = next_u32(&mut date_parts)?;
        let day = next_u32(&mut date_parts)?;
        let hour = next_u32(&mut time_parts)?;
        let minute = next_u32(&mut time_parts)?;
        // fractional seconds are discarded
        let second = time_parts
            .next()
            .and_then(|p| p.split('.').next())
            .and_then(|p| p.trim().parse::<u32>().ok())
            .ok_or_else(malformed)?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 59 {
            return Err(malformed());
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Day of year, 1-based.
    pub fn day_of_year(&self) -> u32 {
        let leap = (self.month > 2 && is_leap_year(self.year)) as u32;
        DAYS_BEFORE_MONTH[(self.month - 1) as usize] + self.day + leap
    }

    /// The timestamp expressed as a fractional year, e.g. 2024.331.
    ///
    /// This is the time argument geomagnetic models expect.
    pub fn decimal_year(&self) -> f64 {
        let days = if is_leap_year(self.year) { 366.0 } else { 365.0 };
        let day_fraction =
            (self.hour as f64 * 3600.0 + self.minute as f64 * 60.0 + self.second as f64) / 86_400.0;
        self.year as f64 + ((self.day_of_year() - 1) as f64 + day_fraction) / days
    }
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 {
        a + 360.0
    } else {
        a
    }
}

/// The resolved acquisition pose of one image.
///
/// Orientation follows a fixed convention shared with the footprint
/// projector: `yaw_deg` is the heading clockwise from true north,
/// `pitch_deg` is the boresight tilt away from nadir (0 = straight down,
/// 90 = horizon) and `roll_deg` is the bank about the boresight.
/// Constructed once per image and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Absolute altitude above mean sea level, meters.
    pub altitude_msl: f64,
    /// Altitude above ground level, meters. Non-negative.
    pub altitude_agl: f64,
    /// Bank about the boresight, degrees.
    pub roll_deg: f64,
    /// Boresight tilt from nadir, degrees.
    pub pitch_deg: f64,
    /// Heading clockwise from true north, degrees in `[0, 360)`.
    pub yaw_deg: f64,
    /// Time of capture.
    pub captured_at: CaptureTime,
}

impl CameraPose {
    /// Ground elevation implied by the pose's own MSL/AGL pair, meters.
    ///
    /// This is the flat-plane seed used when no elevation source is
    /// configured.
    pub fn ground_elevation(&self) -> f64 {
        self.altitude_msl - self.altitude_agl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_exif_timestamp() {
        let t = CaptureTime::parse("2024:05:01 10:30:00").unwrap();
        assert_eq!(t.year, 2024);
        assert_eq!(t.month, 5);
        assert_eq!(t.day, 1);
        assert_eq!(t.hour, 10);
        assert_eq!(t.day_of_year(), 122);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(CaptureTime::parse("yesterday").is_err());
        assert!(CaptureTime::parse("2024:13:01 10:30:00").is_err());
        assert!(CaptureTime::parse("2024:05:01").is_err());
    }

    #[test]
    fn decimal_year_midpoint() {
        let t = CaptureTime::parse("2023:07:02 12:00:00").unwrap();
        // July 2nd noon is the exact middle of a non-leap year.
        assert_relative_eq!(t.decimal_year(), 2023.5, epsilon = 1e-9);
    }

    #[test]
    fn normalizes_angles() {
        assert_relative_eq!(normalize_degrees(-10.0), 350.0);
        assert_relative_eq!(normalize_degrees(370.0), 10.0);
        assert_relative_eq!(normalize_degrees(0.0), 0.0);
    }
}
