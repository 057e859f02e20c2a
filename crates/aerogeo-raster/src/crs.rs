//! Target coordinate reference systems.
//!
//! The output CRS is selected by EPSG code. Geographic WGS84 passes
//! coordinates through; spherical Mercator and the UTM zones are computed
//! in closed form on the WGS84 ellipsoid, which covers the codes aerial
//! mapping outputs actually use without dragging in a projection database.

use aerogeo_elevation::GeoPoint;

use crate::error::RasterError;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_E2: f64 = 0.006_694_379_990_14;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A supported target coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Geographic WGS84, EPSG:4326. Coordinates in degrees.
    Geographic,
    /// Spherical ("web") Mercator, EPSG:3857. Coordinates in meters.
    WebMercator,
    /// A WGS84 UTM zone, EPSG:326xx / 327xx. Coordinates in meters.
    Utm {
        /// UTM zone number, 1-60.
        zone: u8,
        /// True for the northern-hemisphere variant.
        north: bool,
    },
}

impl Crs {
    /// Resolve a CRS from an EPSG code.
    ///
    /// # Errors
    ///
    /// [`RasterError::Reprojection`] for codes outside the supported set.
    pub fn from_epsg(code: u32) -> Result<Self, RasterError> {
        match code {
            4326 => Ok(Self::Geographic),
            3857 => Ok(Self::WebMercator),
            32601..=32660 => Ok(Self::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Self::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            other => Err(RasterError::Reprojection(format!(
                "unsupported EPSG code {other}"
            ))),
        }
    }

    /// The EPSG code of this CRS.
    pub fn epsg(&self) -> u32 {
        match self {
            Self::Geographic => 4326,
            Self::WebMercator => 3857,
            Self::Utm { zone, north: true } => 32600 + u32::from(*zone),
            Self::Utm { zone, north: false } => 32700 + u32::from(*zone),
        }
    }

    /// Whether coordinates are angular (degrees) rather than linear.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic)
    }

    /// Project a geographic point into this CRS.
    pub fn forward(&self, point: GeoPoint) -> (f64, f64) {
        match self {
            Self::Geographic => (point.lon, point.lat),
            Self::WebMercator => {
                let x = WGS84_A * point.lon.to_radians();
                let y = WGS84_A
                    * (std::f64::consts::FRAC_PI_4 + point.lat.to_radians() / 2.0)
                        .tan()
                        .ln();
                (x, y)
            }
            Self::Utm { zone, north } => transverse_mercator(point, *zone, *north),
        }
    }

    /// The UTM zone containing a geographic point.
    pub fn utm_zone_for(point: GeoPoint) -> Self {
        let zone = (((point.lon + 180.0) / 6.0).floor() as i32).clamp(0, 59) as u8 + 1;
        Self::Utm {
            zone,
            north: point.lat >= 0.0,
        }
    }
}

// Snyder's series for the transverse Mercator projection on the WGS84
// ellipsoid, accurate to millimeters within a zone.
fn transverse_mercator(point: GeoPoint, zone: u8, north: bool) -> (f64, f64) {
    let e2 = WGS84_E2;
    let ep2 = e2 / (1.0 - e2);

    let lat = point.lat.to_radians();
    let central_meridian = f64::from(zone) * 6.0 - 183.0;
    let dlon = (point.lon - central_meridian).to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a = cos_lat * dlon;

    let m = WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0)
                * (2.0 * lat).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * lat).sin());

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let mut northing = UTM_K0
        * (m + n
            * tan_lat
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    if !north {
        northing += UTM_FALSE_NORTHING_SOUTH;
    }

    (easting, northing)
}
