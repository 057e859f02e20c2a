//! Local conversions between east-north offsets in meters and geographic
//! degrees on the WGS84 ellipsoid.
//!
//! Footprint extents are a few kilometers at most, so a local tangent-plane
//! scaling at the camera latitude is accurate to well below the pixel level;
//! no full geodesic solution is needed.

use aerogeo_elevation::GeoPoint;

/// WGS84 semi-major axis, meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Meters per degree of longitude and latitude at the given latitude.
pub fn meters_per_degree(latitude: f64) -> (f64, f64) {
    let lat_rad = latitude.to_radians();
    let sin2 = lat_rad.sin() * lat_rad.sin();
    let w = (1.0 - WGS84_E2 * sin2).sqrt();

    // Prime-vertical and meridional radii of curvature.
    let n = WGS84_A / w;
    let m = WGS84_A * (1.0 - WGS84_E2) / (w * w * w);

    let per_deg = std::f64::consts::PI / 180.0;
    (n * lat_rad.cos() * per_deg, m * per_deg)
}

/// Displace a geographic origin by an east/north offset in meters.
pub fn offset_geo(origin: GeoPoint, east_m: f64, north_m: f64) -> GeoPoint {
    let (m_per_deg_lon, m_per_deg_lat) = meters_per_degree(origin.lat);
    GeoPoint::new(
        origin.lon + east_m / m_per_deg_lon,
        origin.lat + north_m / m_per_deg_lat,
    )
}

/// East/north offset in meters from `origin` to `point`.
pub fn geo_offset(origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
    let (m_per_deg_lon, m_per_deg_lat) = meters_per_degree(origin.lat);
    (
        (point.lon - origin.lon) * m_per_deg_lon,
        (point.lat - origin.lat) * m_per_deg_lat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equator_degree_lengths() {
        let (lon_m, lat_m) = meters_per_degree(0.0);
        // Classic values: 111.32 km per degree of longitude at the equator,
        // 110.57 km per degree of latitude.
        assert_relative_eq!(lon_m, 111_319.5, epsilon = 1.0);
        assert_relative_eq!(lat_m, 110_574.3, epsilon = 1.0);
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let (lon45, _) = meters_per_degree(45.0);
        let (lon60, _) = meters_per_degree(60.0);
        assert!(lon45 > lon60);
        let (lon0, _) = meters_per_degree(0.0);
        assert!(lon0 > lon45);
    }

    #[test]
    fn offset_roundtrip() {
        let origin = GeoPoint::new(-122.0, 45.0);
        let moved = offset_geo(origin, 250.0, -100.0);
        let (east, north) = geo_offset(origin, moved);
        assert_relative_eq!(east, 250.0, epsilon = 1e-6);
        assert_relative_eq!(north, -100.0, epsilon = 1e-6);
    }
}
