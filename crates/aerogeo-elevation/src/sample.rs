/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    /// Longitude, degrees east.
    pub lon: f64,
    /// Latitude, degrees north.
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude in degrees.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Which kind of source produced an elevation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationOrigin {
    /// The flat-plane assumption derived from the image's own MSL/AGL pair.
    FlatPlane,
    /// A pre-loaded elevation raster.
    Raster,
    /// A remote elevation query service.
    RemoteService,
}

/// A resolved elevation at a geographic point.
///
/// `meters: None` means the source could not produce a value there
/// (out-of-bounds raster query, nodata, or a remote service that stayed
/// unreachable after retries). Callers fall back rather than fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSample {
    /// The queried point.
    pub point: GeoPoint,
    /// Elevation above mean sea level, meters, when available.
    pub meters: Option<f64>,
    /// The source that produced (or failed to produce) the value.
    pub origin: ElevationOrigin,
}

impl ElevationSample {
    /// A sample carrying a resolved elevation.
    pub fn resolved(point: GeoPoint, meters: f64, origin: ElevationOrigin) -> Self {
        Self {
            point,
            meters: Some(meters),
            origin,
        }
    }

    /// A sample the source could not resolve.
    pub fn unavailable(point: GeoPoint, origin: ElevationOrigin) -> Self {
        Self {
            point,
            meters: None,
            origin,
        }
    }
}
