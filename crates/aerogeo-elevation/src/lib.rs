#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// error types for elevation sources.
pub mod error;

/// flat-plane elevation source.
pub mod flat;

/// raster-backed elevation source.
pub mod raster;

/// remote elevation query service.
pub mod remote;

/// elevation sample types.
pub mod sample;

pub use crate::error::ElevationError;
pub use crate::flat::FlatPlane;
pub use crate::raster::DemRaster;
pub use crate::remote::RemoteElevation;
pub use crate::sample::{ElevationOrigin, ElevationSample, GeoPoint};

/// A source of terrain elevation estimates.
///
/// All variants expose the same contract; callers never branch on which
/// variant is active. Implementations are shared across worker threads, so
/// any internal mutability must be synchronized.
pub trait ElevationSampler: Send + Sync {
    /// Elevation estimate for one geographic point.
    fn sample(&self, point: GeoPoint) -> ElevationSample;

    /// Elevation estimates for a batch of points.
    ///
    /// The default loops over [`ElevationSampler::sample`]; sources with a
    /// batched native operation (the remote service) override this to issue
    /// one request for the whole slice.
    fn sample_many(&self, points: &[GeoPoint]) -> Vec<ElevationSample> {
        points.iter().map(|&p| self.sample(p)).collect()
    }
}
