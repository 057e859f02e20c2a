#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// error types for footprint projection.
pub mod error;

/// local geodetic conversions.
pub mod geodesy;

/// footprint projection onto terrain.
pub mod projector;

/// orientation convention and corner rays.
pub mod rotation;

pub use crate::error::FootprintError;
pub use crate::projector::{project, Footprint, ProjectorParams};
