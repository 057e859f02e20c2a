#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// magnetic declination correction module.
pub mod declination;

/// error types for pose and optics resolution.
pub mod error;

/// metadata field resolution module.
pub mod metadata;

/// sensor optics model.
pub mod optics;

/// acquisition pose types.
pub mod pose;

/// sensor dimension reference table.
pub mod sensors;

/// raw metadata tag map.
pub mod tags;

pub use crate::declination::{correct_yaw, DeclinationModel, DipoleDeclination};
pub use crate::error::CameraError;
pub use crate::metadata::resolve_pose;
pub use crate::optics::OpticsModel;
pub use crate::pose::{CameraPose, CaptureTime};
pub use crate::sensors::{SensorDatabase, SensorDimensions};
pub use crate::tags::TagMap;
