#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// run configuration.
pub mod config;

/// GeoJSON emission for completed images.
pub mod geojson;

/// the per-image pipeline and batch driver.
pub mod pipeline;

pub use crate::config::{ElevationConfig, RunConfig};
pub use crate::pipeline::{
    BatchSummary, ImageJob, JobFailure, JobOutput, LensDatabase, Pipeline, PipelineError, Stage,
};

pub use aerogeo_camera as camera;
pub use aerogeo_elevation as elevation;
pub use aerogeo_footprint as footprint;
pub use aerogeo_raster as raster;
