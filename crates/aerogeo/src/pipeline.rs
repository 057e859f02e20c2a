//! The per-image pipeline and the batch driver.
//!
//! Each image runs resolve -> correct orientation -> project footprint ->
//! georeference, independently of every other image. The batch driver
//! spreads jobs across the rayon pool; a failed image is recorded in the
//! summary and never aborts the rest of the batch. The elevation sampler
//! is the only shared resource.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use aerogeo_camera::{
    correct_yaw, resolve_pose, CameraError, CameraPose, DeclinationModel, DipoleDeclination,
    SensorDatabase, TagMap,
};
use aerogeo_elevation::{DemRaster, ElevationError, ElevationSampler, FlatPlane, RemoteElevation};
use aerogeo_footprint::{project, Footprint, FootprintError};
use aerogeo_raster::{
    georeference_rgb, GeorefOptions, GeorefOutput, LensCalibration, PixelGrid, RasterError,
};

use crate::config::{ElevationConfig, RunConfig};

/// An error from one image's pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Pose or optics could not be resolved.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// The elevation source could not be set up.
    #[error(transparent)]
    Elevation(#[from] ElevationError),

    /// Footprint projection failed.
    #[error(transparent)]
    Footprint(#[from] FootprintError),

    /// Georeferencing or output failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// The pipeline stage an error surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolving pose and optics from metadata.
    ResolvePose,
    /// Projecting the footprint onto terrain.
    ProjectFootprint,
    /// Georeferencing and writing the raster.
    Georeference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResolvePose => "resolve-pose",
            Stage::ProjectFootprint => "project-footprint",
            Stage::Georeference => "georeference",
        };
        f.write_str(name)
    }
}

/// One image to process: its identifier, metadata tags, pixel data, and
/// where the output should land.
pub struct ImageJob {
    /// Caller-chosen identifier used in logs and the summary, typically the
    /// source file name.
    pub id: String,
    /// Metadata tag map for the image.
    pub tags: TagMap,
    /// Source pixels in the f32 working format.
    pub pixels: PixelGrid<f32, 3>,
    /// Output raster path.
    pub output_path: PathBuf,
}

/// A completed image.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// The job identifier.
    pub id: String,
    /// The resolved (and possibly declination-corrected) pose.
    pub pose: CameraPose,
    /// The projected ground footprint.
    pub footprint: Footprint,
    /// Ground sample distance at the capture altitude, meters per pixel.
    pub gsd_m: f64,
    /// What the georeferencer wrote.
    pub output: GeorefOutput,
}

/// A failed image: which job, where it failed, and why.
#[derive(Debug)]
pub struct JobFailure {
    /// The job identifier.
    pub id: String,
    /// The stage the error surfaced from.
    pub stage: Stage,
    /// The underlying error.
    pub error: PipelineError,
}

/// Outcome of a batch: completed images and recorded failures.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Successfully georeferenced images.
    pub outputs: Vec<JobOutput>,
    /// Images that failed, with stage and cause.
    pub failures: Vec<JobFailure>,
}

impl BatchSummary {
    /// Whether every job completed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// External per-camera/lens calibration lookup.
///
/// The pipeline consults it only when lens correction is enabled; a miss
/// logs and skips the correction rather than failing the image.
pub trait LensDatabase: Send + Sync {
    /// Distortion coefficients for a camera model, if known.
    fn lookup(&self, camera_model: &str) -> Option<LensCalibration>;
}

/// The assembled pipeline for one run.
pub struct Pipeline {
    config: RunConfig,
    sensors: SensorDatabase,
    declination: Box<dyn DeclinationModel + Send + Sync>,
    lenses: Option<Box<dyn LensDatabase>>,
    shared_sampler: Option<Arc<dyn ElevationSampler>>,
}

impl Pipeline {
    /// Build a pipeline, resolving the configured elevation source once.
    ///
    /// # Errors
    ///
    /// Fails when a configured DEM cannot be loaded or the remote elevation
    /// client cannot be built; elevation problems after this point degrade
    /// per query instead of failing.
    pub fn new(config: RunConfig, sensors: SensorDatabase) -> Result<Self, PipelineError> {
        let shared_sampler: Option<Arc<dyn ElevationSampler>> = match &config.elevation {
            ElevationConfig::Disabled => None,
            ElevationConfig::LocalRaster(path) => Some(Arc::new(DemRaster::from_file(path)?)),
            ElevationConfig::RemoteService(endpoint) => {
                Some(Arc::new(RemoteElevation::new(endpoint.clone())?))
            }
        };
        Ok(Self {
            config,
            sensors,
            declination: Box::new(DipoleDeclination),
            lenses: None,
            shared_sampler,
        })
    }

    /// Replace the declination model.
    pub fn with_declination_model(
        mut self,
        model: impl DeclinationModel + Send + Sync + 'static,
    ) -> Self {
        self.declination = Box::new(model);
        self
    }

    /// Attach a lens calibration database.
    pub fn with_lens_database(mut self, db: impl LensDatabase + 'static) -> Self {
        self.lenses = Some(Box::new(db));
        self
    }

    /// Process a batch of images across the rayon worker pool.
    ///
    /// Jobs are independent; each either completes (output written) or
    /// fails atomically and is recorded in the summary.
    pub fn process_batch(&self, jobs: &[ImageJob]) -> BatchSummary {
        let results: Vec<Result<JobOutput, JobFailure>> =
            jobs.par_iter().map(|job| self.process_image(job)).collect();

        let mut summary = BatchSummary::default();
        for result in results {
            match result {
                Ok(output) => summary.outputs.push(output),
                Err(failure) => {
                    log::warn!(
                        "image {} failed at {}: {}",
                        failure.id,
                        failure.stage,
                        failure.error
                    );
                    summary.failures.push(failure);
                }
            }
        }
        log::info!(
            "batch complete: {} ok, {} failed",
            summary.outputs.len(),
            summary.failures.len()
        );
        summary
    }

    /// Run the full pipeline for one image.
    pub fn process_image(&self, job: &ImageJob) -> Result<JobOutput, JobFailure> {
        let fail = |stage: Stage| {
            let id = job.id.clone();
            move |error: PipelineError| JobFailure { id, stage, error }
        };

        let (pose, optics) = resolve_pose(&job.tags, &self.sensors, None)
            .map_err(|e| fail(Stage::ResolvePose)(e.into()))?;
        let pose = correct_yaw(
            pose,
            self.config.correct_declination,
            self.declination.as_ref(),
        );

        // Per-image flat plane when no run-wide source is configured.
        let flat;
        let sampler: &dyn ElevationSampler = match &self.shared_sampler {
            Some(shared) => shared.as_ref(),
            None => {
                flat = FlatPlane::new(pose.ground_elevation());
                &flat
            }
        };

        let footprint = project(&pose, &optics, sampler, &self.config.projector)
            .map_err(|e| fail(Stage::ProjectFootprint)(e.into()))?;
        if footprint.low_confidence {
            log::warn!("image {}: low-confidence footprint (near-horizon rays)", job.id);
        }

        let lens_calibration = self.lens_calibration_for(&job.tags);
        let options = GeorefOptions {
            epsg: self.config.epsg,
            lens_calibration,
            equalize: self.config.equalize,
            cloud_optimized: self.config.cloud_optimized,
            residual_threshold_px: self.config.residual_threshold_px,
        };
        let output = georeference_rgb(&job.pixels, &optics, &footprint, &job.output_path, &options)
            .map_err(|e| fail(Stage::Georeference)(e.into()))?;

        Ok(JobOutput {
            id: job.id.clone(),
            pose,
            footprint,
            gsd_m: optics.ground_sample_distance(pose.altitude_agl),
            output,
        })
    }

    fn lens_calibration_for(&self, tags: &TagMap) -> Option<LensCalibration> {
        if !self.config.lens_correction {
            return None;
        }
        let db = match &self.lenses {
            Some(db) => db,
            None => {
                log::info!("lens correction enabled but no calibration database attached");
                return None;
            }
        };
        let model = tags.get_str("EXIF:Model")?;
        match db.lookup(model) {
            Some(calibration) => Some(calibration),
            None => {
                log::info!("no lens calibration for camera model {model}, skipping correction");
                None
            }
        }
    }

}
