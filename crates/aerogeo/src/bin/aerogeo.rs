//! Command-line front end for the aerogeo pipeline.
//!
//! Metadata extraction stays external: the tool consumes the JSON that
//! `exiftool -j` produces for the input images, matched to them by file
//! name.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use aerogeo::camera::{SensorDatabase, TagMap};
use aerogeo::raster::{GridSize, PixelGrid};
use aerogeo::{geojson, ElevationConfig, ImageJob, Pipeline, RunConfig};

#[derive(Parser)]
#[command(name = "aerogeo", about = "Georeference aerial images from pose metadata")]
struct Args {
    /// Input image files (JPEG/PNG/TIFF).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// ExifTool JSON (-j) metadata for the input images.
    #[arg(long)]
    metadata: PathBuf,

    /// Directory for the output GeoTIFFs.
    #[arg(long, short)]
    output_dir: PathBuf,

    /// EPSG code of the output CRS.
    #[arg(long, default_value_t = 4326)]
    epsg: u32,

    /// Correct yaw for magnetic declination.
    #[arg(long)]
    declination: bool,

    /// Apply per-band histogram equalization.
    #[arg(long)]
    equalize: bool,

    /// Apply lens distortion correction when calibration data is found.
    #[arg(long)]
    lens_correction: bool,

    /// Write cloud-optimized GeoTIFFs.
    #[arg(long)]
    cog: bool,

    /// Local elevation raster (GeoTIFF DEM).
    #[arg(long, conflicts_with = "elevation_service")]
    dsm: Option<PathBuf>,

    /// Open-Elevation-compatible lookup endpoint.
    #[arg(long)]
    elevation_service: Option<String>,

    /// Sensor dimension reference table (CSV).
    #[arg(long)]
    sensor_db: Option<PathBuf>,

    /// Also write a GeoJSON of camera positions and footprints.
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Log more; repeat for debug output.
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(args) {
        Ok(failed) if failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<usize, Box<dyn std::error::Error>> {
    let mut config = RunConfig::new(args.epsg);
    config.correct_declination = args.declination;
    config.lens_correction = args.lens_correction;
    config.equalize = args.equalize;
    config.cloud_optimized = args.cog;
    config.elevation = match (args.dsm, args.elevation_service) {
        (Some(path), _) => ElevationConfig::LocalRaster(path),
        (None, Some(endpoint)) => ElevationConfig::RemoteService(endpoint),
        (None, None) => ElevationConfig::Disabled,
    };

    let sensors = match &args.sensor_db {
        Some(path) => SensorDatabase::from_csv(&fs::read_to_string(path)?),
        None => SensorDatabase::new(),
    };

    let tag_maps = load_metadata(&args.metadata)?;
    fs::create_dir_all(&args.output_dir)?;

    let mut jobs = Vec::with_capacity(args.images.len());
    for image_path in &args.images {
        let id = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.display().to_string());
        let tags = match find_tags(&tag_maps, image_path) {
            Some(tags) => tags,
            None => {
                log::warn!("no metadata entry for {id}, skipping");
                continue;
            }
        };
        let pixels = match load_pixels(image_path) {
            Ok(pixels) => pixels,
            Err(err) => {
                log::warn!("cannot read {id}: {err}, skipping");
                continue;
            }
        };
        let stem = image_path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "image".into());
        let output_path = args.output_dir.join(stem).with_extension("tif");
        jobs.push(ImageJob {
            id,
            tags,
            pixels,
            output_path,
        });
    }

    if jobs.is_empty() {
        return Err("no processable images".into());
    }

    let pipeline = Pipeline::new(config, sensors)?;
    let summary = pipeline.process_batch(&jobs);

    for output in &summary.outputs {
        println!("{}\t{}", output.id, output.output.path.display());
    }
    for failure in &summary.failures {
        eprintln!("{}\tFAILED at {}: {}", failure.id, failure.stage, failure.error);
    }

    if let Some(geojson_path) = &args.geojson {
        let collection = geojson::feature_collection(&summary.outputs);
        fs::write(geojson_path, serde_json::to_string_pretty(&collection)?)?;
        log::info!("footprint GeoJSON written to {}", geojson_path.display());
    }

    Ok(summary.failures.len())
}

fn load_metadata(path: &Path) -> Result<Vec<(String, TagMap)>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let entries = value
        .as_array()
        .ok_or("metadata JSON must be an array of per-image objects")?;

    let mut maps = Vec::with_capacity(entries.len());
    for entry in entries {
        let source = entry
            .get("SourceFile")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();
        if let Some(tags) = TagMap::from_value(entry.clone()) {
            maps.push((source, tags));
        }
    }
    Ok(maps)
}

fn find_tags(maps: &[(String, TagMap)], image_path: &Path) -> Option<TagMap> {
    let name = image_path.file_name()?.to_string_lossy();
    maps.iter()
        .find(|(source, _)| {
            Path::new(source)
                .file_name()
                .is_some_and(|s| s.to_string_lossy() == name)
        })
        .map(|(_, tags)| tags.clone())
}

fn load_pixels(path: &Path) -> Result<PixelGrid<f32, 3>, Box<dyn std::error::Error>> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let grid = PixelGrid::<u8, 3>::new(
        GridSize {
            width: width as usize,
            height: height as usize,
        },
        rgb.into_raw(),
    )?;
    Ok(grid.to_f32())
}
