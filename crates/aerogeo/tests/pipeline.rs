use std::path::PathBuf;

use approx::assert_relative_eq;
use serde_json::json;

use aerogeo::camera::{SensorDatabase, SensorDimensions, TagMap};
use aerogeo::elevation::GeoPoint;
use aerogeo::footprint::geodesy::meters_per_degree;
use aerogeo::raster::{GridSize, PixelGrid};
use aerogeo::{ElevationConfig, ImageJob, Pipeline, RunConfig, Stage};

const LAT: f64 = 45.0;
const LON: f64 = -122.0;

fn nadir_tags() -> TagMap {
    let mut tags = TagMap::new();
    tags.insert("Composite:GPSLatitude", json!(LAT));
    tags.insert("Composite:GPSLongitude", json!(LON));
    tags.insert("XMP:AbsoluteAltitude", json!("+120.0"));
    tags.insert("XMP:RelativeAltitude", json!("+100.0"));
    tags.insert("XMP:GimbalRollDegree", json!(0.0));
    tags.insert("XMP:GimbalPitchDegree", json!(-90.0));
    tags.insert("XMP:GimbalYawDegree", json!(0.0));
    tags.insert("EXIF:FocalLength", json!(4.5));
    tags.insert("EXIF:ImageWidth", json!(40));
    tags.insert("EXIF:ImageHeight", json!(30));
    tags.insert("EXIF:DateTimeOriginal", json!("2024:05:01 10:30:00"));
    tags.insert("EXIF:Model", json!("FC3582"));
    tags
}

fn sensors() -> SensorDatabase {
    let mut db = SensorDatabase::new();
    db.insert(
        "FC3582",
        None,
        SensorDimensions {
            width_mm: 6.3,
            height_mm: 4.7,
        },
    );
    db
}

fn ramp_pixels() -> PixelGrid<f32, 3> {
    let (width, height) = (40, 30);
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[x as f32 * 6.0, y as f32 * 8.0, 120.0]);
        }
    }
    PixelGrid::new(GridSize { width, height }, data).unwrap()
}

fn job(id: &str, tags: TagMap, dir: &std::path::Path) -> ImageJob {
    ImageJob {
        id: id.to_owned(),
        tags,
        pixels: ramp_pixels(),
        output_path: dir.join(format!("{id}.tif")),
    }
}

#[test]
fn scenario_a_nadir_rectangle() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    let summary = pipeline.process_batch(&[job("nadir", nadir_tags(), tmp_dir.path())]);
    assert!(summary.all_succeeded());
    let output = &summary.outputs[0];

    // Footprint centered under the camera.
    let center_lon: f64 = output.footprint.corners.iter().map(|c| c.lon).sum::<f64>() / 4.0;
    let center_lat: f64 = output.footprint.corners.iter().map(|c| c.lat).sum::<f64>() / 4.0;
    assert_relative_eq!(center_lon, LON, epsilon = 1e-9);
    assert_relative_eq!(center_lat, LAT, epsilon = 1e-9);

    // Horizontal half-width is agl * tan(atan(6.3 / (2 * 4.5))) = 70 m.
    let (m_per_deg_lon, _) = meters_per_degree(LAT);
    let half_width_deg = (output.footprint.corners[1].lon - output.footprint.corners[0].lon) / 2.0;
    assert_relative_eq!(half_width_deg * m_per_deg_lon, 70.0, epsilon = 1e-6);

    // The raster landed on disk with the footprint's bounding box.
    assert!(output.output.path.exists());
    let [origin_x, _, _, origin_y, _, _] = output.output.geotransform;
    assert_relative_eq!(origin_x, output.footprint.corners[0].lon, epsilon = 1e-9);
    assert_relative_eq!(origin_y, output.footprint.corners[0].lat, epsilon = 1e-9);

    // GSD for this pose: 6.3 mm * 100 m / (4.5 mm * 40 px).
    assert_relative_eq!(output.gsd_m, 6.3 * 100.0 / (4.5 * 40.0), epsilon = 1e-12);
}

#[test]
fn scenario_b_roll_skews_footprint() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    let mut rolled_tags = nadir_tags();
    rolled_tags.insert("XMP:GimbalRollDegree", json!(10.0));

    let summary = pipeline.process_batch(&[
        job("level", nadir_tags(), tmp_dir.path()),
        job("rolled", rolled_tags, tmp_dir.path()),
    ]);
    assert!(summary.all_succeeded());

    let origin = GeoPoint::new(LON, LAT);
    let level = summary.outputs.iter().find(|o| o.id == "level").unwrap();
    let rolled = summary.outputs.iter().find(|o| o.id == "rolled").unwrap();

    // Rolling tips the view sideways: a skewed quadrilateral with nearly
    // the level footprint's area (exactly 5% only holds for narrow lenses).
    let ratio = rolled.footprint.area_m2(origin) / level.footprint.area_m2(origin);
    assert!((ratio - 1.0).abs() < 0.10, "area ratio {ratio}");

    // Positive roll swings the view west: the west corners reach farther
    // from the camera track than the east corners.
    let west = rolled.footprint.corners[0].lon - LON;
    let east = rolled.footprint.corners[1].lon - LON;
    assert!(west.abs() > east.abs(), "footprint did not skew west");
}

#[test]
fn scenario_c_unreachable_elevation_service_degrades() {
    let tmp_dir = tempfile::tempdir().unwrap();

    let mut config = RunConfig::new(4326);
    // Nothing listens here; every lookup fails and falls back.
    config.elevation = ElevationConfig::RemoteService("http://127.0.0.1:9/api/v1/lookup".into());
    let degraded = Pipeline::new(config, sensors()).unwrap();
    let flat = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    let with_fallback = degraded.process_batch(&[job("remote", nadir_tags(), tmp_dir.path())]);
    let baseline = flat.process_batch(&[job("flat", nadir_tags(), tmp_dir.path())]);
    assert!(with_fallback.all_succeeded());
    assert!(baseline.all_succeeded());

    // The fallback reproduces the flat-plane footprint.
    let a = &with_fallback.outputs[0].footprint;
    let b = &baseline.outputs[0].footprint;
    for (ca, cb) in a.corners.iter().zip(&b.corners) {
        assert_relative_eq!(ca.lon, cb.lon, epsilon = 1e-9);
        assert_relative_eq!(ca.lat, cb.lat, epsilon = 1e-9);
    }
}

#[test]
fn scenario_d_degenerate_image_fails_alone() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    // Gimbal pitch +5 is 95 degrees of tilt: above the horizon.
    let mut above_horizon = nadir_tags();
    above_horizon.insert("XMP:GimbalPitchDegree", json!(5.0));

    let summary = pipeline.process_batch(&[
        job("good", nadir_tags(), tmp_dir.path()),
        job("bad", above_horizon, tmp_dir.path()),
    ]);

    assert_eq!(summary.outputs.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.outputs[0].id, "good");
    assert!(summary.outputs[0].output.path.exists());

    let failure = &summary.failures[0];
    assert_eq!(failure.id, "bad");
    assert_eq!(failure.stage, Stage::ProjectFootprint);
    assert!(!tmp_dir.path().join("bad.tif").exists());
}

#[test]
fn missing_metadata_fails_at_pose_resolution() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    let mut tags = nadir_tags();
    tags.insert("Composite:GPSLatitude", json!(null));

    let summary = pipeline.process_batch(&[job("incomplete", tags, tmp_dir.path())]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].stage, Stage::ResolvePose);
}

#[test]
fn cloud_optimized_batch_writes_overviews() {
    let tmp_dir = tempfile::tempdir().unwrap();

    let mut config = RunConfig::new(4326);
    config.cloud_optimized = true;
    let pipeline = Pipeline::new(config, sensors()).unwrap();

    // A wider source so the pyramid has at least one level.
    let (width, height) = (600, 40);
    let mut data = Vec::with_capacity(width * height * 3);
    for i in 0..width * height {
        let v = (i % 251) as f32;
        data.extend_from_slice(&[v, v, v]);
    }
    let mut tags = nadir_tags();
    tags.insert("EXIF:ImageWidth", json!(600));
    tags.insert("EXIF:ImageHeight", json!(40));
    let jobs = [ImageJob {
        id: "cog".into(),
        tags,
        pixels: PixelGrid::new(GridSize { width, height }, data).unwrap(),
        output_path: tmp_dir.path().join("cog.tif"),
    }];

    let summary = pipeline.process_batch(&jobs);
    assert!(summary.all_succeeded());

    let file = std::fs::File::open(tmp_dir.path().join("cog.tif")).unwrap();
    let mut decoder = tiff::decoder::Decoder::new(file).unwrap();
    assert!(decoder.more_images());
}

#[test]
fn geojson_collection_covers_all_outputs() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(RunConfig::new(4326), sensors()).unwrap();

    let summary = pipeline.process_batch(&[
        job("one", nadir_tags(), tmp_dir.path()),
        job("two", nadir_tags(), tmp_dir.path()),
    ]);
    assert!(summary.all_succeeded());

    let collection = aerogeo::geojson::feature_collection(&summary.outputs);
    assert_eq!(collection["features"].as_array().unwrap().len(), 4);

    let path: PathBuf = tmp_dir.path().join("footprints.json");
    std::fs::write(&path, serde_json::to_string_pretty(&collection).unwrap()).unwrap();
    assert!(path.exists());
}
