//! Resolution of logical pose/optics fields from raw metadata tags.
//!
//! Several tags may supply the same logical field (gimbal-reported vs.
//! airframe-reported orientation, composite vs. plain GPS position). Each
//! field is resolved through an explicit, ordered candidate list; the first
//! present, non-null value wins. The lists mirror the fallback chains of the
//! tools this crate interoperates with, made explicit so they can be tested.

use crate::error::CameraError;
use crate::optics::OpticsModel;
use crate::pose::{normalize_degrees, CameraPose, CaptureTime};
use crate::sensors::{SensorDatabase, SensorDimensions};
use crate::tags::TagMap;

/// Candidate tags for latitude, degrees.
pub const LATITUDE_TAGS: &[&str] = &["Composite:GPSLatitude", "EXIF:GPSLatitude"];
/// Candidate tags for longitude, degrees.
pub const LONGITUDE_TAGS: &[&str] = &["Composite:GPSLongitude", "EXIF:GPSLongitude"];
/// Candidate tags for absolute altitude (MSL), meters.
pub const ABSOLUTE_ALTITUDE_TAGS: &[&str] = &["XMP:AbsoluteAltitude", "Composite:GPSAltitude"];
/// Candidate tags for relative altitude (AGL), meters.
pub const RELATIVE_ALTITUDE_TAGS: &[&str] = &["XMP:RelativeAltitude", "Composite:GPSAltitude"];
/// Candidate tags for roll: gimbal sources first, then airframe.
pub const ROLL_TAGS: &[&str] = &[
    "XMP:GimbalRollDegree",
    "MakerNotes:CameraRoll",
    "XMP:Roll",
    "XMP:FlightRollDegree",
    "MakerNotes:Roll",
];
/// Candidate tags for pitch: gimbal sources first, then airframe.
pub const PITCH_TAGS: &[&str] = &[
    "XMP:GimbalPitchDegree",
    "MakerNotes:CameraPitch",
    "XMP:Pitch",
    "XMP:FlightPitchDegree",
    "MakerNotes:Pitch",
];
/// Candidate tags for yaw: gimbal sources first, then airframe.
pub const YAW_TAGS: &[&str] = &[
    "XMP:GimbalYawDegree",
    "MakerNotes:CameraYaw",
    "XMP:Yaw",
    "XMP:FlightYawDegree",
    "MakerNotes:Yaw",
];
/// Candidate tags for focal length, millimeters.
pub const FOCAL_LENGTH_TAGS: &[&str] = &["EXIF:FocalLength"];
/// Candidate tags for the 35 mm-equivalent focal length.
pub const FOCAL_LENGTH_35MM_TAGS: &[&str] = &["EXIF:FocalLengthIn35mmFormat"];
/// Candidate tags for image width, pixels.
pub const IMAGE_WIDTH_TAGS: &[&str] = &["EXIF:ImageWidth", "EXIF:ExifImageWidth"];
/// Candidate tags for image height, pixels.
pub const IMAGE_HEIGHT_TAGS: &[&str] = &["EXIF:ImageHeight", "EXIF:ExifImageHeight"];
/// Candidate tags for the capture timestamp.
pub const TIMESTAMP_TAGS: &[&str] = &["EXIF:DateTimeOriginal", "EXIF:CreateDate"];
/// Candidate tags for the camera model string.
pub const MODEL_TAGS: &[&str] = &["EXIF:Model"];
/// Candidate tags for the rig camera index on multi-sensor rigs.
pub const RIG_INDEX_TAGS: &[&str] = &["XMP:RigCameraIndex", "XMP:SensorIndex"];
/// Candidate tags for directly-reported physical sensor width, millimeters.
pub const SENSOR_WIDTH_TAGS: &[&str] = &["XMP:SensorWidth"];
/// Candidate tags for directly-reported physical sensor height, millimeters.
pub const SENSOR_HEIGHT_TAGS: &[&str] = &["XMP:SensorHeight"];

fn require_f64(
    tags: &TagMap,
    field: &'static str,
    candidates: &'static [&'static str],
) -> Result<f64, CameraError> {
    tags.resolve_f64(candidates)
        .map(|(v, _)| v)
        .ok_or_else(|| CameraError::MissingRequiredField {
            field,
            tried: candidates.to_vec(),
        })
}

fn require_u32(
    tags: &TagMap,
    field: &'static str,
    candidates: &'static [&'static str],
) -> Result<u32, CameraError> {
    tags.resolve_u32(candidates)
        .map(|(v, _)| v)
        .ok_or_else(|| CameraError::MissingRequiredField {
            field,
            tried: candidates.to_vec(),
        })
}

fn resolve_sensor_dimensions(
    tags: &TagMap,
    sensors: &SensorDatabase,
    override_dims: Option<SensorDimensions>,
    focal_length_mm: f64,
    focal_length_35mm: Option<f64>,
) -> Result<SensorDimensions, CameraError> {
    if let (Some((w, _)), Some((h, _))) = (
        tags.resolve_f64(SENSOR_WIDTH_TAGS),
        tags.resolve_f64(SENSOR_HEIGHT_TAGS),
    ) {
        return Ok(SensorDimensions {
            width_mm: w,
            height_mm: h,
        });
    }
    if let Some(dims) = override_dims {
        return Ok(dims);
    }

    let model = tags.resolve_str(MODEL_TAGS).map(|(m, _)| m);
    let rig_index = tags.resolve_str(RIG_INDEX_TAGS).map(|(i, _)| i);
    if let Some(model) = model {
        if let Some(dims) = sensors.lookup(model, rig_index) {
            return Ok(dims);
        }
    }

    // Last resort: recover the sensor size from the 35 mm crop factor.
    if let Some(f35) = focal_length_35mm {
        let (w, h) = OpticsModel::sensor_from_crop_factor(focal_length_mm, f35);
        log::debug!("sensor dimensions derived from 35 mm equivalent: {w:.2}x{h:.2} mm");
        return Ok(SensorDimensions {
            width_mm: w,
            height_mm: h,
        });
    }

    Err(CameraError::UnknownSensor {
        model: model.unwrap_or("<missing>").to_owned(),
        rig_index: rig_index.map(str::to_owned),
    })
}

/// Resolve a pose and optics model from a metadata tag map.
///
/// `sensors` supplies physical sensor dimensions when metadata does not
/// carry them; `override_dims` takes precedence over the table and lets a
/// caller process images from cameras the table does not know.
///
/// Gimbal pitch arrives in the airframe convention where -90 means the
/// camera looks straight down; the returned pose carries the tilt from
/// nadir instead (0 = straight down, 90 = horizon), the convention the
/// footprint projector is built around.
pub fn resolve_pose(
    tags: &TagMap,
    sensors: &SensorDatabase,
    override_dims: Option<SensorDimensions>,
) -> Result<(CameraPose, OpticsModel), CameraError> {
    let latitude = require_f64(tags, "latitude", LATITUDE_TAGS)?;
    let longitude = require_f64(tags, "longitude", LONGITUDE_TAGS)?;
    let altitude_msl = require_f64(tags, "absolute_altitude", ABSOLUTE_ALTITUDE_TAGS)?;
    let altitude_agl = require_f64(tags, "relative_altitude", RELATIVE_ALTITUDE_TAGS)?;
    if altitude_agl < 0.0 {
        return Err(CameraError::NegativeRelativeAltitude(altitude_agl));
    }

    let roll_deg = require_f64(tags, "roll", ROLL_TAGS)?;
    let gimbal_pitch = require_f64(tags, "pitch", PITCH_TAGS)?;
    let yaw_deg = normalize_degrees(require_f64(tags, "yaw", YAW_TAGS)?);
    let pitch_deg = gimbal_pitch + 90.0;

    let focal_length_mm = require_f64(tags, "focal_length", FOCAL_LENGTH_TAGS)?;
    let focal_length_35mm = tags.resolve_f64(FOCAL_LENGTH_35MM_TAGS).map(|(v, _)| v);
    let image_width = require_u32(tags, "image_width", IMAGE_WIDTH_TAGS)?;
    let image_height = require_u32(tags, "image_height", IMAGE_HEIGHT_TAGS)?;

    let (timestamp, _) =
        tags.resolve_str(TIMESTAMP_TAGS)
            .ok_or_else(|| CameraError::MissingRequiredField {
                field: "timestamp",
                tried: TIMESTAMP_TAGS.to_vec(),
            })?;
    let captured_at = CaptureTime::parse(timestamp)?;

    let dims = resolve_sensor_dimensions(
        tags,
        sensors,
        override_dims,
        focal_length_mm,
        focal_length_35mm,
    )?;

    let pose = CameraPose {
        latitude,
        longitude,
        altitude_msl,
        altitude_agl,
        roll_deg,
        pitch_deg,
        yaw_deg,
        captured_at,
    };
    let optics = OpticsModel {
        focal_length_mm,
        sensor_width_mm: dims.width_mm,
        sensor_height_mm: dims.height_mm,
        image_width,
        image_height,
        focal_length_35mm,
    };
    Ok((pose, optics))
}
