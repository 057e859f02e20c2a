//! GeoJSON emission for completed images.
//!
//! Each image contributes a Point feature at the camera position and a
//! Polygon feature for its ground footprint, collected into one
//! FeatureCollection, the companion product the batch driver can write
//! next to the rasters.

use serde_json::{json, Value};

use crate::pipeline::JobOutput;

fn properties(output: &JobOutput) -> Value {
    json!({
        "id": output.id,
        "gsd_m": output.gsd_m,
        "epsg": output.output.epsg,
        "yaw_deg": output.pose.yaw_deg,
        "pitch_deg": output.pose.pitch_deg,
        "roll_deg": output.pose.roll_deg,
        "altitude_msl_m": output.pose.altitude_msl,
        "altitude_agl_m": output.pose.altitude_agl,
        "low_confidence": output.footprint.low_confidence,
        "raster": output.output.path.display().to_string(),
    })
}

/// Build a FeatureCollection of camera positions and footprints.
pub fn feature_collection(outputs: &[JobOutput]) -> Value {
    let mut features = Vec::with_capacity(outputs.len() * 2);
    for output in outputs {
        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [output.pose.longitude, output.pose.latitude],
            },
            "properties": properties(output),
        }));

        let ring: Vec<[f64; 2]> = output
            .footprint
            .closed_ring()
            .iter()
            .map(|c| [c.lon, c.lat])
            .collect();
        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring],
            },
            "properties": properties(output),
        }));
    }

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
