use std::collections::HashMap;

/// Physical dimensions of a camera sensor, millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDimensions {
    /// Sensor width, millimeters.
    pub width_mm: f64,
    /// Sensor height, millimeters.
    pub height_mm: f64,
}

/// Reference table of known sensor dimensions keyed by camera model and,
/// for multi-sensor rigs, the rig camera index.
///
/// Lookup order: exact (model, rig index) match, then any entry for the
/// model, then the table's default entry when present.
#[derive(Debug, Clone, Default)]
pub struct SensorDatabase {
    entries: HashMap<(String, Option<String>), SensorDimensions>,
}

/// Key used for the catch-all entry of a [`SensorDatabase`].
pub const DEFAULT_SENSOR_KEY: &str = "default";

impl SensorDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor entry.
    pub fn insert(
        &mut self,
        model: impl Into<String>,
        rig_index: Option<&str>,
        dims: SensorDimensions,
    ) {
        self.entries
            .insert((model.into(), rig_index.map(str::to_owned)), dims);
    }

    /// Look up sensor dimensions for a camera model.
    pub fn lookup(&self, model: &str, rig_index: Option<&str>) -> Option<SensorDimensions> {
        if let Some(dims) = self
            .entries
            .get(&(model.to_owned(), rig_index.map(str::to_owned)))
        {
            return Some(*dims);
        }
        if let Some(dims) = self
            .entries
            .iter()
            .find_map(|((m, _), dims)| (m == model).then_some(*dims))
        {
            return Some(dims);
        }
        self.entries
            .get(&(DEFAULT_SENSOR_KEY.to_owned(), None))
            .copied()
    }

    /// Load entries from CSV text in the layout of the original reference
    /// table: `DroneMake,DroneModel,CameraMake,SensorModel,RigCameraIndex,
    /// SensorWidth,SensorHeight,...` with a header row. Rows that do not
    /// parse are skipped with a warning; the fields have no quoting in this
    /// table.
    pub fn from_csv(text: &str) -> Self {
        let mut db = Self::new();
        for line in text.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 7 {
                log::warn!("sensor table row has {} fields, skipping: {line}", fields.len());
                continue;
            }
            let model = fields[3];
            let rig_index = match fields[4] {
                "" | "nan" => None,
                idx => Some(idx),
            };
            let (width, height) = match (fields[5].parse::<f64>(), fields[6].parse::<f64>()) {
                (Ok(w), Ok(h)) if w > 0.0 && h > 0.0 => (w, h),
                _ => {
                    log::warn!("unparseable sensor dimensions, skipping: {line}");
                    continue;
                }
            };
            db.insert(
                model,
                rig_index,
                SensorDimensions {
                    width_mm: width,
                    height_mm: height,
                },
            );
        }
        db
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
DroneMake,DroneModel,CameraMake,SensorModel,RigCameraIndex,SensorWidth,SensorHeight,LensFOVw,LensFOVh
DJI,Mini 3 Pro,DJI,FC3582,,9.7,7.3,0,0
DJI,M3M,DJI,M3M,1,17.3,13.0,0,0
DJI,M3M,DJI,M3M,2,4.96,3.72,0,0
,,,default,,6.3,4.7,0,0
bad,row
";

    #[test]
    fn csv_roundtrip() {
        let db = SensorDatabase::from_csv(CSV);
        assert_eq!(db.len(), 4);

        let fc3582 = db.lookup("FC3582", None).unwrap();
        assert_eq!(fc3582.width_mm, 9.7);
    }

    #[test]
    fn rig_index_disambiguates() {
        let db = SensorDatabase::from_csv(CSV);
        let wide = db.lookup("M3M", Some("1")).unwrap();
        let narrow = db.lookup("M3M", Some("2")).unwrap();
        assert_eq!(wide.width_mm, 17.3);
        assert_eq!(narrow.width_mm, 4.96);
    }

    #[test]
    fn model_only_match_when_rig_unknown() {
        let db = SensorDatabase::from_csv(CSV);
        // Any M3M entry is acceptable when the rig index is not present.
        assert!(db.lookup("M3M", Some("99")).is_some());
    }

    #[test]
    fn falls_back_to_default_entry() {
        let db = SensorDatabase::from_csv(CSV);
        let dims = db.lookup("FC9999", None).unwrap();
        assert_eq!(dims.width_mm, 6.3);
    }

    #[test]
    fn empty_table_has_no_answer() {
        let db = SensorDatabase::new();
        assert!(db.lookup("FC3582", None).is_none());
    }
}
