use serde_json::{Map, Value};

/// A mapping of metadata tag names to raw values, as produced by an external
/// metadata extractor (ExifTool JSON convention, e.g. `"EXIF:FocalLength"`).
///
/// Values are kept untyped; accessors coerce on demand. Numeric tags are
/// frequently encoded as strings in the wild (`"+100.20"` for a DJI relative
/// altitude), so [`TagMap::get_f64`] accepts both forms.
#[derive(Debug, Clone, Default)]
pub struct TagMap(Map<String, Value>);

impl TagMap {
    /// Create an empty tag map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-parsed JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a tag map from an ExifTool JSON object value.
    ///
    /// Returns `None` if `value` is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Insert or replace a tag value.
    pub fn insert(&mut self, tag: impl Into<String>, value: Value) {
        self.0.insert(tag.into(), value);
    }

    /// Whether the tag is present with a non-null value.
    pub fn contains(&self, tag: &str) -> bool {
        matches!(self.0.get(tag), Some(v) if !v.is_null())
    }

    /// Read a tag as a float, accepting numbers and numeric strings.
    pub fn get_f64(&self, tag: &str) -> Option<f64> {
        match self.0.get(tag)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_start_matches('+').parse().ok(),
            _ => None,
        }
    }

    /// Read a tag as an unsigned integer.
    pub fn get_u32(&self, tag: &str) -> Option<u32> {
        let v = self.get_f64(tag)?;
        if v.is_finite() && v >= 0.0 {
            Some(v as u32)
        } else {
            None
        }
    }

    /// Read a tag as a string slice.
    pub fn get_str(&self, tag: &str) -> Option<&str> {
        match self.0.get(tag)? {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Resolve a float field through an ordered candidate list, returning the
    /// first present, parseable value together with the tag that supplied it.
    pub fn resolve_f64(&self, candidates: &[&'static str]) -> Option<(f64, &'static str)> {
        candidates
            .iter()
            .find_map(|tag| self.get_f64(tag).map(|v| (v, *tag)))
    }

    /// Resolve an integer field through an ordered candidate list.
    pub fn resolve_u32(&self, candidates: &[&'static str]) -> Option<(u32, &'static str)> {
        candidates
            .iter()
            .find_map(|tag| self.get_u32(tag).map(|v| (v, *tag)))
    }

    /// Resolve a string field through an ordered candidate list.
    pub fn resolve_str(&self, candidates: &[&'static str]) -> Option<(&str, &'static str)> {
        candidates
            .iter()
            .find_map(|tag| self.get_str(tag).map(|v| (v, *tag)))
    }
}
