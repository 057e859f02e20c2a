/// An error type for pose and optics resolution.
#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    /// A required logical field could not be resolved from any metadata tag.
    #[error("missing required field `{field}` (tried tags: {tried:?})")]
    MissingRequiredField {
        /// Name of the logical field that could not be resolved.
        field: &'static str,
        /// Tag names that were tried, in priority order.
        tried: Vec<&'static str>,
    },

    /// Sensor physical dimensions are unknown for the camera model.
    #[error("unknown sensor dimensions for model `{model}` (rig index {rig_index:?})")]
    UnknownSensor {
        /// Camera model string from metadata.
        model: String,
        /// Rig camera index, for multi-sensor rigs.
        rig_index: Option<String>,
    },

    /// A tag was present but its value could not be interpreted.
    #[error("invalid value for tag `{tag}`: {value}")]
    InvalidTagValue {
        /// The offending tag name.
        tag: &'static str,
        /// The value as found in the metadata.
        value: String,
    },

    /// The capture timestamp did not match the `YYYY:MM:DD HH:MM:SS` form.
    #[error("malformed capture timestamp `{0}`")]
    MalformedTimestamp(String),

    /// Relative altitude must be non-negative to produce a footprint.
    #[error("negative relative altitude: {0} m")]
    NegativeRelativeAltitude(f64),
}
