/// An error type for footprint projection.
#[derive(thiserror::Error, Debug)]
pub enum FootprintError {
    /// The projected ground polygon is unusable: a corner ray points at or
    /// above the horizon, two corners coincide, or the polygon has no area.
    #[error("degenerate footprint: {0}")]
    DegenerateFootprint(String),

    /// The optics cannot form an image (non-positive focal length or sensor
    /// dimensions).
    #[error("invalid optics: {0}")]
    InvalidOptics(String),
}
