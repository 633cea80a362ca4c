use thiserror::Error;

/// Malformed or contradictory animation options.
///
/// Raised before a run is created, so a failed request never produces a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("`from` has {from} values but `to` has {to}")]
    LengthMismatch { from: usize, to: usize },

    #[error("`to` must contain at least one value")]
    EmptyTarget,

    #[error("unknown easing `{0}`")]
    UnknownEasing(String),

    #[error("replay must be -1 (forever) or a non-negative count, got {0}")]
    InvalidReplay(i32),

    #[error("`{0}` must be a finite number")]
    NonFinite(&'static str),

    #[error("invalid cubic-bezier `{0}`: x control points must lie in [0, 1]")]
    InvalidCubicBezier(String),

    #[error("invalid steps `{0}`: the step count must be a positive integer")]
    InvalidSteps(String),

    #[error("invalid options: {0}")]
    Options(String),
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(err: serde_json::Error) -> Self {
        ConfigurationError::Options(err.to_string())
    }
}
