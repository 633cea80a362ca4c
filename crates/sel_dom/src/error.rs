use sel_animation::ConfigurationError;
use sel_core::{ColorError, EventError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("invalid value `{value}` for `{property}`")]
    InvalidCssValue { property: String, value: String },

    #[error("cannot interpolate `{property}` from `{from}` to `{to}`: units or shape differ")]
    UnitMismatch {
        property: String,
        from: String,
        to: String,
    },

    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("node is no longer in the document")]
    StaleNode,

    #[error("cannot insert a node into its own subtree")]
    HierarchyRequest,
}

pub type Result<T, E = DomError> = std::result::Result<T, E>;
