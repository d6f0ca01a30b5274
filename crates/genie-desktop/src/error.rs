//! Error types for the genie stage
//!
//! None of these reach the visitor. The orchestration loop matches on them
//! and degrades: missing structure is retried, restricted pixels fall back
//! to an instant reveal, and re-entrant signals are absorbed.

/// Errors raised by the stage, its surfaces and its configuration.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GenieError {
    /// A required page node is absent.
    #[error("required page structure missing: {what}")]
    ResourceMissing { what: String },

    /// Pixel data cannot be read (cross-origin image, no 2d context).
    #[error("image pixels unavailable: {0}")]
    RenderingRestricted(String),

    /// The image exists but has not finished decoding.
    #[error("image not decoded yet")]
    ImagePending,

    /// Configuration JSON could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The browser backend refused an operation.
    #[error("browser backend: {0}")]
    Backend(String),
}

impl GenieError {
    /// Shorthand for a missing node error
    pub fn missing(what: impl Into<String>) -> Self {
        GenieError::ResourceMissing { what: what.into() }
    }
}

impl From<serde_json::Error> for GenieError {
    fn from(e: serde_json::Error) -> Self {
        GenieError::Config(e.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, GenieError>;
