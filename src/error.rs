//! Error types for slice operations.

use thiserror::Error;

/// Main error type for store operations.
///
/// Reads and wholesale writes never fail; only the structured mutators and the
/// typed accessors have failure modes.
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("Slice not found: {0}")]
    SliceNotFound(String),

    #[error("Cannot merge into slice {name}: value is {found}, not an object")]
    MergeTargetNotObject { name: String, found: &'static str },

    #[error("Merge patch must be an object, got {0}")]
    MergePatchNotObject(&'static str),

    #[error("Reducer {reducer} is not registered for slice {slice}")]
    ReducerNotFound { slice: String, reducer: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SliceError {
    fn from(e: serde_json::Error) -> Self {
        SliceError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, SliceError>;
