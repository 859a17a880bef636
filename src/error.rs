//! Error types for the hydropower fraud detection pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, HydroError>;

/// Main error type for the pipeline
///
/// Every variant is fatal to a run. Integrity mismatches are not errors: they are
/// reported through [`crate::integrity::IntegrityStatus`].
#[derive(Error, Debug)]
pub enum HydroError {
    #[error("Failed to load dataset from {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("Record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Record {index} has invalid field '{field}': {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Record {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Split error: {0}")]
    Split(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Failed to persist {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Incompatible model artifact: {0}")]
    IncompatibleModel(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HydroError {
    /// Build a persistence error for `path`
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        HydroError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for HydroError {
    fn from(err: serde_json::Error) -> Self {
        HydroError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for HydroError {
    fn from(err: bincode::Error) -> Self {
        HydroError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HydroError {
    fn from(err: ndarray::ShapeError) -> Self {
        HydroError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
