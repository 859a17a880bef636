//! Model export
//!
//! - [`artifact`] - self-contained binary model artifact and inference
//! - [`persist`] - atomic writes of the model and its metrics record

pub mod artifact;
pub mod persist;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use persist::{load_metrics, persist_run, write_atomic, PersistedArtifacts};

use crate::error::Result;
use std::path::Path;

/// Load a persisted model for inference
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelArtifact> {
    ModelArtifact::load(path)
}
