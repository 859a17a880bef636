//! Hydro Anomaly - fraud detection for hydropower telemetry
//!
//! Offline batch pipeline that trains an Isolation Forest on labeled sensor
//! readings and persists the model with its evaluation metrics.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Dataset loading and canonical serialization
//! - [`integrity`] - SHA-256 verification of the dataset contents
//! - [`features`] - Fixed six-column feature extraction
//!
//! ## Model
//! - [`training`] - Stratified splitting and detector training
//! - [`anomaly`] - Isolation Forest
//! - [`evaluation`] - Held-out metrics and the metrics record
//! - [`export`] - Model artifact and atomic persistence
//!
//! ## Orchestration
//! - [`config`] - Explicit pipeline configuration
//! - [`pipeline`] - Stage-by-stage run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod dataset;
pub mod integrity;
pub mod features;

// Model
pub mod training;
pub mod anomaly;
pub mod evaluation;
pub mod export;

// Orchestration
pub mod pipeline;
pub mod cli;

pub use error::{HydroError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{HydroError, Result};
    pub use crate::config::{ForestConfig, PipelineConfig};
    pub use crate::dataset::{Dataset, DatasetMetadata};
    pub use crate::integrity::{IntegrityReport, IntegrityStatus};
    pub use crate::features::{FeatureSet, Reading, FEATURE_NAMES};
    pub use crate::training::{FraudTrainer, StratifiedSplitter, TrainTestSplit};
    pub use crate::anomaly::{AnomalyDetector, IsolationForest};
    pub use crate::evaluation::{ClassificationMetrics, MetricsRecord};
    pub use crate::export::{load_model, ModelArtifact, PersistedArtifacts};
    pub use crate::pipeline::{PipelineOutcome, TrainingPipeline};
}
