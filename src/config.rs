//! Pipeline configuration
//!
//! All paths and hyperparameters are carried in an explicit [`PipelineConfig`]
//! value. `Default` holds the convention-based values the CLI runs with.

use crate::error::{HydroError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the labeled training dataset
pub const DEFAULT_DATA_PATH: &str = "data/training_v0.1.0.json";
/// Default location of the persisted model artifact
pub const DEFAULT_MODEL_PATH: &str = "models/isolation_forest_v0.1.bin";
/// Metrics file written next to the model artifact
pub const METRICS_FILE_NAME: &str = "model_metrics.json";
/// Fraction of the dataset held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
/// Seed shared by the splitter and the forest
pub const DEFAULT_SEED: u64 = 42;

/// Isolation Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the training set size)
    pub max_samples: usize,
    /// Worker threads for tree construction and scoring; `None` uses every core
    pub n_jobs: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            n_jobs: None,
        }
    }
}

/// Configuration for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input dataset (JSON)
    pub data_path: PathBuf,
    /// Output model artifact; metrics land in the same directory
    pub model_path: PathBuf,
    /// Held-out fraction for the stratified split
    pub test_size: f64,
    /// Seed for the split and the forest
    pub random_seed: u64,
    /// Forest hyperparameters
    pub forest: ForestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            test_size: DEFAULT_TEST_SIZE,
            random_seed: DEFAULT_SEED,
            forest: ForestConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with convention-based defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset path
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the model artifact path
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.forest.n_estimators = n;
        self
    }

    /// Set the per-tree subsample size
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.forest.max_samples = n;
        self
    }

    /// Set the worker pool size
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.forest.n_jobs = Some(n);
        self
    }

    /// Path of the metrics file, in the model's directory
    pub fn metrics_path(&self) -> PathBuf {
        self.model_dir().join(METRICS_FILE_NAME)
    }

    /// Directory holding the model artifact
    pub fn model_dir(&self) -> &Path {
        match self.model_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(HydroError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.forest.n_estimators == 0 {
            return Err(HydroError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "at least one tree is required".to_string(),
            });
        }
        if self.forest.max_samples < 2 {
            return Err(HydroError::InvalidParameter {
                name: "max_samples".to_string(),
                value: self.forest.max_samples.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.forest.n_jobs == Some(0) {
            return Err(HydroError::InvalidParameter {
                name: "n_jobs".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.model_path.file_name().is_none() {
            return Err(HydroError::InvalidParameter {
                name: "model_path".to_string(),
                value: self.model_path.display().to_string(),
                reason: "must name a file".to_string(),
            });
        }
        Ok(())
    }
}
