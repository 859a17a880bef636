//! Binary model artifact
//!
//! The artifact carries the fitted forest together with the feature order it
//! was trained on, so inference needs nothing from the training pipeline.

use crate::anomaly::{AnomalyDetector, IsolationForest};
use crate::error::{HydroError, Result};
use crate::evaluation::{to_fraud_labels, MODEL_TYPE};
use crate::features::{self, feature_names, Reading};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bumped whenever the encoded layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Serialized trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_type: String,
    /// Feature order the forest expects
    pub features: Vec<String>,
    /// Contamination the threshold was calibrated with
    pub contamination: f64,
    forest: IsolationForest,
}

impl ModelArtifact {
    /// Wrap a fitted forest
    pub fn new(forest: IsolationForest, contamination: f64) -> Result<Self> {
        if !forest.is_fitted() {
            return Err(HydroError::ModelNotFitted);
        }

        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_type: MODEL_TYPE.to_string(),
            features: feature_names(),
            contamination,
            forest,
        })
    }

    /// The wrapped detector
    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    /// Encode with bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode and check the artifact matches this build's feature contract
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = bincode::deserialize(bytes)?;
        artifact.check_compatible()?;
        Ok(artifact)
    }

    /// Load an artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| HydroError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    fn check_compatible(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(HydroError::IncompatibleModel(format!(
                "format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.features != features::FEATURE_NAMES {
            return Err(HydroError::IncompatibleModel(format!(
                "feature order {:?} (expected {:?})",
                self.features,
                features::FEATURE_NAMES
            )));
        }
        if !self.forest.is_fitted() {
            return Err(HydroError::IncompatibleModel("forest is not fitted".to_string()));
        }
        Ok(())
    }

    /// Anomaly scores for feature rows
    pub fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.score_samples(x)
    }

    /// Fraud labels (1 = fraud) for feature rows
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>> {
        Ok(to_fraud_labels(&self.forest.predict(x)?))
    }

    /// Fraud labels for typed readings
    pub fn predict_readings(&self, readings: &[Reading]) -> Result<Array1<u8>> {
        self.predict(&features::extract_readings(readings).x)
    }
}
