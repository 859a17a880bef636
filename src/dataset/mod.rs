//! Labeled telemetry dataset
//!
//! The input file is a JSON document with a `metadata` header and a `data`
//! array of raw readings. Readings are kept as parsed JSON values so the
//! integrity hash is computed over exactly what the producer wrote; typed
//! access happens during feature extraction.

pub mod canonical;

use crate::error::{HydroError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use canonical::{python_float_repr, to_canonical_vec, CanonicalFormatter};

/// Dataset header written by the producer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Dataset version label
    #[serde(default)]
    pub version: Option<String>,
    /// Declared fraction of fraudulent readings
    #[serde(default)]
    pub fraud_rate: Option<f64>,
    /// Hex SHA-256 of the canonical `data` serialization
    #[serde(default)]
    pub sha256: Option<String>,
}

/// A loaded dataset: header plus raw readings in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub metadata: DatasetMetadata,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Summary logged after a dataset is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub version: String,
    pub declared_fraud_rate: Option<f64>,
    pub n_records: usize,
    /// Fraction of records whose `isFraud` is truthy
    pub observed_fraud_rate: f64,
}

impl Dataset {
    /// Load a dataset from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| HydroError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| HydroError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a dataset from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Number of readings
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the dataset has no readings
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Canonical serialization of the `data` array
    pub fn canonical_data(&self) -> Result<Vec<u8>> {
        let array = Value::Array(self.data.clone());
        Ok(to_canonical_vec(&array)?)
    }

    /// Describe the dataset for logging
    pub fn summary(&self) -> DatasetSummary {
        let n_fraud = self
            .data
            .iter()
            .filter(|record| match record.get("isFraud") {
                Some(Value::Bool(flag)) => *flag,
                Some(Value::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0),
                _ => false,
            })
            .count();

        DatasetSummary {
            version: self
                .metadata
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            declared_fraud_rate: self.metadata.fraud_rate,
            n_records: self.data.len(),
            observed_fraud_rate: if self.data.is_empty() {
                0.0
            } else {
                n_fraud as f64 / self.data.len() as f64
            },
        }
    }
}
