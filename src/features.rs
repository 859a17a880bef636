//! Feature extraction
//!
//! Maps raw readings to the fixed six-column feature matrix and binary labels.
//! Column order is shared with every consumer of the trained model; changing
//! it breaks persisted artifacts.

use crate::error::{HydroError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Feature names in extraction order
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "flowRate",
    "generatedKwh",
    "efficiency",
    "temperature",
    "pressure",
    "vibration",
];

/// Width of the feature vector
pub const N_FEATURES: usize = 6;

/// Pressure substituted when a reading does not carry one
pub const DEFAULT_PRESSURE: f64 = 90.0;

/// Vibration substituted when a reading does not carry one
pub const DEFAULT_VIBRATION: f64 = 2.0;

/// Label value for fraudulent readings
pub const LABEL_FRAUD: u8 = 1;

/// Label value for normal readings
pub const LABEL_NORMAL: u8 = 0;

/// One typed sensor reading
///
/// `efficiency` is expected as a percentage (0-100). It is passed through
/// unvalidated, so fractional data trains just as well as long as the whole
/// dataset uses one convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub flow_rate: f64,
    pub generated_kwh: f64,
    pub efficiency: f64,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<f64>,
    pub is_fraud: bool,
}

impl Reading {
    /// Parse the reading at position `index` of the dataset
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let record = value.as_object().ok_or_else(|| HydroError::InvalidRecord {
            index,
            reason: format!("expected an object, found {}", json_type(value)),
        })?;

        Ok(Self {
            flow_rate: required_f64(record, index, "flowRate")?,
            generated_kwh: required_f64(record, index, "generatedKwh")?,
            efficiency: required_f64(record, index, "efficiency")?,
            temperature: required_f64(record, index, "temperature")?,
            pressure: optional_f64(record, index, "pressure")?,
            vibration: optional_f64(record, index, "vibration")?,
            is_fraud: required_flag(record, index, "isFraud")?,
        })
    }

    /// Feature vector in [`FEATURE_NAMES`] order, defaults substituted
    pub fn feature_vector(&self) -> [f64; N_FEATURES] {
        [
            self.flow_rate,
            self.generated_kwh,
            self.efficiency,
            self.temperature,
            self.pressure.unwrap_or(DEFAULT_PRESSURE),
            self.vibration.unwrap_or(DEFAULT_VIBRATION),
        ]
    }

    /// Binary label: 1 = fraud, 0 = normal
    pub fn label(&self) -> u8 {
        if self.is_fraud {
            LABEL_FRAUD
        } else {
            LABEL_NORMAL
        }
    }
}

/// Feature matrix and labels, index-aligned with the input readings
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// N x 6 feature matrix
    pub x: Array2<f64>,
    /// N binary labels
    pub y: Array1<u8>,
}

impl FeatureSet {
    /// Number of rows
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Count of fraud labels
    pub fn n_fraud(&self) -> usize {
        self.y.iter().filter(|&&l| l == LABEL_FRAUD).count()
    }
}

/// Extract features and labels from raw dataset records
///
/// Fails on the first record missing a required field, naming its index.
pub fn extract(records: &[Value]) -> Result<FeatureSet> {
    let readings = records
        .iter()
        .enumerate()
        .map(|(index, value)| Reading::from_value(index, value))
        .collect::<Result<Vec<_>>>()?;

    Ok(extract_readings(&readings))
}

/// Extract features and labels from typed readings
pub fn extract_readings(readings: &[Reading]) -> FeatureSet {
    let rows: Vec<[f64; N_FEATURES]> = readings.iter().map(Reading::feature_vector).collect();
    let x = Array2::from_shape_fn((rows.len(), N_FEATURES), |(r, c)| rows[r][c]);
    let y = readings.iter().map(Reading::label).collect::<Array1<u8>>();

    FeatureSet { x, y }
}

/// Feature names as owned strings, for metrics and artifacts
pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn present<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| !v.is_null())
}

fn required_f64(record: &Map<String, Value>, index: usize, field: &'static str) -> Result<f64> {
    let value = present(record, field).ok_or(HydroError::MissingField { index, field })?;
    as_f64(value, index, field)
}

fn optional_f64(
    record: &Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<Option<f64>> {
    present(record, field)
        .map(|value| as_f64(value, index, field))
        .transpose()
}

fn required_flag(record: &Map<String, Value>, index: usize, field: &'static str) -> Result<bool> {
    match present(record, field) {
        None => Err(HydroError::MissingField { index, field }),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).ok_or_else(|| {
            HydroError::InvalidField {
                index,
                field,
                reason: format!("unrepresentable number {}", n),
            }
        }),
        Some(other) => Err(HydroError::InvalidField {
            index,
            field,
            reason: format!("expected a boolean, found {}", json_type(other)),
        }),
    }
}

fn as_f64(value: &Value, index: usize, field: &'static str) -> Result<f64> {
    value.as_f64().ok_or_else(|| HydroError::InvalidField {
        index,
        field,
        reason: format!("expected a number, found {}", json_type(value)),
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
