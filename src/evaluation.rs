//! Held-out evaluation and the persisted metrics record

use crate::anomaly::{AnomalyDetector, ANOMALY};
use crate::error::{HydroError, Result};
use crate::features::{feature_names, LABEL_FRAUD, LABEL_NORMAL, N_FEATURES};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Model type recorded in the metrics file
pub const MODEL_TYPE: &str = "IsolationForest";

/// Confusion counts with fraud as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth
    pub fn from_labels(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        let mut matrix = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == LABEL_FRAUD, p == LABEL_FRAUD) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Classification metrics; every ratio with a zero denominator is 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_positive_rate: f64,
}

impl ClassificationMetrics {
    /// Compute metrics from confusion counts
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let tp = matrix.true_positives as f64;
        let fp = matrix.false_positives as f64;
        let tn = matrix.true_negatives as f64;
        let fn_ = matrix.false_negatives as f64;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(tp + tn, matrix.total() as f64),
            precision,
            recall,
            f1_score,
            false_positive_rate: ratio(fp, fp + tn),
        }
    }

    /// Compute metrics from label vectors
    pub fn compute(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        Self::from_confusion(&ConfusionMatrix::from_labels(y_true, y_pred))
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Outcome of scoring the held-out partition
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub metrics: ClassificationMetrics,
    /// Predicted labels, 1 = fraud
    pub predictions: Array1<u8>,
}

/// Map detector output to fraud labels: anomalous => 1, normal => 0
pub fn to_fraud_labels(detector_labels: &Array1<i32>) -> Array1<u8> {
    detector_labels.mapv(|l| if l == ANOMALY { LABEL_FRAUD } else { LABEL_NORMAL })
}

/// Score `x_test` with `detector` and compare with `y_test`
pub fn evaluate<D: AnomalyDetector + ?Sized>(
    detector: &D,
    x_test: &Array2<f64>,
    y_test: &Array1<u8>,
) -> Result<Evaluation> {
    if x_test.nrows() != y_test.len() {
        return Err(HydroError::ShapeError {
            expected: format!("{} labels", x_test.nrows()),
            actual: format!("{} labels", y_test.len()),
        });
    }

    let predictions = to_fraud_labels(&detector.predict(x_test)?);
    let confusion = ConfusionMatrix::from_labels(y_test, &predictions);
    let metrics = ClassificationMetrics::from_confusion(&confusion);

    Ok(Evaluation {
        confusion,
        metrics,
        predictions,
    })
}

/// Metrics file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_positive_rate: f64,
    pub trained_at: DateTime<Utc>,
    pub model_type: String,
    pub features: Vec<String>,
    pub n_features: usize,
    pub training_samples: usize,
    pub test_samples: usize,
}

impl MetricsRecord {
    /// Build the record for a finished evaluation
    pub fn new(
        metrics: &ClassificationMetrics,
        training_samples: usize,
        test_samples: usize,
        trained_at: DateTime<Utc>,
    ) -> Self {
        Self {
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1_score: metrics.f1_score,
            false_positive_rate: metrics.false_positive_rate,
            trained_at,
            model_type: MODEL_TYPE.to_string(),
            features: feature_names(),
            n_features: N_FEATURES,
            training_samples,
            test_samples,
        }
    }

    /// Metric fields only, for comparing runs
    pub fn metrics(&self) -> ClassificationMetrics {
        ClassificationMetrics {
            accuracy: self.accuracy,
            precision: self.precision,
            recall: self.recall,
            f1_score: self.f1_score,
            false_positive_rate: self.false_positive_rate,
        }
    }
}
