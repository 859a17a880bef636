//! Detector training
//!
//! Labels never reach the forest. They only set the contamination rate, the
//! expected share of anomalies used to place the decision threshold.

use crate::anomaly::{AnomalyDetector, IsolationForest};
use crate::config::ForestConfig;
use crate::error::{HydroError, Result};
use crate::features::LABEL_FRAUD;
use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::{info, warn};

/// Upper bound the forest accepts for contamination
const MAX_CONTAMINATION: f64 = 0.5;

/// Fraction of fraud labels in the training partition
pub fn contamination_rate(y_train: &Array1<u8>) -> f64 {
    if y_train.is_empty() {
        return 0.0;
    }
    let n_fraud = y_train.iter().filter(|&&l| l == LABEL_FRAUD).count();
    n_fraud as f64 / y_train.len() as f64
}

/// A fitted detector and the facts about its training
#[derive(Debug, Clone)]
pub struct TrainedDetector {
    pub forest: IsolationForest,
    /// Contamination the threshold was calibrated with
    pub contamination: f64,
    pub training_samples: usize,
    /// Training rows above the fitted threshold
    pub flagged_training: usize,
    pub training_time_secs: f64,
}

/// Fits the Isolation Forest on training features
#[derive(Debug, Clone)]
pub struct FraudTrainer {
    forest: ForestConfig,
    seed: u64,
}

impl FraudTrainer {
    pub fn new(forest: ForestConfig, seed: u64) -> Self {
        Self { forest, seed }
    }

    /// Train on `x_train`, using `y_train` only for the contamination rate
    pub fn fit(&self, x_train: &Array2<f64>, y_train: &Array1<u8>) -> Result<TrainedDetector> {
        if x_train.nrows() != y_train.len() {
            return Err(HydroError::ShapeError {
                expected: format!("{} labels", x_train.nrows()),
                actual: format!("{} labels", y_train.len()),
            });
        }

        let mut contamination = contamination_rate(y_train);
        if contamination > MAX_CONTAMINATION {
            warn!(
                contamination,
                "Contamination above {}, clamping",
                MAX_CONTAMINATION
            );
            contamination = MAX_CONTAMINATION;
        }

        info!(
            samples = x_train.nrows(),
            contamination = format_args!("{:.3}", contamination),
            n_estimators = self.forest.n_estimators,
            max_samples = self.forest.max_samples,
            "Training Isolation Forest"
        );

        let start = Instant::now();
        let mut forest = IsolationForest::new()
            .with_n_estimators(self.forest.n_estimators)
            .with_max_samples(self.forest.max_samples)
            .with_contamination(contamination)
            .with_seed(self.seed);
        if let Some(n_jobs) = self.forest.n_jobs {
            forest = forest.with_n_jobs(n_jobs);
        }

        forest.fit(x_train)?;
        let training_time_secs = start.elapsed().as_secs_f64();

        let flagged_training = forest.detect(x_train)?.n_anomalies;
        info!(
            flagged = flagged_training,
            threshold = forest.threshold(),
            elapsed_secs = format_args!("{:.2}", training_time_secs),
            "Training complete"
        );

        Ok(TrainedDetector {
            forest,
            contamination,
            training_samples: x_train.nrows(),
            flagged_training,
            training_time_secs,
        })
    }
}
