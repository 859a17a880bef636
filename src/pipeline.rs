//! End-to-end training pipeline
//!
//! load -> verify -> extract -> split -> train -> evaluate -> persist.
//! Stages run strictly in order; the first fatal error aborts the run.

use crate::config::PipelineConfig;
use crate::dataset::{Dataset, DatasetSummary};
use crate::error::Result;
use crate::evaluation::{evaluate, ConfusionMatrix, MetricsRecord};
use crate::export::{persist_run, ModelArtifact, PersistedArtifacts};
use crate::features;
use crate::integrity::{self, IntegrityReport};
use crate::training::{FraudTrainer, StratifiedSplitter};
use chrono::Utc;
use std::time::Instant;
use tracing::info;

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub summary: DatasetSummary,
    pub integrity: IntegrityReport,
    pub metrics: MetricsRecord,
    pub confusion: ConfusionMatrix,
    /// Contamination derived from the training labels
    pub contamination: f64,
    pub artifacts: PersistedArtifacts,
    pub elapsed_secs: f64,
}

/// Runs the pipeline for one configuration
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured dataset and run every stage
    pub fn run(&self) -> Result<PipelineOutcome> {
        self.config.validate()?;

        info!(path = %self.config.data_path.display(), "Loading dataset");
        let dataset = Dataset::load(&self.config.data_path)?;
        self.run_dataset(&dataset)
    }

    /// Run every stage on an already loaded dataset
    pub fn run_dataset(&self, dataset: &Dataset) -> Result<PipelineOutcome> {
        self.config.validate()?;
        let start = Instant::now();

        let summary = dataset.summary();
        info!(
            version = %summary.version,
            records = summary.n_records,
            declared_fraud_rate = ?summary.declared_fraud_rate,
            observed_fraud_rate = format_args!("{:.4}", summary.observed_fraud_rate),
            "Dataset loaded"
        );

        let integrity = integrity::verify(dataset)?;

        let feature_set = features::extract(&dataset.data)?;
        info!(
            samples = feature_set.n_samples(),
            fraud = feature_set.n_fraud(),
            features = features::N_FEATURES,
            "Features extracted"
        );

        let split = StratifiedSplitter::new(self.config.test_size)
            .with_random_state(self.config.random_seed)
            .split(&feature_set.x, &feature_set.y)?;
        info!(
            train = split.x_train.nrows(),
            test = split.x_test.nrows(),
            "Stratified split"
        );

        let trained = FraudTrainer::new(self.config.forest.clone(), self.config.random_seed)
            .fit(&split.x_train, &split.y_train)?;

        let evaluation = evaluate(&trained.forest, &split.x_test, &split.y_test)?;
        let m = &evaluation.metrics;
        info!(
            accuracy = format_args!("{:.3}", m.accuracy),
            precision = format_args!("{:.3}", m.precision),
            recall = format_args!("{:.3}", m.recall),
            f1 = format_args!("{:.3}", m.f1_score),
            fpr = format_args!("{:.3}", m.false_positive_rate),
            "Evaluation complete"
        );

        let metrics = MetricsRecord::new(
            &evaluation.metrics,
            split.x_train.nrows(),
            split.x_test.nrows(),
            Utc::now(),
        );
        let artifact = ModelArtifact::new(trained.forest, trained.contamination)?;
        let artifacts = persist_run(
            &artifact,
            &metrics,
            &self.config.model_path,
            &self.config.metrics_path(),
        )?;

        Ok(PipelineOutcome {
            summary,
            integrity,
            metrics,
            confusion: evaluation.confusion,
            contamination: trained.contamination,
            artifacts,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}
