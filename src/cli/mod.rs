//! Command-line interface
//!
//! Runs the training pipeline on convention-based paths. Every flag is
//! optional, so the binary works when invoked with no arguments.

use clap::Parser;
use colored::*;
use std::path::PathBuf;

use crate::config::{PipelineConfig, DEFAULT_DATA_PATH, DEFAULT_MODEL_PATH, DEFAULT_SEED};
use crate::integrity::IntegrityStatus;
use crate::pipeline::{PipelineOutcome, TrainingPipeline};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 80) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<20} {}", muted(key), val.white());
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hydro-anomaly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the hydropower fraud detector (Isolation Forest)")]
#[command(long_about = None)]
pub struct Cli {
    /// Labeled training dataset (JSON)
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Model artifact output; metrics are written to the same directory
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Seed for the split and the forest
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Worker threads for tree construction (default: all cores)
    #[arg(long)]
    pub jobs: Option<usize>,
}

impl Cli {
    /// Pipeline configuration for these arguments
    pub fn to_config(&self) -> PipelineConfig {
        let config = PipelineConfig::new()
            .with_data_path(&self.data)
            .with_model_path(&self.model)
            .with_seed(self.seed);
        match self.jobs {
            Some(n) => config.with_n_jobs(n),
            None => config,
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Run the pipeline and print a summary
pub fn cmd_train(config: PipelineConfig) -> anyhow::Result<()> {
    let outcome = TrainingPipeline::new(config).run()?;
    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &PipelineOutcome) {
    section("Dataset");
    kv("Version", &outcome.summary.version);
    kv("Samples", &outcome.summary.n_records.to_string());
    kv(
        "Fraud rate",
        &outcome
            .summary
            .declared_fraud_rate
            .map(|r| format!("{}", r))
            .unwrap_or_else(|| "unknown".to_string()),
    );
    let short_hash = outcome.integrity.computed.get(..16).unwrap_or("");
    match &outcome.integrity.status {
        IntegrityStatus::Verified => {
            println!("  {:<20} {}… {}", muted("SHA256"), short_hash, ok("verified"))
        }
        IntegrityStatus::Mismatch { .. } => {
            println!("  {:<20} {}… {}", muted("SHA256"), short_hash, warn("mismatch"))
        }
        IntegrityStatus::Unavailable => {
            println!("  {:<20} {}… {}", muted("SHA256"), short_hash, warn("not recorded"))
        }
    }

    section("Training");
    kv("Training set", &outcome.metrics.training_samples.to_string());
    kv("Test set", &outcome.metrics.test_samples.to_string());
    kv("Contamination", &format!("{:.3}", outcome.contamination));

    let m = &outcome.metrics;
    section("Model performance");
    kv("Accuracy", &pct(m.accuracy));
    kv("Precision", &pct(m.precision));
    kv("Recall", &pct(m.recall));
    kv("F1-Score", &pct(m.f1_score));
    kv("FPR", &pct(m.false_positive_rate));

    section("Artifacts");
    kv("Model", &outcome.artifacts.model_path.display().to_string());
    kv("Metrics", &outcome.artifacts.metrics_path.display().to_string());
    kv("Fingerprint", &outcome.artifacts.model_sha256);

    println!();
    println!(
        "  {} {}",
        ok("✓"),
        format!("Training pipeline complete in {:.2}s", outcome.elapsed_secs).white()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_uses_conventions() {
        let cli = Cli::try_parse_from(["hydro-anomaly"]).unwrap();
        assert_eq!(cli.to_config(), PipelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "hydro-anomaly",
            "--data",
            "in.json",
            "--model",
            "out/m.bin",
            "--seed",
            "7",
            "--jobs",
            "2",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.data_path, PathBuf::from("in.json"));
        assert_eq!(config.metrics_path(), PathBuf::from("out/model_metrics.json"));
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.forest.n_jobs, Some(2));
    }
}
