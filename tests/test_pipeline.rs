//! Integration test: Full pipeline (load → verify → split → train → persist)

use hydro_anomaly::config::PipelineConfig;
use hydro_anomaly::dataset::{Dataset, DatasetMetadata};
use hydro_anomaly::error::HydroError;
use hydro_anomaly::export::{load_metrics, load_model};
use hydro_anomaly::features::{self, Reading};
use hydro_anomaly::integrity::{self, IntegrityStatus};
use hydro_anomaly::pipeline::TrainingPipeline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 1000 readings, the last 50 fraudulent (meter inflated against flow)
fn create_readings(n: usize, n_fraud: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|i| {
            let fraud = i >= n - n_fraud;
            let flow: f64 = rng.gen_range(40.0..60.0);
            let efficiency: f64 = rng.gen_range(85.0..95.0);
            let kwh = if fraud {
                flow * rng.gen_range(2.5..4.0)
            } else {
                flow * efficiency / 100.0
            };
            let mut record = json!({
                "flowRate": round2(flow),
                "generatedKwh": round2(kwh),
                "efficiency": round2(if fraud { rng.gen_range(120.0..160.0) } else { efficiency }),
                "temperature": round2(rng.gen_range(12.0..18.0)),
                "isFraud": fraud,
            });
            // Optional sensors are sometimes missing
            if i % 10 != 0 {
                record["pressure"] = json!(round2(rng.gen_range(85.0..95.0)));
            }
            if i % 7 != 0 {
                record["vibration"] = json!(round2(rng.gen_range(1.5..2.5)));
            }
            record
        })
        .collect()
}

fn create_dataset(data: Vec<Value>) -> Dataset {
    let mut dataset = Dataset {
        metadata: DatasetMetadata {
            version: Some("0.1.0".to_string()),
            fraud_rate: Some(0.05),
            sha256: None,
        },
        data,
    };
    let hash = integrity::dataset_hash(&dataset).unwrap();
    dataset.metadata.sha256 = Some(hash);
    dataset
}

fn write_dataset(dir: &Path, dataset: &Dataset) -> PathBuf {
    let path = dir.join("training.json");
    std::fs::write(&path, serde_json::to_string_pretty(dataset).unwrap()).unwrap();
    path
}

fn config_for(dir: &Path, data_path: PathBuf) -> PipelineConfig {
    PipelineConfig::new()
        .with_data_path(data_path)
        .with_model_path(dir.join("models").join("isolation_forest.bin"))
}

#[test]
fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let dataset = create_dataset(create_readings(1000, 50));
    let data_path = write_dataset(dir.path(), &dataset);
    let config = config_for(dir.path(), data_path);

    let outcome = TrainingPipeline::new(config.clone()).run().unwrap();

    assert_eq!(outcome.integrity.status, IntegrityStatus::Verified);
    assert_eq!(outcome.summary.n_records, 1000);
    assert_eq!(outcome.metrics.training_samples, 800);
    assert_eq!(outcome.metrics.test_samples, 200);
    assert!((outcome.contamination - 0.05).abs() < 1e-9);
    assert_eq!(outcome.confusion.total(), 200);
    assert_eq!(
        outcome.confusion.true_positives + outcome.confusion.false_negatives,
        10
    );

    // Metrics file round-trips and lists the feature order
    let metrics = load_metrics(config.metrics_path()).unwrap();
    assert_eq!(metrics, outcome.metrics);
    assert_eq!(metrics.features, features::FEATURE_NAMES);
    assert_eq!(metrics.n_features, 6);
    assert_eq!(metrics.model_type, "IsolationForest");

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(config.metrics_path()).unwrap()).unwrap();
    let keys: Vec<&str> = raw.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "accuracy",
            "precision",
            "recall",
            "f1_score",
            "false_positive_rate",
            "trained_at",
            "model_type",
            "features",
            "n_features",
            "training_samples",
            "test_samples",
        ]
    );

    // Inflated meter readings are obvious outliers
    assert!(outcome.metrics.recall > 0.5);
    assert!(outcome.metrics.accuracy > 0.9);
}

#[test]
fn test_pipeline_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let dataset = create_dataset(create_readings(1000, 50));
    let data_path = write_dataset(dir.path(), &dataset);

    let first_dir = dir.path().join("first");
    let second_dir = dir.path().join("second");
    let first = TrainingPipeline::new(config_for(&first_dir, data_path.clone()))
        .run()
        .unwrap();
    let second = TrainingPipeline::new(config_for(&second_dir, data_path).with_n_jobs(1))
        .run()
        .unwrap();

    assert_eq!(first.metrics.metrics(), second.metrics.metrics());
    assert_eq!(first.confusion, second.confusion);

    let first_model = load_model(&first.artifacts.model_path).unwrap();
    let second_model = load_model(&second.artifacts.model_path).unwrap();
    let probe = features::extract(&dataset.data[..100]).unwrap();
    assert_eq!(
        first_model.score(&probe.x).unwrap(),
        second_model.score(&probe.x).unwrap()
    );
}

#[test]
fn test_loaded_model_predicts_readings() {
    let dir = TempDir::new().unwrap();
    let dataset = create_dataset(create_readings(1000, 50));
    let data_path = write_dataset(dir.path(), &dataset);
    let outcome = TrainingPipeline::new(config_for(dir.path(), data_path))
        .run()
        .unwrap();

    let model = load_model(&outcome.artifacts.model_path).unwrap();
    let normal = Reading {
        flow_rate: 50.0,
        generated_kwh: 45.0,
        efficiency: 90.0,
        temperature: 15.0,
        pressure: Some(90.0),
        vibration: Some(2.0),
        is_fraud: false,
    };
    let inflated = Reading {
        flow_rate: 50.0,
        generated_kwh: 400.0,
        efficiency: 300.0,
        temperature: 15.0,
        pressure: None,
        vibration: None,
        is_fraud: true,
    };

    let labels = model.predict_readings(&[normal, inflated]).unwrap();
    assert_eq!(labels[0], 0);
    assert_eq!(labels[1], 1);
}

#[test]
fn test_hash_mismatch_still_trains() {
    let dir = TempDir::new().unwrap();
    let mut dataset = create_dataset(create_readings(200, 20));
    dataset.metadata.sha256 = Some("0".repeat(64));
    let data_path = write_dataset(dir.path(), &dataset);

    let outcome = TrainingPipeline::new(config_for(dir.path(), data_path))
        .run()
        .unwrap();

    assert!(matches!(
        outcome.integrity.status,
        IntegrityStatus::Mismatch { .. }
    ));
    assert!(outcome.artifacts.model_path.exists());
}

#[test]
fn test_missing_flow_rate_aborts_before_persisting() {
    let dir = TempDir::new().unwrap();
    let mut data = create_readings(200, 20);
    data[17].as_object_mut().unwrap().remove("flowRate");
    let dataset = create_dataset(data);
    let data_path = write_dataset(dir.path(), &dataset);
    let config = config_for(dir.path(), data_path);

    let err = TrainingPipeline::new(config.clone()).run().unwrap_err();

    match err {
        HydroError::MissingField { index, field } => {
            assert_eq!(index, 17);
            assert_eq!(field, "flowRate");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.model_path.exists());
    assert!(!config.metrics_path().exists());
}

#[test]
fn test_missing_dataset_file() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), dir.path().join("absent.json"));

    let err = TrainingPipeline::new(config.clone()).run().unwrap_err();

    assert!(matches!(err, HydroError::DataLoad { .. }));
    assert!(!config.model_path.exists());
}

#[test]
fn test_single_class_dataset_fails_split() {
    let dir = TempDir::new().unwrap();
    let dataset = create_dataset(create_readings(100, 0));
    let data_path = write_dataset(dir.path(), &dataset);
    let config = config_for(dir.path(), data_path);

    let err = TrainingPipeline::new(config.clone()).run().unwrap_err();

    assert!(matches!(err, HydroError::Split(_)));
    assert!(!config.model_path.exists());
}
