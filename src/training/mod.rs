//! Model training module
//!
//! Provides the pieces between feature extraction and evaluation:
//! - Stratified train/test splitting
//! - Isolation Forest fitting with label-derived contamination

pub mod split;
pub mod trainer;

pub use split::{StratifiedSplitter, TrainTestSplit};
pub use trainer::{contamination_rate, FraudTrainer, TrainedDetector};
