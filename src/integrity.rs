//! Dataset integrity verification
//!
//! Recomputes the SHA-256 of the canonical `data` serialization and compares
//! it with the hash recorded in the dataset header. A mismatch is a provenance
//! signal only; the pipeline keeps going with the data as loaded.

use crate::dataset::Dataset;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Outcome of an integrity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Recorded and computed hashes agree
    Verified,
    /// Recorded hash differs from the data
    Mismatch { expected: String },
    /// The header carries no hash to compare against
    Unavailable,
}

/// Result of verifying a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Hex digest computed from the data
    pub computed: String,
    pub status: IntegrityStatus,
}

impl IntegrityReport {
    /// Whether the recorded hash matched
    pub fn is_verified(&self) -> bool {
        self.status == IntegrityStatus::Verified
    }
}

/// Compute the lowercase hex SHA-256 of `data`
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash of the dataset's canonical `data` serialization
pub fn dataset_hash(dataset: &Dataset) -> Result<String> {
    Ok(compute_sha256(&dataset.canonical_data()?))
}

/// Verify the dataset against its recorded hash
///
/// Never fails on a mismatch; errors only if the data cannot be serialized.
pub fn verify(dataset: &Dataset) -> Result<IntegrityReport> {
    let computed = dataset_hash(dataset)?;
    let expected = dataset
        .metadata
        .sha256
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let status = match expected {
        Some(expected) if expected.eq_ignore_ascii_case(&computed) => {
            info!(sha256 = %short(&computed), "Dataset integrity verified");
            IntegrityStatus::Verified
        }
        Some(expected) => {
            warn!(
                expected = %expected,
                computed = %computed,
                "Dataset SHA-256 mismatch, continuing with data as loaded"
            );
            IntegrityStatus::Mismatch {
                expected: expected.to_string(),
            }
        }
        None => {
            warn!(computed = %computed, "Dataset metadata has no sha256, integrity not checked");
            IntegrityStatus::Unavailable
        }
    };

    Ok(IntegrityReport { computed, status })
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
