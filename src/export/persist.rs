//! Writing run artifacts to disk
//!
//! Every file goes to a temporary sibling first and is renamed into place
//! once synced, so an interrupted run never leaves a truncated artifact under
//! its final name.

use crate::error::{HydroError, Result};
use crate::evaluation::MetricsRecord;
use crate::export::artifact::ModelArtifact;
use crate::integrity::compute_sha256;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Where a run's outputs ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedArtifacts {
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    /// `sha256:<hex>` of the model file, for audit trails
    pub model_sha256: String,
    pub model_size_bytes: usize,
}

/// Write `bytes` to `path` via a synced temporary file and a rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| HydroError::persistence(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| HydroError::persistence(path, e))?;
    tmp.write_all(bytes)
        .map_err(|e| HydroError::persistence(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| HydroError::persistence(path, e))?;

    tmp.persist(path)
        .map_err(|e| HydroError::persistence(path, e.error))?;
    Ok(())
}

/// Persist the model artifact and its metrics record
pub fn persist_run(
    artifact: &ModelArtifact,
    metrics: &MetricsRecord,
    model_path: &Path,
    metrics_path: &Path,
) -> Result<PersistedArtifacts> {
    let model_bytes = artifact.to_bytes()?;
    write_atomic(model_path, &model_bytes)?;
    let model_sha256 = format!("sha256:{}", compute_sha256(&model_bytes));
    info!(
        path = %model_path.display(),
        size_bytes = model_bytes.len(),
        sha256 = %model_sha256,
        "Model saved"
    );

    let mut metrics_json = serde_json::to_vec_pretty(metrics)?;
    metrics_json.push(b'\n');
    write_atomic(metrics_path, &metrics_json)?;
    info!(path = %metrics_path.display(), "Metrics saved");

    Ok(PersistedArtifacts {
        model_path: model_path.to_path_buf(),
        metrics_path: metrics_path.to_path_buf(),
        model_sha256,
        model_size_bytes: model_bytes.len(),
    })
}

/// Read a metrics file back
pub fn load_metrics(path: impl AsRef<Path>) -> Result<MetricsRecord> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| HydroError::DataLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("model.bin");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // Only the target remains; no temporary siblings left behind
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_atomic_into_file_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = write_atomic(&blocker.join("model.bin"), b"data").unwrap_err();
        assert!(matches!(err, HydroError::Persistence { .. }));
    }
}
