/// Model Artifact Store: one fitted model plus its metadata, on disk.
///
/// The store has a single slot. `replace` overwrites both files; there is no
/// history. The model file embeds a copy of the metadata it was written
/// with, and `load` refuses a pair whose metadata copies disagree or where
/// only one of the two files exists.
///
/// Each file is written to a temporary sibling and renamed into place, model
/// first. Within one process a read/write lock keeps `load` from observing a
/// pair mid-replacement. Separate stores over the same paths, in this process
/// or another, never share a temp file; the last completed `replace` wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analysis::regression::LinearModel;
use crate::model::{ModelMetadata, RiskError};

/// A model together with the metadata it was persisted with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredModel {
    pub model: LinearModel,
    pub metadata: ModelMetadata,
}

/// On-disk layout of the model file.
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    metadata: ModelMetadata,
    model: LinearModel,
}

#[derive(Debug)]
pub struct ArtifactStore {
    model_path: PathBuf,
    metadata_path: PathBuf,
    lock: RwLock<()>,
}

impl ArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            metadata_path: metadata_path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Reads the persisted pair.
    ///
    /// Returns `Ok(None)` when neither file exists.
    pub fn load(&self) -> Result<Option<StoredModel>, RiskError> {
        let _guard = self.lock.read().unwrap_or_else(|poisoned| poisoned.into_inner());

        match (self.model_path.exists(), self.metadata_path.exists()) {
            (false, false) => Ok(None),
            (true, false) => Err(RiskError::InconsistentArtifacts(format!(
                "model file {} has no metadata file {}",
                self.model_path.display(),
                self.metadata_path.display()
            ))),
            (false, true) => Err(RiskError::InconsistentArtifacts(format!(
                "metadata file {} has no model file {}",
                self.metadata_path.display(),
                self.model_path.display()
            ))),
            (true, true) => {
                let model_file: ModelFile = read_json(&self.model_path)?;
                let metadata: ModelMetadata = read_json(&self.metadata_path)?;
                if model_file.metadata != metadata {
                    return Err(RiskError::InconsistentArtifacts(format!(
                        "metadata (trained_at {}) does not match model (trained_at {})",
                        metadata.trained_at.to_rfc3339(),
                        model_file.metadata.trained_at.to_rfc3339()
                    )));
                }
                Ok(Some(StoredModel {
                    model: model_file.model,
                    metadata,
                }))
            }
        }
    }

    /// Persisted metadata only, checked against the model file like `load`.
    pub fn metadata(&self) -> Result<Option<ModelMetadata>, RiskError> {
        Ok(self.load()?.map(|stored| stored.metadata))
    }

    /// Replaces the stored pair with `model` and `metadata`.
    pub fn replace(&self, model: &LinearModel, metadata: &ModelMetadata) -> Result<(), RiskError> {
        let model_json = serde_json::to_vec_pretty(&ModelFile {
            metadata: metadata.clone(),
            model: model.clone(),
        })
        .map_err(|e| RiskError::Artifact(format!("failed to serialize model: {}", e)))?;
        let metadata_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| RiskError::Artifact(format!("failed to serialize metadata: {}", e)))?;

        let _guard = self.lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());

        let model_tmp = write_temp(&self.model_path, &model_json)?;
        let metadata_tmp = match write_temp(&self.metadata_path, &metadata_json) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&model_tmp);
                return Err(e);
            }
        };

        rename(&model_tmp, &self.model_path)?;
        rename(&metadata_tmp, &self.metadata_path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RiskError> {
    let bytes = fs::read(path)
        .map_err(|e| RiskError::Artifact(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RiskError::Artifact(format!("failed to parse {}: {}", path.display(), e)))
}

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let nonce = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".tmp-{}-{}", std::process::id(), nonce));
    path.with_file_name(name)
}

fn write_temp(path: &Path, contents: &[u8]) -> Result<PathBuf, RiskError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                RiskError::Artifact(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }
    let tmp = temp_path_for(path);
    fs::write(&tmp, contents)
        .map_err(|e| RiskError::Artifact(format!("failed to write {}: {}", tmp.display(), e)))?;
    Ok(tmp)
}

fn rename(from: &Path, to: &Path) -> Result<(), RiskError> {
    fs::rename(from, to).map_err(|e| {
        RiskError::Artifact(format!(
            "failed to move {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
