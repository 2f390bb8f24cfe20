/// Trainer: fits a fresh model from the whole dataset and persists it.
///
/// Every run replaces the stored model wholesale. If the dataset is missing
/// or empty the run stops before touching the artifact store, so whatever
/// model was persisted before stays in place.
///
/// # Clock injection
/// `train_at` takes the timestamp recorded as `trained_at`; `train` passes
/// `Utc::now()`. Tests use `train_at` to keep metadata deterministic.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::analysis::regression::LinearModel;
use crate::artifacts::{ArtifactStore, StoredModel};
use crate::ingest::dataset::CsvDataset;
use crate::logging::{self, Component};
use crate::model::{ModelMetadata, RiskError};

#[derive(Debug)]
pub struct Trainer {
    dataset: CsvDataset,
    store: Arc<ArtifactStore>,
}

impl Trainer {
    pub fn new(dataset: CsvDataset, store: Arc<ArtifactStore>) -> Self {
        Self { dataset, store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Trains on the current dataset and persists the result.
    pub fn train(&self) -> Result<StoredModel, RiskError> {
        self.train_at(Utc::now())
    }

    /// Like `train`, recording `now` as the training timestamp.
    ///
    /// # Errors
    /// - `TrainingUnavailable` when the dataset is missing or has no rows.
    /// - `Dataset` when the dataset is malformed.
    /// - `Artifact` when the model could not be written.
    pub fn train_at(&self, now: DateTime<Utc>) -> Result<StoredModel, RiskError> {
        let dataset_path = self.dataset.path().display().to_string();

        let rows = match self.dataset.load()? {
            Some(rows) => rows,
            None => {
                logging::warn(
                    Component::Dataset,
                    &format!("No training data available at {}", dataset_path),
                );
                return Err(RiskError::TrainingUnavailable(format!(
                    "no training data at {}",
                    dataset_path
                )));
            }
        };

        let model = LinearModel::fit(&rows)?;
        let metadata = ModelMetadata {
            trained_at: now,
            samples: rows.len(),
        };
        self.store.replace(&model, &metadata)?;

        logging::log_training_summary(metadata.samples, &dataset_path);
        Ok(StoredModel { model, metadata })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
