/// Model Loader: hands out a ready-to-use model.
///
/// A persisted model is read and returned as-is. When nothing is persisted
/// the loader trains one synchronously, so the first request after a fresh
/// deployment pays for the fit.
///
/// Cold-start training is single-flight within a loader: callers that find
/// the store empty queue on a mutex, and every caller after the first finds
/// the freshly written model on its re-check instead of training again.
/// Separate processes sharing the same files can still each train once;
/// the last completed write is what later loads see.

use std::sync::{Arc, Mutex};

use crate::analysis::regression::LinearModel;
use crate::artifacts::StoredModel;
use crate::logging::{self, Component};
use crate::model::RiskError;
use crate::trainer::Trainer;

#[derive(Debug)]
pub struct ModelLoader {
    trainer: Arc<Trainer>,
    cold_start: Mutex<()>,
}

impl ModelLoader {
    pub fn new(trainer: Arc<Trainer>) -> Self {
        Self {
            trainer,
            cold_start: Mutex::new(()),
        }
    }

    /// Returns the persisted model, training one first if none exists.
    ///
    /// # Errors
    /// - `ModelUnavailable` when nothing is persisted and there is no data
    ///   to train on.
    /// - Artifact and dataset errors are passed through unchanged.
    pub fn get_model(&self) -> Result<LinearModel, RiskError> {
        self.get_stored_model().map(|stored| stored.model)
    }

    /// Like `get_model`, keeping the metadata the model was persisted with.
    pub fn get_stored_model(&self) -> Result<StoredModel, RiskError> {
        if let Some(stored) = self.trainer.store().load()? {
            return Ok(stored);
        }

        let _gate = self
            .cold_start
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have trained while we waited.
        if let Some(stored) = self.trainer.store().load()? {
            logging::debug(Component::Loader, "Model appeared while waiting; skipping training");
            return Ok(stored);
        }

        logging::info(Component::Loader, "No persisted model found; training on cold start");
        self.trainer.train().map_err(|e| match e {
            RiskError::TrainingUnavailable(reason) => {
                logging::error(
                    Component::Loader,
                    &format!("Cannot provide a model: {}", reason),
                );
                RiskError::ModelUnavailable(reason)
            }
            other => other,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
