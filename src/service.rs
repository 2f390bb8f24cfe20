/// `RiskService`: the surface outer layers (HTTP handlers, the CLI) call.
///
/// Wires the dataset, artifact store, trainer, loader, scorer, and alert
/// dispatcher together from a `ServiceConfig`, and exposes the operations
/// callers need: warm up at startup, score a reading, retrain, and report
/// what model is currently persisted.

use std::sync::Arc;

use crate::alert::dispatch::{AlertDispatcher, DisabledDispatcher, SmsDispatcher};
use crate::artifacts::ArtifactStore;
use crate::config::{ServiceConfig, SmsConfig};
use crate::ingest::dataset::CsvDataset;
use crate::loader::ModelLoader;
use crate::logging::{self, Component};
use crate::model::{ModelMetadata, RiskAssessment, RiskError};
use crate::scorer::{RawInput, Scorer};
use crate::trainer::Trainer;

pub struct RiskService {
    trainer: Arc<Trainer>,
    loader: Arc<ModelLoader>,
    scorer: Scorer,
}

impl RiskService {
    /// Builds the service with an explicit alert dispatcher.
    pub fn new(config: &ServiceConfig, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        let store = Arc::new(ArtifactStore::new(
            config.artifacts.model_path.clone(),
            config.artifacts.metadata_path.clone(),
        ));
        let trainer = Arc::new(Trainer::new(
            CsvDataset::new(config.data.dataset_path.clone()),
            store,
        ));
        let loader = Arc::new(ModelLoader::new(Arc::clone(&trainer)));
        let scorer = Scorer::new(Arc::clone(&loader), dispatcher)
            .with_alerts_enabled(config.alerts.enabled);
        Self {
            trainer,
            loader,
            scorer,
        }
    }

    /// Builds the service, delivering alerts by SMS when credentials are
    /// available in the environment and falling back to a disabled dispatcher
    /// otherwise.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config, dispatcher_from_env(config))
    }

    /// Makes sure a model is persisted before the first request, training
    /// one from the dataset if needed. Call once at startup.
    ///
    /// # Errors
    /// `ModelUnavailable` when there is no model and no data to train on.
    pub fn warm_up(&self) -> Result<ModelMetadata, RiskError> {
        let stored = self.loader.get_stored_model()?;
        logging::info(
            Component::Loader,
            &format!(
                "Model ready (trained {} on {} samples)",
                stored.metadata.trained_at.to_rfc3339(),
                stored.metadata.samples
            ),
        );
        Ok(stored.metadata)
    }

    /// Scores one reading. See `Scorer::score`.
    pub fn score(&self, raw: &RawInput) -> Result<RiskAssessment, RiskError> {
        self.scorer.score(raw)
    }

    /// Retrains from the dataset and returns the new metadata.
    ///
    /// # Errors
    /// `TrainingUnavailable` when there is no data; the persisted model is
    /// left as it was.
    pub fn train(&self) -> Result<ModelMetadata, RiskError> {
        self.trainer.train().map(|trained| trained.metadata)
    }

    /// Metadata of the persisted model, if any. Never trains.
    pub fn model_status(&self) -> Result<Option<ModelMetadata>, RiskError> {
        self.trainer.store().metadata()
    }
}

fn dispatcher_from_env(config: &ServiceConfig) -> Arc<dyn AlertDispatcher> {
    if !config.alerts.enabled || !config.alerts.sms_enabled {
        return Arc::new(DisabledDispatcher::new("SMS alerts disabled in config"));
    }

    let sms = match SmsConfig::from_env() {
        Ok(sms) => sms,
        Err(missing) => {
            logging::warn(
                Component::Alert,
                &format!("SMS alerts unavailable; missing {}", missing.join(", ")),
            );
            return Arc::new(DisabledDispatcher::new(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
    };

    match SmsDispatcher::new(sms) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            logging::error(Component::Alert, &format!("Cannot build SMS client: {}", e));
            Arc::new(DisabledDispatcher::new(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
