/// Scorer: turns one caller-supplied reading into a risk assessment.
///
/// Steps, in order:
/// 1. Normalize the raw field map into a `FeatureVector`, substituting the
///    documented default for each absent field.
/// 2. Obtain a model from the loader (which may train on cold start).
/// 3. Clamp the model output to [0, 1] and classify it.
/// 4. For HIGH risk, hand the score to the alert dispatcher.
///
/// Threshold comparisons use the unrounded clamped score; the reported
/// score is rounded to 3 decimal places. A failed dispatch only sets
/// `alert_fired = false`; it never turns a scored request into an error.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::alert::dispatch::AlertDispatcher;
use crate::alert::thresholds::{classify_risk, is_alert_candidate};
use crate::loader::ModelLoader;
use crate::logging::{self, Component};
use crate::model::{
    DEFAULT_CONTAMINATION, DEFAULT_RAINFALL, DEFAULT_TEMPERATURE, DEFAULT_TURBIDITY,
    FIELD_CONTAMINATION, FIELD_RAINFALL, FIELD_TEMPERATURE, FIELD_TURBIDITY, FeatureVector,
    MAX_READING_MAGNITUDE, RiskAssessment, RiskError,
};

/// Caller-supplied readings keyed by field name, as decoded from a JSON body.
pub type RawInput = Map<String, Value>;

// ---------------------------------------------------------------------------
// Input normalization
// ---------------------------------------------------------------------------

/// Validates `raw` and fills in defaults for absent fields.
///
/// Accepted values are JSON numbers and strings holding a number (surrounding
/// whitespace allowed). `null`, booleans, arrays, objects, unparseable
/// strings, non-finite values, and values whose magnitude exceeds
/// `MAX_READING_MAGNITUDE` are `InvalidInput`. Unknown keys are ignored.
pub fn normalize_input(raw: &RawInput) -> Result<FeatureVector, RiskError> {
    Ok(FeatureVector {
        temperature: field_or_default(raw, FIELD_TEMPERATURE, DEFAULT_TEMPERATURE)?,
        rainfall: field_or_default(raw, FIELD_RAINFALL, DEFAULT_RAINFALL)?,
        turbidity: field_or_default(raw, FIELD_TURBIDITY, DEFAULT_TURBIDITY)?,
        contamination: field_or_default(raw, FIELD_CONTAMINATION, DEFAULT_CONTAMINATION)?,
    })
}

fn field_or_default(raw: &RawInput, field: &str, default: f64) -> Result<f64, RiskError> {
    match raw.get(field) {
        None => Ok(default),
        Some(value) => parse_value(field, value),
    }
}

fn parse_value(field: &str, value: &Value) -> Result<f64, RiskError> {
    let invalid = |reason: String| RiskError::InvalidInput {
        field: field.to_string(),
        reason,
    };

    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as a real number", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{}' is not a number", s)))?,
        other => return Err(invalid(format!("expected a number, got {}", other))),
    };

    if !number.is_finite() {
        return Err(invalid(format!("{} is not a finite number", number)));
    }
    if number.abs() > MAX_READING_MAGNITUDE {
        return Err(invalid(format!(
            "{} is outside the accepted range of ±{:e}",
            number, MAX_READING_MAGNITUDE
        )));
    }
    Ok(number)
}

// ---------------------------------------------------------------------------
// Score post-processing
// ---------------------------------------------------------------------------

/// Truncates a raw model output to [0, 1].
pub fn clamp_score(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

/// Rounds a score to 3 decimal places for reporting.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct Scorer {
    loader: Arc<ModelLoader>,
    dispatcher: Arc<dyn AlertDispatcher>,
    alerts_enabled: bool,
}

impl Scorer {
    pub fn new(loader: Arc<ModelLoader>, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        Self {
            loader,
            dispatcher,
            alerts_enabled: true,
        }
    }

    /// When disabled, HIGH scores are still reported but never dispatched.
    pub fn with_alerts_enabled(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    /// Scores a raw field map.
    ///
    /// # Errors
    /// - `InvalidInput` when a supplied field is not a usable number.
    /// - `ModelUnavailable` when no model exists and none can be trained.
    /// - Artifact and dataset errors from the loader, unchanged.
    pub fn score(&self, raw: &RawInput) -> Result<RiskAssessment, RiskError> {
        let features = normalize_input(raw)?;
        self.score_features(features)
    }

    /// Scores an already-validated reading.
    pub fn score_features(&self, features: FeatureVector) -> Result<RiskAssessment, RiskError> {
        let model = self.loader.get_model()?;

        let raw = model.predict(&features);
        if raw.is_nan() {
            logging::error(
                Component::Scorer,
                &format!("Model output is undefined for {:?}", features),
            );
            return Err(RiskError::Prediction(format!(
                "model output is undefined for {:?}",
                features
            )));
        }

        let score = clamp_score(raw);
        let level = classify_risk(score);
        let alert_fired = is_alert_candidate(level) && self.dispatch_alert(score);

        logging::debug(
            Component::Scorer,
            &format!("Scored {:?}: raw {:.4}, clamped {:.4}, {}", features, raw, score, level),
        );

        Ok(RiskAssessment {
            score: round_score(score),
            level,
            alert_fired,
            inputs: features,
        })
    }

    /// Returns true only when the dispatcher reports a successful send.
    fn dispatch_alert(&self, score: f64) -> bool {
        if !self.alerts_enabled {
            logging::info(
                Component::Alert,
                &format!("High risk score {:.3}; alerting is disabled", score),
            );
            return false;
        }

        logging::warn(
            Component::Scorer,
            &format!("High risk score {:.3}; dispatching alert", score),
        );
        let result = self.dispatcher.send(score);
        logging::log_dispatch_result(score, &result);
        result.is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::dispatch::DispatchError;
    use crate::analysis::regression::LinearModel;
    use crate::artifacts::ArtifactStore;
    use crate::ingest::dataset::CsvDataset;
    use crate::model::{ModelMetadata, RiskLevel};
    use crate::trainer::Trainer;
    use chrono::Utc;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    struct RecordingDispatcher {
        calls: Mutex<Vec<f64>>,
        succeed: bool,
    }

    impl RecordingDispatcher {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                succeed,
            })
        }

        fn calls(&self) -> Vec<f64> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AlertDispatcher for RecordingDispatcher {
        fn send(&self, risk_score: f64) -> Result<String, DispatchError> {
            self.calls.lock().unwrap().push(risk_score);
            if self.succeed {
                Ok("SM0001".to_string())
            } else {
                Err(DispatchError::HttpError(500))
            }
        }
    }

    fn raw(value: Value) -> RawInput {
        match value {
            Value::Object(map) => map,
            other => panic!("test input must be an object, got {}", other),
        }
    }

    /// A scorer whose persisted model is `intercept + Σ coefficients·x`.
    fn scorer_with_model(
        dir: &Path,
        model: LinearModel,
        dispatcher: Arc<RecordingDispatcher>,
    ) -> Scorer {
        let store = Arc::new(ArtifactStore::new(
            dir.join("model.json"),
            dir.join("model_meta.json"),
        ));
        let metadata = ModelMetadata {
            trained_at: Utc::now(),
            samples: 1,
        };
        store.replace(&model, &metadata).expect("persist model");
        let trainer = Arc::new(Trainer::new(CsvDataset::new(dir.join("absent.csv")), store));
        Scorer::new(Arc::new(ModelLoader::new(trainer)), dispatcher)
    }

    fn constant_model(value: f64) -> LinearModel {
        LinearModel {
            intercept: value,
            coefficients: [0.0; 4],
        }
    }

    // --- Normalization ------------------------------------------------------

    #[test]
    fn test_empty_input_uses_defaults() {
        assert_eq!(normalize_input(&RawInput::new()), Ok(FeatureVector::default()));
    }

    #[test]
    fn test_supplied_fields_override_defaults_individually() {
        let fv = normalize_input(&raw(json!({"rainfall": 120, "turbidity": 7.5}))).unwrap();
        assert_eq!(fv.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(fv.rainfall, 120.0);
        assert_eq!(fv.turbidity, 7.5);
        assert_eq!(fv.contamination, DEFAULT_CONTAMINATION);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let fv = normalize_input(&raw(json!({"temperature": " 31.5 ", "contamination": "250"})))
            .unwrap();
        assert_eq!(fv.temperature, 31.5);
        assert_eq!(fv.contamination, 250.0);
    }

    #[test]
    fn test_non_numeric_string_is_invalid_input() {
        match normalize_input(&raw(json!({"temperature": "not-a-number"}))) {
            Err(RiskError::InvalidInput { field, .. }) => assert_eq!(field, "temperature"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_null_bool_and_array_are_invalid_input() {
        for value in [json!(null), json!(true), json!([1, 2]), json!({"v": 1})] {
            let input = raw(json!({ "rainfall": value }));
            assert!(
                matches!(normalize_input(&input), Err(RiskError::InvalidInput { .. })),
                "rainfall={} should be rejected",
                input["rainfall"]
            );
        }
    }

    #[test]
    fn test_non_finite_strings_are_invalid_input() {
        for text in ["NaN", "inf", "-infinity"] {
            let input = raw(json!({ "turbidity": text }));
            assert!(matches!(
                normalize_input(&input),
                Err(RiskError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_out_of_range_magnitude_names_the_field() {
        let input = raw(json!({"temperature": 1e308, "rainfall": -1e308}));
        match normalize_input(&input) {
            Err(RiskError::InvalidInput { field, .. }) => assert_eq!(field, "temperature"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        let fv = normalize_input(&raw(json!({"rainfall": -MAX_READING_MAGNITUDE})))
            .expect("bound itself is accepted");
        assert_eq!(fv.rainfall, -MAX_READING_MAGNITUDE);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let fv = normalize_input(&raw(json!({"station": "A-12", "ph": 7.1}))).unwrap();
        assert_eq!(fv, FeatureVector::default());
    }

    // --- Post-processing ----------------------------------------------------

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_score(-0.35), 0.0);
        assert_eq!(clamp_score(1.8), 1.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn test_round_to_three_decimals() {
        assert_eq!(round_score(0.123456), 0.123);
        assert_eq!(round_score(0.7006), 0.701);
        assert_eq!(round_score(1.0), 1.0);
    }

    // --- Scoring ------------------------------------------------------------

    #[test]
    fn test_negative_model_output_is_clamped_to_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let scorer = scorer_with_model(dir.path(), constant_model(-2.5), dispatcher.clone());

        let assessment = scorer.score(&RawInput::new()).expect("score");
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(!assessment.alert_fired);
        assert!(dispatcher.calls().is_empty());
    }

    #[test]
    fn test_high_score_dispatches_once_and_reports_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let scorer = scorer_with_model(dir.path(), constant_model(3.0), dispatcher.clone());

        let assessment = scorer.score(&RawInput::new()).expect("score");
        assert_eq!(assessment.score, 1.0);
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.alert_fired);
        assert_eq!(dispatcher.calls(), vec![1.0]);
    }

    #[test]
    fn test_dispatch_failure_only_clears_alert_fired() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(false);
        let scorer = scorer_with_model(dir.path(), constant_model(0.85), dispatcher.clone());

        let assessment = scorer.score(&RawInput::new()).expect("dispatch failure is not an error");
        assert_eq!(assessment.score, 0.85);
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(!assessment.alert_fired);
        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[test]
    fn test_disabled_alerts_never_dispatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let scorer = scorer_with_model(dir.path(), constant_model(0.95), dispatcher.clone())
            .with_alerts_enabled(false);

        let assessment = scorer.score(&RawInput::new()).expect("score");
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(!assessment.alert_fired);
        assert!(dispatcher.calls().is_empty());
    }

    #[test]
    fn test_dispatcher_receives_unrounded_score() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let scorer = scorer_with_model(dir.path(), constant_model(0.71234), dispatcher.clone());

        let assessment = scorer.score(&RawInput::new()).expect("score");
        assert_eq!(assessment.score, 0.712);
        assert_eq!(dispatcher.calls(), vec![0.71234]);
    }

    #[test]
    fn test_rounding_does_not_change_level() {
        // 0.70004 rounds to 0.7 for reporting but is still above the threshold.
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let scorer = scorer_with_model(dir.path(), constant_model(0.70004), dispatcher.clone());

        let assessment = scorer.score(&RawInput::new()).expect("score");
        assert_eq!(assessment.score, 0.7);
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.alert_fired);
    }

    #[test]
    fn test_undefined_model_output_is_internal_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dispatcher = RecordingDispatcher::new(true);
        let model = LinearModel {
            intercept: 0.0,
            coefficients: [1e300, 1e300, 0.0, 0.0],
        };
        let scorer = scorer_with_model(dir.path(), model, dispatcher.clone());

        let err = scorer
            .score(&raw(json!({"temperature": 1e12, "rainfall": -1e12})))
            .expect_err("inf - inf has no score");
        assert!(matches!(err, RiskError::Prediction(_)));
        assert_eq!(err.class(), crate::model::ErrorClass::Internal);
        assert!(dispatcher.calls().is_empty());
    }

    #[test]
    fn test_huge_readings_on_a_trained_model_stay_in_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = LinearModel {
            intercept: 0.0,
            coefficients: [10.0, 10.0, 0.0, 0.0],
        };
        let scorer = scorer_with_model(dir.path(), model, RecordingDispatcher::new(true));

        let err = scorer
            .score(&raw(json!({"temperature": 1e308, "rainfall": -1e308})))
            .expect_err("magnitude is rejected");
        assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "temperature"));

        let assessment = scorer
            .score(&raw(json!({"temperature": 1e12, "rainfall": -1e12})))
            .expect("bounded readings always score");
        assert!((0.0..=1.0).contains(&assessment.score));
    }

    #[test]
    fn test_invalid_input_is_reported_before_loading_a_model() {
        // No model and no dataset: a valid request would be ModelUnavailable.
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(ArtifactStore::new(
            dir.path().join("model.json"),
            dir.path().join("model_meta.json"),
        ));
        let trainer = Arc::new(Trainer::new(
            CsvDataset::new(dir.path().join("absent.csv")),
            store,
        ));
        let scorer = Scorer::new(
            Arc::new(ModelLoader::new(trainer)),
            RecordingDispatcher::new(true),
        );

        assert!(matches!(
            scorer.score(&raw(json!({"rainfall": "heavy"}))),
            Err(RiskError::InvalidInput { .. })
        ));
        assert!(matches!(
            scorer.score(&RawInput::new()),
            Err(RiskError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_assessment_echoes_normalized_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scorer = scorer_with_model(
            dir.path(),
            constant_model(0.2),
            RecordingDispatcher::new(true),
        );
        let assessment = scorer.score(&raw(json!({"temperature": "30"}))).expect("score");
        assert_eq!(assessment.inputs.temperature, 30.0);
        assert_eq!(assessment.inputs.rainfall, DEFAULT_RAINFALL);
        assert_eq!(assessment.alert_status(), "NORMAL");
    }
}
