/// Core data types for the water disease risk service.
///
/// This module defines the shared domain model imported by all other modules:
/// feature names and defaults, training rows, model metadata, risk levels,
/// and the crate-wide error type. It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feature names and defaults
// ---------------------------------------------------------------------------

pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_RAINFALL: &str = "rainfall";
pub const FIELD_TURBIDITY: &str = "turbidity";
pub const FIELD_CONTAMINATION: &str = "contamination";

/// Dataset column holding the supervised label.
pub const FIELD_DISEASE_RISK: &str = "disease_risk";

/// Model input features, in the column order the regression is fitted on.
pub const FEATURE_FIELDS: [&str; 4] = [
    FIELD_TEMPERATURE,
    FIELD_RAINFALL,
    FIELD_TURBIDITY,
    FIELD_CONTAMINATION,
];

pub const DEFAULT_TEMPERATURE: f64 = 25.0;
pub const DEFAULT_RAINFALL: f64 = 50.0;
pub const DEFAULT_TURBIDITY: f64 = 5.0;
pub const DEFAULT_CONTAMINATION: f64 = 100.0;

/// Largest absolute value accepted for any caller-supplied reading.
pub const MAX_READING_MAGNITUDE: f64 = 1e12;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One historical observation with its labelled disease risk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingRow {
    pub temperature: f64,
    pub rainfall: f64,
    pub turbidity: f64,
    pub contamination: f64,
    pub disease_risk: f64,
}

impl TrainingRow {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            temperature: self.temperature,
            rainfall: self.rainfall,
            turbidity: self.turbidity,
            contamination: self.contamination,
        }
    }
}

/// A single reading to be scored. Scoped to one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub temperature: f64,
    pub rainfall: f64,
    pub turbidity: f64,
    pub contamination: f64,
}

impl FeatureVector {
    /// Features in `FEATURE_FIELDS` order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.temperature, self.rainfall, self.turbidity, self.contamination]
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            rainfall: DEFAULT_RAINFALL,
            turbidity: DEFAULT_TURBIDITY,
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

// ---------------------------------------------------------------------------
// Model metadata
// ---------------------------------------------------------------------------

/// Record written alongside every persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub samples: usize,
}

// ---------------------------------------------------------------------------
// Risk assessment
// ---------------------------------------------------------------------------

/// Risk levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Moderate => write!(f, "MODERATE"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome of scoring one reading.
///
/// `score` is the clamped model output rounded to 3 decimal places; `level`
/// was decided on the unrounded value. `alert_fired` is only true when the
/// dispatcher reported a successful send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub alert_fired: bool,
    pub inputs: FeatureVector,
}

impl RiskAssessment {
    /// Human-facing alert label reported next to the score.
    pub fn alert_status(&self) -> &'static str {
        match self.level {
            RiskLevel::High => "HIGH RISK",
            _ => "NORMAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Coarse outcome class for an error, used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something unusable (4xx).
    InvalidInput,
    /// No model exists yet and none can be trained (5xx, "not ready").
    NotReady,
    /// Anything else.
    Internal,
}

/// Errors that can arise while training, loading, or scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskError {
    /// A caller-supplied feature value could not be used as a real number.
    InvalidInput { field: String, reason: String },
    /// The dataset is missing or has no rows.
    TrainingUnavailable(String),
    /// No persisted model exists and none could be trained.
    ModelUnavailable(String),
    /// The dataset exists but is malformed (missing column, non-numeric cell).
    Dataset(String),
    /// Reading or writing a model artifact failed.
    Artifact(String),
    /// Model and metadata files are not a matching pair.
    InconsistentArtifacts(String),
    /// The configuration file could not be read or parsed.
    Config(String),
    /// The persisted model produced no usable output for a valid reading.
    Prediction(String),
}

impl RiskError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RiskError::InvalidInput { .. } => ErrorClass::InvalidInput,
            RiskError::TrainingUnavailable(_) | RiskError::ModelUnavailable(_) => {
                ErrorClass::NotReady
            }
            _ => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::InvalidInput => 400,
            ErrorClass::NotReady => 503,
            ErrorClass::Internal => 500,
        }
    }
}

impl std::fmt::Display for RiskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskError::InvalidInput { field, reason } => {
                write!(f, "Invalid input for '{}': {}", field, reason)
            }
            RiskError::TrainingUnavailable(msg) => write!(f, "Training unavailable: {}", msg),
            RiskError::ModelUnavailable(msg) => write!(f, "Model unavailable: {}", msg),
            RiskError::Dataset(msg) => write!(f, "Dataset error: {}", msg),
            RiskError::Artifact(msg) => write!(f, "Artifact error: {}", msg),
            RiskError::InconsistentArtifacts(msg) => {
                write!(f, "Inconsistent model artifacts: {}", msg)
            }
            RiskError::Config(msg) => write!(f, "Config error: {}", msg),
            RiskError::Prediction(msg) => write!(f, "Prediction error: {}", msg),
        }
    }
}

impl std::error::Error for RiskError {}
