/// Service configuration.
///
/// File locations and logging/alerting switches come from a TOML file; SMS
/// credentials come from the environment (optionally via a `.env` file) so
/// they never live in the config file.
///
/// ```toml
/// [data]
/// dataset_path = "data/water_data.csv"
///
/// [artifacts]
/// model_path = "model.json"
/// metadata_path = "model_meta.json"
///
/// [logging]
/// level = "info"
/// file = "waterrisk.log"
/// timestamps = true
///
/// [alerts]
/// enabled = true
/// sms_enabled = true
/// ```
///
/// Every key is optional; missing keys fall back to the defaults above
/// (no log file by default).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::RiskError;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "WATERRISK_CONFIG";

/// Config file used when `WATERRISK_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "waterrisk.toml";

// ---------------------------------------------------------------------------
// File-backed configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub data: DataConfig,
    pub artifacts: ArtifactConfig,
    pub logging: LoggingConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub dataset_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/water_data.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            metadata_path: PathBuf::from("model_meta.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, RiskError> {
        self.level.parse().map_err(RiskError::Config)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    /// Master switch: when false no alert is ever dispatched.
    pub enabled: bool,
    /// Deliver alerts by SMS when credentials are present.
    pub sms_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sms_enabled: true,
        }
    }
}

impl ServiceConfig {
    /// Parses a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, RiskError> {
        let config: ServiceConfig =
            toml::from_str(text).map_err(|e| RiskError::Config(e.to_string()))?;
        config.logging.min_level()?;
        Ok(config)
    }

    /// Loads a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, RiskError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| RiskError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&text).map_err(|e| match e {
            RiskError::Config(msg) => RiskError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Loads the config named by `WATERRISK_CONFIG`, or `waterrisk.toml`.
    pub fn from_env() -> Result<Self, RiskError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }
}

// ---------------------------------------------------------------------------
// SMS credentials
// ---------------------------------------------------------------------------

pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_FROM_NUMBER: &str = "TWILIO_PHONE_NUMBER";
pub const ENV_TO_NUMBER: &str = "MY_MOBILE_NUMBER";

/// Credentials and numbers for SMS alert delivery.
#[derive(Clone, PartialEq)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

impl SmsConfig {
    /// Reads credentials from the process environment after loading `.env`.
    ///
    /// Returns the names of the missing variables if any are unset or empty.
    pub fn from_env() -> Result<Self, Vec<&'static str>> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |key: &'static str| match lookup(key) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                missing.push(key);
                String::new()
            }
        };

        let config = SmsConfig {
            account_sid: get(ENV_ACCOUNT_SID),
            auth_token: get(ENV_AUTH_TOKEN),
            from_number: get(ENV_FROM_NUMBER),
            to_number: get(ENV_TO_NUMBER),
        };

        if missing.is_empty() {
            Ok(config)
        } else {
            Err(missing)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
