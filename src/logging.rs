/// Structured logging for the water disease risk service
///
/// Provides context-rich logging with a component tag, timestamps,
/// and severity levels. Supports both console output and file-based
/// logging for long-running deployments.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Dataset,
    Trainer,
    Loader,
    Scorer,
    Alert,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Dataset => write!(f, "DATA"),
            Component::Trainer => write!(f, "TRAIN"),
            Component::Loader => write!(f, "LOAD"),
            Component::Scorer => write!(f, "SCORE"),
            Component::Alert => write!(f, "ALERT"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        let mut slot = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(logger);
    }

    fn format_entry(level: LogLevel, component: Component, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!("{} {} {}: {}", timestamp, level, component, message)
    }

    fn log(&self, level: LogLevel, component: Component, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}: {}", component, message),
                LogLevel::Warning => eprintln!("   ⚠ {}: {}", component, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, component: Component, message: &str) {
    // Logging is best-effort; a poisoned lock still holds a usable logger.
    let guard = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(logger) = guard.as_ref() {
        logger.log(level, component, message);
    }
}

/// Log a general informational message
pub fn info(component: Component, message: &str) {
    emit(LogLevel::Info, component, message);
}

/// Log a warning message
pub fn warn(component: Component, message: &str) {
    emit(LogLevel::Warning, component, message);
}

/// Log an error message
pub fn error(component: Component, message: &str) {
    emit(LogLevel::Error, component, message);
}

/// Log a debug message
pub fn debug(component: Component, message: &str) {
    emit(LogLevel::Debug, component, message);
}

// ---------------------------------------------------------------------------
// Structured helpers
// ---------------------------------------------------------------------------

/// Log the outcome of a training run.
pub fn log_training_summary(samples: usize, dataset: &str) {
    info(
        Component::Trainer,
        &format!("Model trained successfully on {} samples from {}", samples, dataset),
    );
}

/// Log an alert dispatch result.
pub fn log_dispatch_result(risk_score: f64, result: &Result<String, impl fmt::Display>) {
    match result {
        Ok(receipt) => info(
            Component::Alert,
            &format!("Alert sent for risk score {:.3} (receipt {})", risk_score, receipt),
        ),
        Err(e) => error(
            Component::Alert,
            &format!("Alert dispatch failed for risk score {:.3}: {}", risk_score, e),
        ),
    }
}
