//! Command-line entry point.
//!
//! ```text
//! waterrisk_service status
//! waterrisk_service warm-up
//! waterrisk_service train
//! waterrisk_service score [temperature=25] [rainfall=50] [turbidity=5] [contamination=100]
//! waterrisk_service score '{"temperature": 31, "rainfall": 140}'
//! ```
//!
//! Exit codes: 0 success, 1 internal failure, 2 invalid input, 3 no model
//! available yet.

use std::process::ExitCode;

use serde_json::{Value, json};

use waterrisk_service::config::ServiceConfig;
use waterrisk_service::logging::{self, Component};
use waterrisk_service::model::{ErrorClass, RiskError};
use waterrisk_service::scorer::RawInput;
use waterrisk_service::service::RiskService;

const USAGE: &str = "usage: waterrisk_service <status | warm-up | train | score [field=value ...] | score '<json>'>";

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    // Level was validated when the config was parsed.
    let min_level = config.logging.min_level().unwrap_or(logging::LogLevel::Info);
    logging::init_logger(
        min_level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    let service = RiskService::from_config(&config);
    let outcome = match command.as_str() {
        "status" => status(&service),
        "warm-up" => warm_up(&service),
        "train" => train(&service),
        "score" => parse_score_args(rest).and_then(|raw| score(&service, &raw)),
        other => {
            eprintln!("unknown command '{}'\n{}", other, USAGE);
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(Component::System, &e.to_string());
            println!("{}", json!({ "error": e.to_string(), "status": e.status_code() }));
            match e.class() {
                ErrorClass::InvalidInput => ExitCode::from(2),
                ErrorClass::NotReady => ExitCode::from(3),
                ErrorClass::Internal => ExitCode::from(1),
            }
        }
    }
}

fn status(service: &RiskService) -> Result<Value, RiskError> {
    Ok(match service.model_status()? {
        Some(meta) => json!({ "status": "ok", "model": meta }),
        None => json!({ "status": "ok", "model": null }),
    })
}

fn warm_up(service: &RiskService) -> Result<Value, RiskError> {
    let meta = service.warm_up()?;
    Ok(json!({ "status": "ready", "model": meta }))
}

fn train(service: &RiskService) -> Result<Value, RiskError> {
    let meta = service.train()?;
    Ok(json!({ "message": "Model trained successfully", "meta": meta }))
}

fn score(service: &RiskService, raw: &RawInput) -> Result<Value, RiskError> {
    let assessment = service.score(raw)?;
    Ok(json!({
        "prediction": assessment.score,
        "risk_level": assessment.level,
        "alert": assessment.alert_status(),
        "alert_fired": assessment.alert_fired,
        "inputs": assessment.inputs,
    }))
}

/// Accepts either one JSON object or any number of `field=value` pairs.
fn parse_score_args(args: &[String]) -> Result<RawInput, RiskError> {
    if let [single] = args {
        if single.trim_start().starts_with('{') {
            return match serde_json::from_str::<Value>(single) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) | Err(_) => Err(RiskError::InvalidInput {
                    field: "body".to_string(),
                    reason: "expected a JSON object".to_string(),
                }),
            };
        }
    }

    let mut raw = RawInput::new();
    for arg in args {
        let Some((field, value)) = arg.split_once('=') else {
            return Err(RiskError::InvalidInput {
                field: arg.clone(),
                reason: "expected field=value".to_string(),
            });
        };
        raw.insert(field.trim().to_string(), Value::String(value.to_string()));
    }
    Ok(raw)
}
