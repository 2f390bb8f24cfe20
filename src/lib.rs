//! Water disease risk service.
//!
//! Scores water-quality readings (temperature, rainfall, turbidity,
//! contamination) against a linear model trained on historical data, and
//! raises an alert when the risk is high.
//!
//! Data flow:
//!
//! ```text
//! dataset (CSV) → trainer → artifact store → loader → scorer → alert dispatcher
//! ```
//!
//! `service::RiskService` is the entry point for outer layers.

pub mod alert;
pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod model;
pub mod scorer;
pub mod service;
pub mod trainer;
