//! Risk level classification.
//!
//! Both thresholds are strict lower bounds: a score exactly on a threshold
//! belongs to the level below it.

use crate::model::RiskLevel;

/// Scores strictly above this are HIGH and trigger an alert.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Scores strictly above this (and not HIGH) are MODERATE.
pub const MODERATE_RISK_THRESHOLD: f64 = 0.4;

/// Classifies a clamped risk score.
///
///   score > 0.7        →  High
///   0.4 < score ≤ 0.7  →  Moderate
///   score ≤ 0.4        →  Low
pub fn classify_risk(score: f64) -> RiskLevel {
    if score > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score > MODERATE_RISK_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Whether a score at this level should be sent to the alert dispatcher.
pub fn is_alert_candidate(level: RiskLevel) -> bool {
    level == RiskLevel::High
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
