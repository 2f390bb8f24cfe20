//! Risk classification and alert delivery.
//!
//! Submodules:
//! - `thresholds`: maps a clamped score to LOW / MODERATE / HIGH.
//! - `dispatch`: the boundary to whatever delivers high-risk alerts.

pub mod dispatch;
pub mod thresholds;
