//! Ordinary least squares over the four water-quality features.
//!
//! A single global linear fit with intercept: no scaling, no regularization.
//! The fit works on mean-centred features, solving the 4x4 normal equations
//!
//! ```text
//! (Xc^T Xc) β = Xc^T yc,    intercept = ȳ - β · x̄
//! ```
//!
//! with Gauss-Jordan elimination and partial pivoting. A feature that is
//! constant or a linear combination of the others carries no extra
//! information; its coefficient is fixed at zero and the remaining system is
//! still solved exactly, so such datasets yield a least-squares fit instead
//! of an error.
//!
//! This is a basic solution, not the minimum-norm one an SVD-based `lstsq`
//! returns. Both reproduce the training rows equally well, but for
//! rank-deficient data they can disagree on readings outside the span of
//! the training features: here the weight of a redundant column is carried
//! entirely by the earlier column it duplicates, where `lstsq` would spread
//! it across both.

use serde::{Deserialize, Serialize};

use crate::model::{FeatureVector, RiskError, TrainingRow};

const N_FEATURES: usize = 4;

/// A pivot smaller than this fraction of its column's variance is treated as
/// zero (the column is explained by earlier ones).
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-9;

/// Fitted linear model: `intercept + Σ coefficients[i] * features[i]`,
/// features in `FEATURE_FIELDS` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; N_FEATURES],
}

impl LinearModel {
    /// Fits the model to `rows`.
    ///
    /// # Errors
    /// `TrainingUnavailable` when `rows` is empty.
    pub fn fit(rows: &[TrainingRow]) -> Result<Self, RiskError> {
        if rows.is_empty() {
            return Err(RiskError::TrainingUnavailable(
                "cannot fit a model with zero samples".to_string(),
            ));
        }

        let n = rows.len() as f64;
        let mut mean_x = [0.0; N_FEATURES];
        let mut mean_y = 0.0;
        for row in rows {
            let x = row.features().as_array();
            for j in 0..N_FEATURES {
                mean_x[j] += x[j];
            }
            mean_y += row.disease_risk;
        }
        for m in mean_x.iter_mut() {
            *m /= n;
        }
        mean_y /= n;

        let mut xtx = [[0.0; N_FEATURES]; N_FEATURES];
        let mut xty = [0.0; N_FEATURES];
        for row in rows {
            let raw = row.features().as_array();
            let mut x = [0.0; N_FEATURES];
            for j in 0..N_FEATURES {
                x[j] = raw[j] - mean_x[j];
            }
            let y = row.disease_risk - mean_y;
            for i in 0..N_FEATURES {
                xty[i] += x[i] * y;
                for j in 0..N_FEATURES {
                    xtx[i][j] += x[i] * x[j];
                }
            }
        }

        let coefficients = solve_normal_equations(xtx, xty);
        let intercept = mean_y - dot(&coefficients, &mean_x);

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    /// Raw (unclamped) model output for one reading.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.intercept + dot(&self.coefficients, &features.as_array())
    }
}

fn dot(a: &[f64; N_FEATURES], b: &[f64; N_FEATURES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Solves `a · β = b` for a symmetric positive semi-definite `a`.
///
/// Columns without a usable pivot are free variables and are set to zero.
fn solve_normal_equations(
    mut a: [[f64; N_FEATURES]; N_FEATURES],
    mut b: [f64; N_FEATURES],
) -> [f64; N_FEATURES] {
    let column_scale: [f64; N_FEATURES] = std::array::from_fn(|j| a[j][j].abs());
    let mut pivot_row_for_column: [Option<usize>; N_FEATURES] = [None; N_FEATURES];
    let mut rank = 0;

    for col in 0..N_FEATURES {
        if rank == N_FEATURES {
            break;
        }

        let mut best = rank;
        for r in rank + 1..N_FEATURES {
            if a[r][col].abs() > a[best][col].abs() {
                best = r;
            }
        }

        let pivot = a[best][col];
        if pivot == 0.0 || pivot.abs() <= column_scale[col] * RELATIVE_PIVOT_TOLERANCE {
            continue;
        }

        a.swap(rank, best);
        b.swap(rank, best);

        for k in 0..N_FEATURES {
            a[rank][k] /= pivot;
        }
        b[rank] /= pivot;

        for r in 0..N_FEATURES {
            if r == rank {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..N_FEATURES {
                a[r][k] -= factor * a[rank][k];
            }
            b[r] -= factor * b[rank];
        }

        pivot_row_for_column[col] = Some(rank);
        rank += 1;
    }

    let mut beta = [0.0; N_FEATURES];
    for (col, pivot_row) in pivot_row_for_column.iter().enumerate() {
        if let Some(r) = pivot_row {
            beta[col] = b[*r];
        }
    }
    beta
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
