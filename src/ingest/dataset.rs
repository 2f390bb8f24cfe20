/// Dataset Store: historical readings with their labelled disease risk.
///
/// The dataset is a CSV file whose header names the columns
/// `temperature, rainfall, turbidity, contamination, disease_risk`
/// (extra columns and column order do not matter). It is read wholesale on
/// every training run and never written by this service.
///
/// A missing file or a file with a header but no rows is reported as
/// `Ok(None)` so callers can treat "nothing to train on yet" as a normal
/// state. Malformed content is an error: rows are never silently skipped.

use std::path::{Path, PathBuf};

use crate::model::{FIELD_DISEASE_RISK, FEATURE_FIELDS, RiskError, TrainingRow};

#[derive(Debug, Clone)]
pub struct CsvDataset {
    path: PathBuf,
}

impl CsvDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every row of the dataset.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds no rows.
    pub fn load(&self) -> Result<Option<Vec<TrainingRow>>, RiskError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| {
                RiskError::Dataset(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        let headers = reader
            .headers()
            .map_err(|e| RiskError::Dataset(format!("failed to read header: {}", e)))?
            .clone();

        for column in FEATURE_FIELDS.iter().chain(std::iter::once(&FIELD_DISEASE_RISK)) {
            if !headers.iter().any(|h| h == *column) {
                // A header-only or fully empty file has no usable columns either.
                if headers.is_empty() {
                    return Ok(None);
                }
                return Err(RiskError::Dataset(format!(
                    "missing column '{}' (available: {:?})",
                    column,
                    headers.iter().collect::<Vec<_>>()
                )));
            }
        }

        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<TrainingRow>().enumerate() {
            // Line 1 is the header.
            let row = record.map_err(|e| {
                RiskError::Dataset(format!("row at line {} is invalid: {}", i + 2, e))
            })?;
            let values = [
                row.temperature,
                row.rainfall,
                row.turbidity,
                row.contamination,
                row.disease_risk,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(RiskError::Dataset(format!(
                    "row at line {} contains a non-finite value",
                    i + 2
                )));
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
