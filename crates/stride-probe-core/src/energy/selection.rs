//! Projection of the feature frame onto the model's input columns.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::features::FeatureFrame;
use super::log::Field;
use crate::error::{EvaluationError, Result, ValidationError};

/// Candidate model inputs, in matrix column order.
pub const FEATURE_COLUMNS: [&str; 12] = [
    "mood_score",
    "stress_level",
    "hours_slept",
    "energy_level_lag1",
    "energy_level_lag7",
    "mood_score_lag1",
    "stress_level_lag1",
    "energy_level_rolling7",
    "mood_score_rolling7",
    "stress_level_rolling7",
    "day_sin",
    "day_cos",
];

/// Fewer surviving candidates than this and the probe gives up.
pub const MIN_FEATURES: usize = 3;

/// Row-major feature matrix with its integer class target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub columns: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<i64>,
}

impl FeatureSet {
    pub fn n_samples(&self) -> usize {
        self.x.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Sorted distinct target classes.
    pub fn classes(&self) -> Vec<i64> {
        let mut classes = self.y.clone();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}

/// Build `X` from the candidate columns present in `frame`, and `y` from the
/// energy level rounded to the nearest integer (ties to even).
///
/// # Errors
///
/// Returns [`EvaluationError::InsufficientFeatures`] when fewer than
/// [`MIN_FEATURES`] candidates are present, or a validation error if the
/// target column is missing.
pub fn select_features(frame: &FeatureFrame) -> Result<FeatureSet> {
    let available: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .filter(|name| frame.has_column(name))
        .collect();

    if available.len() < MIN_FEATURES {
        warn!(?available, "too few feature columns survived selection");
        return Err(EvaluationError::InsufficientFeatures {
            available: available.iter().map(|s| s.to_string()).collect(),
            required: MIN_FEATURES,
        }
        .into());
    }

    let target_name = Field::EnergyLevel.column();
    let target = frame.column(target_name).ok_or_else(|| ValidationError::InvalidValue {
        field: target_name.to_string(),
        message: "target column missing from feature frame".to_string(),
    })?;

    let columns: Vec<Vec<f64>> = available
        .iter()
        .filter_map(|name| frame.column(name))
        .collect();
    let x: Vec<Vec<f64>> = (0..frame.len())
        .map(|row| columns.iter().map(|col| col[row]).collect())
        .collect();
    let y: Vec<i64> = target.iter().map(|v| v.round_ties_even() as i64).collect();

    let skipped: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .filter(|name| !available.contains(name))
        .collect();
    if !skipped.is_empty() {
        debug!(?skipped, "feature candidates absent from frame");
    }

    Ok(FeatureSet {
        columns: available.iter().map(|s| s.to_string()).collect(),
        x,
        y,
    })
}
