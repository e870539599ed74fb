//! TOML-based probe configuration.
//!
//! Holds the knobs of a probe run:
//! - Data source location and synthetic fallback shape
//! - Evaluation thresholds, split sizes and seeds
//! - Classifier selection
//!
//! Configuration is read from `STRIDE_PROBE_CONFIG` when set, otherwise from
//! `<config_dir>/stride/probe.toml` if it exists. Environment variables
//! override file values. Nothing is ever written back.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::config_dir;
use crate::error::ConfigError;
use crate::model::ClassifierKind;

/// Environment variable selecting the store location.
pub const DB_PATH_ENV: &str = "STRIDE_DB_PATH";
/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "STRIDE_PROBE_CONFIG";

/// Data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Number of daily records generated when falling back to synthetic data.
    #[serde(default = "default_synthetic_samples")]
    pub synthetic_samples: usize,
    /// First day of the synthetic series.
    #[serde(default = "default_synthetic_start")]
    pub synthetic_start: NaiveDate,
    /// Trailing window for academic events, in days.
    #[serde(default = "default_event_window_days")]
    pub event_window_days: i64,
}

/// Evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Seed shared by the synthetic generator, the holdout split and the mock classifier.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub classifier: ClassifierKind,
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

/// Probe configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

// Default functions
fn default_db_path() -> PathBuf {
    PathBuf::from("./data/stride.db")
}
fn default_synthetic_samples() -> usize {
    200
}
fn default_synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}
fn default_event_window_days() -> i64 {
    30
}
fn default_min_samples() -> usize {
    20
}
fn default_seed() -> u64 {
    42
}
fn default_test_fraction() -> f64 {
    0.2
}
fn default_cv_folds() -> usize {
    5
}
fn default_neighbors() -> usize {
    5
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            synthetic_samples: default_synthetic_samples(),
            synthetic_start: default_synthetic_start(),
            event_window_days: default_event_window_days(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            cv_folds: default_cv_folds(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            neighbors: default_neighbors(),
        }
    }
}

impl Config {
    /// Default config file location, `<config_dir>/stride/probe.toml`.
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("probe.toml"))
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file is missing, if any
    /// config file cannot be parsed, or if the resulting values are invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to look up environment variables.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match env(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Some(db_path) = env(DB_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            cfg.data.db_path = PathBuf::from(db_path);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        if !(self.evaluation.test_fraction > 0.0 && self.evaluation.test_fraction < 1.0) {
            return Err(invalid(
                "evaluation.test_fraction",
                format!("{} is not in (0, 1)", self.evaluation.test_fraction),
            ));
        }
        if self.evaluation.cv_folds < 2 {
            return Err(invalid(
                "evaluation.cv_folds",
                format!("need at least 2 folds, got {}", self.evaluation.cv_folds),
            ));
        }
        if self.evaluation.min_samples == 0 {
            return Err(invalid("evaluation.min_samples", "must be positive".into()));
        }
        if self.model.neighbors == 0 {
            return Err(invalid("model.neighbors", "must be positive".into()));
        }
        if self.data.event_window_days < 0 {
            return Err(invalid(
                "data.event_window_days",
                format!("{} is negative", self.data.event_window_days),
            ));
        }
        Ok(())
    }
}
