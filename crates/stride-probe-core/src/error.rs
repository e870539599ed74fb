//! Core error types for stride-probe-core.
//!
//! The hierarchy mirrors the pipeline stages: store access, configuration,
//! input validation and evaluation. Data-source problems are usually absorbed
//! by the synthetic fallback; evaluation errors end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stride-probe-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Evaluation could not run on the prepared data
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    /// Feature frame operations rejected by polars
    #[error("Feature frame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Reasons the evaluator refuses to train.
///
/// These carry the numbers a caller needs to explain the refusal, the way the
/// probe prints them before exiting non-zero.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Insufficient samples ({samples} < {required})")]
    InsufficientSamples { samples: usize, required: usize },

    #[error("Insufficient features ({count} < {required}). Available: {available:?}", count = .available.len())]
    InsufficientFeatures {
        available: Vec<String>,
        required: usize,
    },
}

impl EvaluationError {
    /// Sample count attached to the error, when it is about samples.
    pub fn samples(&self) -> Option<usize> {
        match self {
            EvaluationError::InsufficientSamples { samples, .. } => Some(*samples),
            EvaluationError::InsufficientFeatures { .. } => None,
        }
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
