//! # Stride Probe Core Library
//!
//! Feasibility probe for predicting a self-reported energy level (1 to 5)
//! from recent behavioral logs. The binary is a thin runner over this crate.
//!
//! ## Architecture
//!
//! - **Source**: reads the SQLite store read-only, or falls back to a seeded
//!   synthetic series when the store is absent or too thin
//! - **Energy**: log model, lag/rolling/cyclic feature engineering and the
//!   fixed feature allow-list
//! - **Model**: classifier strategies, stratified splits and evaluation
//! - **Report**: percentages, verdict and next steps
//!
//! ## Key Components
//!
//! - [`run_probe`]: the whole pipeline against a caller-supplied writer
//! - [`DataResolver`]: store-or-synthetic decision
//! - [`Evaluator`]: holdout plus cross-validated accuracy
//! - [`Config`]: TOML configuration with environment overrides

pub mod energy;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod storage;

pub use energy::{build_features, select_features, FeatureFrame, FeatureSet, LogEntry, LogTable, SyntheticGenerator};
pub use error::{ConfigError, CoreError, DatabaseError, EvaluationError, ValidationError};
pub use model::{select_classifier, Classifier, ClassifierKind, EvaluationResults, Evaluator, MockClassifier};
pub use pipeline::{run_probe, ProbeOutcome};
pub use report::Verdict;
pub use source::{DataResolver, DataSource, FallbackReason, ResolvedData};
pub use storage::{Config, EnergyLogStore};
