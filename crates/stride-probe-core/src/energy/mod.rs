//! Energy log data and feature engineering.
//!
//! This module covers everything between raw log rows and the model's input
//! matrix: the log model, the synthetic fallback series, temporal feature
//! derivation and the fixed feature allow-list.

mod features;
mod log;
mod selection;
mod synthetic;

pub use features::{
    build_features, cyclic_day_of_week, lag_column, rolling_column, trailing_mean,
    FeatureFrame, LAGS, ROLLING_WINDOW,
};
pub use log::{AcademicEvent, Field, LogEntry, LogTable, ENERGY_MAX, ENERGY_MIN};
pub use selection::{select_features, FeatureSet, FEATURE_COLUMNS, MIN_FEATURES};
pub use synthetic::{SyntheticGenerator, SYNTHETIC_ENTITY};
