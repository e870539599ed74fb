mod config;
pub mod database;

pub use config::{Config, DataConfig, EvaluationConfig, ModelConfig, CONFIG_PATH_ENV, DB_PATH_ENV};
pub use database::{EnergyLogStore, StoreLoad};

use std::path::PathBuf;

/// Returns `<config_dir>/stride/`, or `None` when the platform has no config dir.
///
/// The directory is not created; the probe only ever reads from it.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("stride"))
}
