//! Data source resolution: the real store when it has enough usable rows,
//! otherwise the seeded synthetic series.
//!
//! Falling back is not an error. The resolver says which source it used and
//! why, both on the caller's writer and through `tracing`.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::energy::{build_features, AcademicEvent, FeatureFrame, LogTable, SyntheticGenerator};
use crate::error::Result;
use crate::storage::database::LOG_TABLE;
use crate::storage::{DataConfig, EnergyLogStore, StoreLoad};

/// Why the synthetic series was used instead of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    StoreNotFound,
    MissingTable { available: Vec<String> },
    MissingColumns { missing: Vec<String> },
    NoRows,
    TooFewSamples { samples: usize, required: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::StoreNotFound => write!(f, "store not found"),
            FallbackReason::MissingTable { available } => {
                write!(f, "table '{LOG_TABLE}' not found (available: {available:?})")
            }
            FallbackReason::MissingColumns { missing } => {
                write!(f, "table '{LOG_TABLE}' lacks columns {missing:?}")
            }
            FallbackReason::NoRows => write!(f, "no {LOG_TABLE} rows"),
            FallbackReason::TooFewSamples { samples, required } => {
                write!(f, "{samples} usable records, {required} required")
            }
        }
    }
}

/// Where the run's data came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Store { path: PathBuf },
    Synthetic { reason: FallbackReason },
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic { .. })
    }
}

/// The loaded log table and its engineered frame.
#[derive(Debug, Clone)]
pub struct ResolvedData {
    pub source: DataSource,
    pub table: LogTable,
    pub frame: FeatureFrame,
    /// Academic events from the store. Counted, never joined into features.
    pub events: Vec<AcademicEvent>,
}

/// Picks the data source for one run.
#[derive(Debug, Clone)]
pub struct DataResolver {
    config: DataConfig,
    min_samples: usize,
    seed: u64,
    today: NaiveDate,
}

impl DataResolver {
    /// `today` anchors the academic-event window; pass the current date in
    /// production.
    pub fn new(config: &DataConfig, min_samples: usize, seed: u64, today: NaiveDate) -> Self {
        Self {
            config: config.clone(),
            min_samples,
            seed,
            today,
        }
    }

    /// Resolve the data for this run, writing progress lines to `out`.
    ///
    /// # Errors
    ///
    /// A store that exists but cannot be opened or queried is an error, as
    /// is a failure to write to `out`. Missing or thin data is not.
    pub fn resolve(&self, out: &mut dyn Write) -> Result<ResolvedData> {
        let path = self.config.db_path.as_path();
        if !path.exists() {
            writeln!(out, "Database not found: {}", path.display())?;
            writeln!(out, "Using synthetic data for demonstration.")?;
            return self.synthesize(FallbackReason::StoreNotFound, out);
        }

        writeln!(out, "Connecting to store: {}", path.display())?;
        match self.load_store(path, out)? {
            Ok(data) => Ok(data),
            Err(reason) => {
                writeln!(out)?;
                writeln!(out, "Insufficient real data. Falling back to synthetic data.")?;
                self.synthesize(reason, out)
            }
        }
    }

    /// Read the store. The inner `Err` is a reason to fall back.
    fn load_store(
        &self,
        path: &Path,
        out: &mut dyn Write,
    ) -> Result<std::result::Result<ResolvedData, FallbackReason>> {
        let store = EnergyLogStore::open_read_only(path)?;
        let loaded = store.load_energy_logs();
        let since = self.today - Duration::days(self.config.event_window_days);
        let events = match &loaded {
            Ok(StoreLoad::Loaded(_)) => store.load_academic_events(since),
            _ => Ok(Vec::new()),
        };
        store.close()?;

        let table = match loaded? {
            StoreLoad::Loaded(table) => table,
            StoreLoad::MissingTable { available } => {
                writeln!(out, "Table '{LOG_TABLE}' not found. Available tables: {available:?}")?;
                return Ok(Err(FallbackReason::MissingTable { available }));
            }
            StoreLoad::MissingColumns { missing } => {
                writeln!(out, "Table '{LOG_TABLE}' is missing required columns: {missing:?}")?;
                return Ok(Err(FallbackReason::MissingColumns { missing }));
            }
        };
        // Events never feed the features; a read failure only loses the count.
        let events = events.unwrap_or_else(|err| {
            warn!(%err, "could not read academic events, continuing without them");
            Vec::new()
        });

        if table.is_empty() {
            writeln!(out, "No {LOG_TABLE} data found.")?;
            return Ok(Err(FallbackReason::NoRows));
        }
        writeln!(
            out,
            "Loaded {} energy log entries from {} users",
            table.len(),
            table.entity_count()
        )?;
        info!(events = events.len(), %since, "academic events loaded (not used as features)");

        let frame = build_features(&table)?;
        if frame.len() < self.min_samples {
            warn!(
                records = frame.len(),
                required = self.min_samples,
                "too few engineered records in store"
            );
            return Ok(Err(FallbackReason::TooFewSamples {
                samples: frame.len(),
                required: self.min_samples,
            }));
        }

        Ok(Ok(ResolvedData {
            source: DataSource::Store {
                path: path.to_path_buf(),
            },
            table,
            frame,
            events,
        }))
    }

    fn synthesize(&self, reason: FallbackReason, out: &mut dyn Write) -> Result<ResolvedData> {
        warn!(%reason, "using synthetic data");
        let table = SyntheticGenerator::new(self.seed)
            .with_samples(self.config.synthetic_samples)
            .with_start(self.config.synthetic_start)
            .generate()?;
        let frame = build_features(&table)?;
        writeln!(out)?;
        writeln!(out, "Generated {} synthetic energy logs", frame.len())?;
        Ok(ResolvedData {
            source: DataSource::Synthetic { reason },
            table,
            frame,
            events: Vec::new(),
        })
    }
}
