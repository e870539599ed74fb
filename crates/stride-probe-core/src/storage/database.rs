//! Read-only SQLite access to the Stride store.
//!
//! Reads:
//! - `energy_logs`: one self-report per user and day
//! - `academic_events`: upcoming/recent academic events (loaded, unused)
//!
//! The store is never written. Optional columns may be missing from the
//! schema; the loader reports which tracked fields it actually found.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, warn};

use crate::energy::{AcademicEvent, Field, LogEntry, LogTable};
use crate::error::{DatabaseError, Result, ValidationError};

pub const LOG_TABLE: &str = "energy_logs";
pub const EVENTS_TABLE: &str = "academic_events";

const REQUIRED_LOG_COLUMNS: [&str; 3] = ["user_id", "log_date", "energy_level"];
const OPTIONAL_LOG_COLUMNS: [&str; 4] = ["mood_score", "stress_level", "hours_slept", "notes"];
const REQUIRED_EVENT_COLUMNS: [&str; 3] = ["user_id", "event_date", "event_type"];

/// Outcome of reading the log table.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLoad {
    /// Rows were read (possibly zero).
    Loaded(LogTable),
    /// `energy_logs` does not exist.
    MissingTable { available: Vec<String> },
    /// `energy_logs` exists but lacks required columns.
    MissingColumns { missing: Vec<String> },
}

struct RawLogRow {
    user_id: Option<String>,
    log_date: Option<String>,
    energy_level: Option<f64>,
    mood_score: Option<f64>,
    stress_level: Option<f64>,
    hours_slept: Option<f64>,
    notes: Option<String>,
}

/// Read-only handle on the store.
pub struct EnergyLogStore {
    conn: Connection,
}

impl EnergyLogStore {
    /// Open the store at `path` without write access.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened as a SQLite database.
    pub fn open_read_only(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Release the connection, surfacing any close error.
    pub fn close(self) -> Result<(), DatabaseError> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    /// Names of all tables and views, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Load every log row with an energy level, ordered by (user, date).
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored date cannot be parsed.
    pub fn load_energy_logs(&self) -> Result<StoreLoad> {
        let tables = self.table_names()?;
        if !tables.iter().any(|t| t == LOG_TABLE) {
            return Ok(StoreLoad::MissingTable { available: tables });
        }

        let columns = self.column_names(LOG_TABLE)?;
        let missing: Vec<String> = REQUIRED_LOG_COLUMNS
            .iter()
            .filter(|c| !columns.iter().any(|have| have == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Ok(StoreLoad::MissingColumns { missing });
        }

        let projection: Vec<String> = REQUIRED_LOG_COLUMNS
            .iter()
            .chain(OPTIONAL_LOG_COLUMNS.iter())
            .map(|c| {
                if columns.iter().any(|have| have == c) {
                    c.to_string()
                } else {
                    format!("NULL AS {c}")
                }
            })
            .collect();
        let sql = format!(
            "SELECT {} FROM {LOG_TABLE}
             WHERE energy_level IS NOT NULL
             ORDER BY user_id, log_date",
            projection.join(", ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawLogRow {
                    user_id: text_of(row.get_ref(0)?),
                    log_date: text_of(row.get_ref(1)?),
                    energy_level: number_of(row.get_ref(2)?),
                    mood_score: number_of(row.get_ref(3)?),
                    stress_level: number_of(row.get_ref(4)?),
                    hours_slept: number_of(row.get_ref(5)?),
                    notes: text_of(row.get_ref(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;

        let mut entries = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for raw in rows {
            let (Some(entity_id), Some(log_date), Some(energy_level)) =
                (raw.user_id, raw.log_date, raw.energy_level)
            else {
                skipped += 1;
                continue;
            };
            entries.push(LogEntry {
                entity_id,
                date: parse_date("log_date", &log_date)?,
                energy_level,
                mood_score: raw.mood_score,
                stress_level: raw.stress_level,
                hours_slept: raw.hours_slept,
                notes: raw.notes,
            });
        }
        if skipped > 0 {
            warn!(skipped, "skipped log rows without user_id, log_date or a numeric energy_level");
        }

        let fields: Vec<Field> = columns.iter().filter_map(|c| Field::from_column(c)).collect();
        debug!(rows = entries.len(), ?fields, "loaded energy logs");
        Ok(StoreLoad::Loaded(LogTable::new(entries, fields)))
    }

    /// Load academic events dated on or after `since`.
    ///
    /// A missing table yields no events. Rows with unparseable dates are
    /// skipped; a non-numeric multiplier reads as absent.
    pub fn load_academic_events(&self, since: NaiveDate) -> Result<Vec<AcademicEvent>> {
        if !self.table_names()?.iter().any(|t| t == EVENTS_TABLE) {
            return Ok(Vec::new());
        }
        let columns = self.column_names(EVENTS_TABLE)?;
        if let Some(missing) = REQUIRED_EVENT_COLUMNS
            .iter()
            .find(|c| !columns.iter().any(|have| have == *c))
        {
            warn!(column = *missing, "academic_events lacks a required column");
            return Ok(Vec::new());
        }
        let multiplier = if columns.iter().any(|c| c == "stress_multiplier") {
            "stress_multiplier"
        } else {
            "NULL AS stress_multiplier"
        };

        let sql = format!(
            "SELECT user_id, event_date, event_type, {multiplier}
             FROM {EVENTS_TABLE}
             WHERE event_date >= ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![since.format("%Y-%m-%d").to_string()], |row| {
                Ok((
                    text_of(row.get_ref(0)?),
                    text_of(row.get_ref(1)?),
                    text_of(row.get_ref(2)?),
                    number_of(row.get_ref(3)?),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;

        let events: Vec<AcademicEvent> = rows
            .into_iter()
            .filter_map(|(user, date, event_type, stress_multiplier)| {
                Some(AcademicEvent {
                    entity_id: user?,
                    event_date: parse_date("event_date", &date?).ok()?,
                    event_type: event_type.unwrap_or_default(),
                    stress_multiplier,
                })
            })
            .collect();
        debug!(events = events.len(), %since, "loaded academic events");
        Ok(events)
    }
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Numeric reading of a loosely typed column. Text is parsed after trimming;
/// anything that is not a number reads as `None`.
fn number_of(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Parse the `YYYY-MM-DD` prefix of a stored date or timestamp.
fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("'{value}': {e}"),
    })
}
