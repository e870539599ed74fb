//! Raw energy log records as they come out of the store or the generator.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lowest value on the energy scale.
pub const ENERGY_MIN: f64 = 1.0;
/// Highest value on the energy scale.
pub const ENERGY_MAX: f64 = 5.0;

/// Tracked numeric fields of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    EnergyLevel,
    MoodScore,
    StressLevel,
    HoursSlept,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::EnergyLevel,
        Field::MoodScore,
        Field::StressLevel,
        Field::HoursSlept,
    ];

    /// Column name in the store and in the feature frame.
    pub fn column(self) -> &'static str {
        match self {
            Field::EnergyLevel => "energy_level",
            Field::MoodScore => "mood_score",
            Field::StressLevel => "stress_level",
            Field::HoursSlept => "hours_slept",
        }
    }

    /// Whether a trailing rolling mean is derived for this field.
    pub fn has_rolling_mean(self) -> bool {
        !matches!(self, Field::HoursSlept)
    }

    /// Value of this field on `entry`, `None` when missing.
    pub fn value(self, entry: &LogEntry) -> Option<f64> {
        match self {
            Field::EnergyLevel => Some(entry.energy_level),
            Field::MoodScore => entry.mood_score,
            Field::StressLevel => entry.stress_level,
            Field::HoursSlept => entry.hours_slept,
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// One day of self-reported state for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub entity_id: String,
    pub date: NaiveDate,
    pub energy_level: f64,
    pub mood_score: Option<f64>,
    pub stress_level: Option<f64>,
    pub hours_slept: Option<f64>,
    pub notes: Option<String>,
}

/// Loaded log entries plus the numeric fields the source actually provided.
///
/// A field missing from `fields` is treated as absent from the schema, not as
/// a column of nulls: no features are derived for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    entries: Vec<LogEntry>,
    fields: Vec<Field>,
}

impl LogTable {
    /// Build a table; entries are ordered by (entity, date) and
    /// `energy_level` is always part of the field set.
    pub fn new(mut entries: Vec<LogEntry>, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut set: BTreeSet<Field> = fields.into_iter().collect();
        set.insert(Field::EnergyLevel);
        entries.sort_by(|a, b| a.entity_id.cmp(&b.entity_id).then(a.date.cmp(&b.date)));
        Self {
            entries,
            fields: set.into_iter().collect(),
        }
    }

    /// Table with every tracked field present.
    pub fn with_all_fields(entries: Vec<LogEntry>) -> Self {
        Self::new(entries, Field::ALL)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct entities.
    pub fn entity_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.entity_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Academic calendar event. Loaded alongside the logs but not used as a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicEvent {
    pub entity_id: String,
    pub event_date: NaiveDate,
    pub event_type: String,
    pub stress_multiplier: Option<f64>,
}
