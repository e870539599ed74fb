//! Temporal feature engineering over energy logs.
//!
//! Per entity and per tracked field this derives:
//! - lag features (previous day, previous week)
//! - a trailing rolling mean (energy, mood, stress)
//! - a cyclic day-of-week encoding
//!
//! Each entity is engineered into its own polars frame so windows never cross
//! entity boundaries. The frames are stacked and rows with any null value are
//! dropped, which removes at least the first 7 records of every entity.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::debug;

use super::log::{Field, LogEntry, LogTable};
use crate::error::Result;

/// Lag offsets derived for every tracked field.
pub const LAGS: [usize; 2] = [1, 7];
/// Size of the trailing rolling window.
pub const ROLLING_WINDOW: usize = 7;

const ENTITY_COLUMN: &str = "entity_id";

pub fn lag_column(field: Field, lag: usize) -> String {
    format!("{}_lag{lag}", field.column())
}

pub fn rolling_column(field: Field) -> String {
    format!("{}_rolling{ROLLING_WINDOW}", field.column())
}

/// Trailing mean over at most `window` positions ending at each index.
///
/// Missing values are skipped; the mean is `None` only when the whole window
/// is missing. Near the start of a series the window is simply shorter.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}

/// Day of week (Monday = 0) and its position on the unit circle.
pub fn cyclic_day_of_week(date: NaiveDate) -> (u32, f64, f64) {
    let dow = date.weekday().num_days_from_monday();
    let angle = 2.0 * PI * dow as f64 / 7.0;
    (dow, angle.sin(), angle.cos())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnSpec {
    Raw(Field),
    Lag(Field, usize),
    Rolling(Field),
    DayOfWeek,
    DaySin,
    DayCos,
}

impl ColumnSpec {
    fn name(self) -> String {
        match self {
            ColumnSpec::Raw(field) => field.column().to_string(),
            ColumnSpec::Lag(field, k) => lag_column(field, k),
            ColumnSpec::Rolling(field) => rolling_column(field),
            ColumnSpec::DayOfWeek => "day_of_week".to_string(),
            ColumnSpec::DaySin => "day_sin".to_string(),
            ColumnSpec::DayCos => "day_cos".to_string(),
        }
    }
}

fn column_specs(fields: &[Field]) -> Vec<ColumnSpec> {
    let mut specs: Vec<ColumnSpec> = fields.iter().map(|&f| ColumnSpec::Raw(f)).collect();
    for &field in fields {
        for k in LAGS {
            specs.push(ColumnSpec::Lag(field, k));
        }
    }
    specs.extend(
        fields
            .iter()
            .filter(|f| f.has_rolling_mean())
            .map(|&f| ColumnSpec::Rolling(f)),
    );
    specs.extend([ColumnSpec::DayOfWeek, ColumnSpec::DaySin, ColumnSpec::DayCos]);
    specs
}

/// Engineered records: a polars frame of numeric columns plus the entity
/// each row belongs to.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    entity_ids: Vec<String>,
    data: DataFrame,
}

impl FeatureFrame {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of numeric columns.
    pub fn width(&self) -> usize {
        self.data.width()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.get_column_index(name).is_some()
    }

    /// Values of a numeric column. Nulls never survive [`build_features`].
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let values = self.data.column(name).ok()?.as_materialized_series().f64().ok()?;
        Some(values.into_no_null_iter().collect())
    }

    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    /// Drop a column, returning whether it existed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        self.data.drop_in_place(name).is_ok()
    }
}

/// Build the engineered feature frame for `table`.
///
/// # Errors
///
/// Returns [`CoreError::Frame`](crate::error::CoreError::Frame) if polars
/// rejects a frame operation.
pub fn build_features(table: &LogTable) -> Result<FeatureFrame> {
    let specs = column_specs(table.fields());

    let mut stacked: Option<DataFrame> = None;
    for group in table.entries().chunk_by(|a, b| a.entity_id == b.entity_id) {
        let frame = entity_frame(group, &specs)?;
        match stacked.as_mut() {
            Some(all) => {
                all.vstack_mut(&frame)?;
            }
            None => stacked = Some(frame),
        }
    }
    let stacked = match stacked {
        Some(all) => all,
        None => entity_frame(&[], &specs)?,
    };

    let mut data = stacked.drop_nulls::<String>(None)?;
    let ids = data.drop_in_place(ENTITY_COLUMN)?;
    let entity_ids: Vec<String> = ids
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|id| id.unwrap_or_default().to_string())
        .collect();

    debug!(
        input = table.len(),
        kept = data.height(),
        dropped = stacked.height() - data.height(),
        columns = data.width(),
        "built feature frame"
    );
    Ok(FeatureFrame { entity_ids, data })
}

/// Engineer one entity's chronologically ordered entries. Undefined values
/// stay null.
fn entity_frame(entries: &[LogEntry], specs: &[ColumnSpec]) -> PolarsResult<DataFrame> {
    let raw = |field: Field| -> Vec<Option<f64>> { entries.iter().map(|e| field.value(e)).collect() };
    let days: Vec<(u32, f64, f64)> = entries.iter().map(|e| cyclic_day_of_week(e.date)).collect();

    let mut columns: Vec<Column> = Vec::with_capacity(specs.len() + 1);
    let ids: Vec<String> = entries.iter().map(|e| e.entity_id.clone()).collect();
    columns.push(Series::new(ENTITY_COLUMN.into(), ids).into());

    for &spec in specs {
        let name: PlSmallStr = spec.name().into();
        let series = match spec {
            ColumnSpec::Raw(f) => Series::new(name, raw(f)),
            ColumnSpec::Lag(f, k) => Series::new(name, raw(f)).shift(k as i64),
            ColumnSpec::Rolling(f) => Series::new(name, trailing_mean(&raw(f), ROLLING_WINDOW)),
            ColumnSpec::DayOfWeek => {
                Series::new(name, days.iter().map(|d| d.0 as f64).collect::<Vec<f64>>())
            }
            ColumnSpec::DaySin => Series::new(name, days.iter().map(|d| d.1).collect::<Vec<f64>>()),
            ColumnSpec::DayCos => Series::new(name, days.iter().map(|d| d.2).collect::<Vec<f64>>()),
        };
        columns.push(series.into());
    }
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(entity: &str, energies: &[f64]) -> Vec<LogEntry> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        energies
            .iter()
            .enumerate()
            .map(|(i, &energy)| LogEntry {
                entity_id: entity.to_string(),
                date: start + chrono::Duration::days(i as i64),
                energy_level: energy,
                mood_score: Some(energy + 0.5),
                stress_level: Some(6.0 - energy),
                hours_slept: Some(7.0),
                notes: None,
            })
            .collect()
    }

    #[test]
    fn lags_are_null_until_history_exists() {
        let mut rows = entries("a", &[1.0, 2.0, 3.0, 4.0]);
        rows[1].mood_score = None;
        let frame = entity_frame(&rows, &column_specs(&Field::ALL)).unwrap();
        let lag1: Vec<Option<f64>> = frame
            .column("mood_score_lag1")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(lag1, vec![None, Some(1.5), None, Some(3.5)]);
        assert_eq!(frame.column("energy_level_lag7").unwrap().null_count(), 4);
    }

    #[test]
    fn trailing_mean_uses_shorter_window_at_start() {
        let v: Vec<Option<f64>> = (1..=9).map(|x| Some(x as f64)).collect();
        let means = trailing_mean(&v, 7);
        for k in 1..7 {
            let expected = (1..=k).sum::<usize>() as f64 / k as f64;
            assert_eq!(means[k - 1], Some(expected));
        }
        // Full window from the 7th value on.
        assert_eq!(means[6], Some(4.0));
        assert_eq!(means[8], Some(6.0));
    }

    #[test]
    fn trailing_mean_skips_missing_values() {
        let v = [None, Some(2.0), None, Some(4.0)];
        assert_eq!(trailing_mean(&v, 7), vec![None, Some(2.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn column_layout_with_all_fields() {
        let table = LogTable::with_all_fields(entries("a", &[3.0; 10]));
        let frame = build_features(&table).unwrap();
        assert_eq!(
            frame.column_names(),
            vec![
                "energy_level",
                "mood_score",
                "stress_level",
                "hours_slept",
                "energy_level_lag1",
                "energy_level_lag7",
                "mood_score_lag1",
                "mood_score_lag7",
                "stress_level_lag1",
                "stress_level_lag7",
                "hours_slept_lag1",
                "hours_slept_lag7",
                "energy_level_rolling7",
                "mood_score_rolling7",
                "stress_level_rolling7",
                "day_of_week",
                "day_sin",
                "day_cos",
            ]
        );
    }

    #[test]
    fn first_seven_records_per_entity_are_dropped() {
        let mut all = entries("a", &[1.0, 2.0, 3.0, 4.0, 5.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        all.extend(entries("b", &[5.0; 8]));
        let frame = build_features(&LogTable::with_all_fields(all)).unwrap();

        assert_eq!(frame.len(), 3 + 1);
        assert_eq!(
            frame.entity_ids(),
            &["a".to_string(), "a".to_string(), "a".to_string(), "b".to_string()]
        );
        // Entity b's lag-7 comes from its own history, never from entity a.
        assert_eq!(frame.column("energy_level_lag7").unwrap(), &[1.0, 2.0, 3.0, 5.0]);
        assert_eq!(frame.column("energy_level_lag1").unwrap(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn missing_value_drops_its_row_and_dependent_lags() {
        let mut rows = entries("a", &[3.0; 16]);
        rows[8].mood_score = None;
        let frame = build_features(&LogTable::with_all_fields(rows)).unwrap();
        // Rows 7..16 survive the lag-7 cut; row 8 (raw), 9 (lag1) and 15 (lag7) go.
        assert_eq!(frame.len(), 9 - 3);
        let rolling = frame.column("mood_score_rolling7").unwrap();
        assert!(rolling.iter().all(|v| (*v - 3.5).abs() < 1e-12));
    }

    #[test]
    fn absent_field_produces_no_columns() {
        let table = LogTable::new(entries("a", &[2.0; 9]), [Field::MoodScore]);
        let frame = build_features(&table).unwrap();
        assert!(frame.has_column("mood_score_rolling7"));
        assert!(!frame.has_column("hours_slept"));
        assert!(!frame.has_column("stress_level_lag1"));
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn cyclic_encoding_known_days() {
        // 2024-01-01 was a Monday.
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (dow, s, c) = cyclic_day_of_week(monday);
        assert_eq!(dow, 0);
        assert_eq!(s, 0.0);
        assert_eq!(c, 1.0);

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let (dow, s, _) = cyclic_day_of_week(sunday);
        assert_eq!(dow, 6);
        assert!(s < 0.0);
    }

    #[test]
    fn remove_column_reports_presence() {
        let mut frame = build_features(&LogTable::with_all_fields(entries("a", &[3.0; 8]))).unwrap();
        assert!(frame.remove_column("hours_slept"));
        assert!(!frame.remove_column("hours_slept"));
        assert!(!frame.has_column("hours_slept"));
    }

    proptest! {
        #[test]
        fn lags_and_rolling_match_history(values in prop::collection::vec(1u8..=5, 0..40)) {
            let energies: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            let frame = build_features(&LogTable::with_all_fields(entries("p", &energies))).unwrap();

            prop_assert_eq!(frame.len(), energies.len().saturating_sub(7));
            let lag1 = frame.column("energy_level_lag1").unwrap();
            let lag7 = frame.column("energy_level_lag7").unwrap();
            let rolling = frame.column("energy_level_rolling7").unwrap();
            let current = frame.column("energy_level").unwrap();

            for (row, i) in (7..energies.len()).enumerate() {
                prop_assert_eq!(current[row], energies[i]);
                prop_assert_eq!(lag1[row], energies[i - 1]);
                prop_assert_eq!(lag7[row], energies[i - 7]);
                let expected = energies[i - 6..=i].iter().sum::<f64>() / 7.0;
                prop_assert!((rolling[row] - expected).abs() < 1e-9);
            }
        }

        #[test]
        fn day_encoding_lies_on_unit_circle(offset in 0i64..3650) {
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset);
            let (dow, s, c) = cyclic_day_of_week(date);
            prop_assert!(dow < 7);
            prop_assert!((s * s + c * c - 1.0).abs() < 1e-12);
        }
    }
}
