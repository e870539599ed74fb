//! Deterministic synthetic energy logs.
//!
//! Used when no usable store is available. The series simulates one user
//! whose energy rises with sleep, falls with stress and gets a weekend bump.

use chrono::{Datelike, Duration, NaiveDate};
use rand::distributions::Uniform;
use rand::prelude::*;
use rand_distr::Normal;
use rand_pcg::Mcg128Xsl64;

use super::log::{Field, LogEntry, LogTable, ENERGY_MAX, ENERGY_MIN};
use crate::error::{Result, ValidationError};

/// Entity id of every synthetic record.
pub const SYNTHETIC_ENTITY: &str = "synthetic_user";

const SLEEP_MEAN: f64 = 7.0;
const SLEEP_STD: f64 = 1.5;
const STRESS_MID: f64 = 3.0;
const MOOD_MEAN: f64 = 3.5;
const NOISE_STD: f64 = 0.5;
const BASE_ENERGY: f64 = 3.0;
const SLEEP_WEIGHT: f64 = 0.3;
const STRESS_WEIGHT: f64 = 0.2;
const WEEKEND_BONUS: f64 = 0.5;

/// Seeded generator of daily log entries for a single synthetic user.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    seed: u64,
    samples: usize,
    start: NaiveDate,
}

impl SyntheticGenerator {
    /// 200 daily samples starting 2024-01-01.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            samples: 200,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = start;
        self
    }

    /// Generate the series. Same seed, same output.
    pub fn generate(&self) -> Result<LogTable> {
        let mut rng = Mcg128Xsl64::seed_from_u64(self.seed);
        let n = self.samples;

        let sleep = normal(SLEEP_MEAN, SLEEP_STD)?;
        let mood = normal(MOOD_MEAN, 1.0)?;
        let noise = normal(0.0, NOISE_STD)?;
        let stress = Uniform::new(1.0, 5.0);

        // Draw each column in full before the next so that changing one
        // formula never shifts the random stream of another column.
        let hours_slept: Vec<f64> = (0..n)
            .map(|_| sleep.sample(&mut rng).clamp(4.0, 10.0))
            .collect();
        let stress_level: Vec<f64> = (0..n).map(|_| stress.sample(&mut rng)).collect();
        let mood_score: Vec<f64> = (0..n)
            .map(|_| mood.sample(&mut rng).clamp(1.0, 5.0))
            .collect();
        let noise: Vec<f64> = (0..n).map(|_| noise.sample(&mut rng)).collect();

        let entries = (0..n)
            .map(|i| {
                let date = self.start + Duration::days(i as i64);
                let weekend_bonus = if date.weekday().num_days_from_monday() >= 5 {
                    WEEKEND_BONUS
                } else {
                    0.0
                };
                let energy = BASE_ENERGY
                    + (hours_slept[i] - SLEEP_MEAN) * SLEEP_WEIGHT
                    - (stress_level[i] - STRESS_MID) * STRESS_WEIGHT
                    + weekend_bonus
                    + noise[i];

                LogEntry {
                    entity_id: SYNTHETIC_ENTITY.to_string(),
                    date,
                    energy_level: energy.round_ties_even().clamp(ENERGY_MIN, ENERGY_MAX),
                    mood_score: Some(mood_score[i].round_ties_even()),
                    stress_level: Some(stress_level[i].round_ties_even()),
                    hours_slept: Some(round_to(hours_slept[i], 1)),
                    notes: None,
                }
            })
            .collect();

        Ok(LogTable::new(entries, Field::ALL))
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        ValidationError::InvalidValue {
            field: "synthetic.distribution".to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Round to `decimals` places, ties to even.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
