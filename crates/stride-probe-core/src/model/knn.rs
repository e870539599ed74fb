//! k-nearest-neighbour classifier on standardized features.

use std::collections::BTreeMap;

use super::classifier::{not_fitted, validate_training_set, Classifier};
use crate::error::{Result, ValidationError};

/// Below this a column is treated as constant and left unscaled.
const MIN_SCALE: f64 = 1e-12;

/// Euclidean k-NN with per-column z-score scaling learned at fit time.
///
/// Votes are counted per class; ties go to the class whose neighbours are
/// closer in total inverse distance, then to the smaller label.
#[derive(Debug, Clone)]
pub struct NearestNeighborClassifier {
    k: usize,
    means: Vec<f64>,
    scales: Vec<f64>,
    train: Vec<Vec<f64>>,
    labels: Vec<i64>,
    classes: Vec<i64>,
}

impl NearestNeighborClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            means: Vec::new(),
            scales: Vec::new(),
            train: Vec::new(),
            labels: Vec::new(),
            classes: Vec::new(),
        }
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (mean, scale))| (v - mean) / scale)
            .collect()
    }

    /// Labels and distances of the nearest training rows, closest first.
    fn neighbours(&self, row: &[f64]) -> Vec<(f64, i64)> {
        let query = self.standardize(row);
        let mut distances: Vec<(f64, i64)> = self
            .train
            .iter()
            .zip(&self.labels)
            .map(|(t, &label)| {
                let d2: f64 = t.iter().zip(&query).map(|(a, b)| (a - b).powi(2)).sum();
                (d2.sqrt(), label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));
        distances.truncate(self.k.min(self.train.len()));
        distances
    }

    fn check_width(&self, x: &[Vec<f64>]) -> Result<()> {
        if x.iter().any(|row| row.len() != self.means.len()) {
            return Err(ValidationError::InvalidValue {
                field: "x".into(),
                message: format!("expected {} features per row", self.means.len()),
            }
            .into());
        }
        Ok(())
    }
}

impl Classifier for NearestNeighborClassifier {
    fn name(&self) -> &str {
        "k-nearest-neighbours"
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[i64]) -> Result<()> {
        self.classes = validate_training_set(x, y)?;

        let n = x.len() as f64;
        let width = x[0].len();
        self.means = (0..width)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        self.scales = (0..width)
            .map(|j| {
                let mean = self.means[j];
                let var = x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > MIN_SCALE {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        self.train = x.iter().map(|row| self.standardize(row)).collect();
        self.labels = y.to_vec();
        Ok(())
    }

    fn predict(&mut self, x: &[Vec<f64>]) -> Result<Vec<i64>> {
        if self.train.is_empty() {
            return Err(not_fitted(self.name()));
        }
        self.check_width(x)?;

        Ok(x.iter()
            .map(|row| {
                let mut votes: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
                for (distance, label) in self.neighbours(row) {
                    let entry = votes.entry(label).or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += 1.0 / (distance + MIN_SCALE);
                }
                // BTreeMap iterates labels ascending; strict comparisons keep the smallest on ties.
                let mut best: Option<(i64, usize, f64)> = None;
                for (label, (count, weight)) in votes {
                    let better = match best {
                        None => true,
                        Some((_, c, w)) => count > c || (count == c && weight > w),
                    };
                    if better {
                        best = Some((label, count, weight));
                    }
                }
                best.map(|(label, _, _)| label).unwrap_or(self.classes[0])
            })
            .collect())
    }

    fn predict_proba(&mut self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.train.is_empty() {
            return Err(not_fitted(self.name()));
        }
        self.check_width(x)?;

        Ok(x.iter()
            .map(|row| {
                let neighbours = self.neighbours(row);
                let total = neighbours.len() as f64;
                self.classes
                    .iter()
                    .map(|class| {
                        neighbours.iter().filter(|(_, l)| l == class).count() as f64 / total
                    })
                    .collect()
            })
            .collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}
