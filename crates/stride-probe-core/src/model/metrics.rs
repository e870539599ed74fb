//! Classification scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fraction of positions where `y_pred` equals `y_true`. Empty input scores 0.
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class scores plus accuracy and the macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: BTreeMap<i64, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score every label that occurs in either `y_true` or `y_pred`.
///
/// Undefined ratios (no predictions or no support for a class) count as 0.
pub fn classification_report(y_true: &[i64], y_pred: &[i64]) -> ClassificationReport {
    // (true positives, predicted, support)
    let mut counts: BTreeMap<i64, (usize, usize, usize)> = BTreeMap::new();
    for &label in y_true.iter().chain(y_pred) {
        counts.entry(label).or_default();
    }
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t == p {
            counts.entry(t).or_default().0 += 1;
        }
        counts.entry(p).or_default().1 += 1;
        counts.entry(t).or_default().2 += 1;
    }

    let per_class: BTreeMap<i64, ClassMetrics> = counts
        .into_iter()
        .map(|(label, (tp, predicted, support))| {
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (
                label,
                ClassMetrics {
                    precision,
                    recall,
                    f1_score,
                    support,
                },
            )
        })
        .collect();

    let total: usize = per_class.values().map(|m| m.support).sum();
    let labels = per_class.len().max(1) as f64;
    let macro_avg = ClassMetrics {
        precision: per_class.values().map(|m| m.precision).sum::<f64>() / labels,
        recall: per_class.values().map(|m| m.recall).sum::<f64>() / labels,
        f1_score: per_class.values().map(|m| m.f1_score).sum::<f64>() / labels,
        support: total,
    };
    let weighted = |score: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            per_class
                .values()
                .map(|m| score(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        }
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m: &ClassMetrics| m.precision),
        recall: weighted(|m: &ClassMetrics| m.recall),
        f1_score: weighted(|m: &ClassMetrics| m.f1_score),
        support: total,
    };

    ClassificationReport {
        accuracy: accuracy(y_true, y_pred),
        per_class,
        macro_avg,
        weighted_avg,
    }
}
