//! Holdout and cross-validated evaluation of a classifier on a feature set.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::classifier::Classifier;
use super::metrics::{accuracy, classification_report, mean_std, ClassificationReport};
use super::split::{stratified_holdout, stratified_k_fold};
use crate::energy::FeatureSet;
use crate::error::{EvaluationError, Result};
use crate::storage::EvaluationConfig;

/// Knobs for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSettings {
    /// Fewer rows than this and nothing is trained.
    pub min_samples: usize,
    pub test_fraction: f64,
    pub cv_folds: usize,
    /// Seed for the holdout shuffle.
    pub seed: u64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self::from(&EvaluationConfig::default())
    }
}

impl From<&EvaluationConfig> for EvaluationSettings {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            test_fraction: config.test_fraction,
            cv_folds: config.cv_folds,
            seed: config.seed,
        }
    }
}

/// Everything the report needs from one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub samples: usize,
    pub features: usize,
    pub classes: Vec<i64>,
    pub train_size: usize,
    pub test_size: usize,
    /// Holdout accuracy.
    pub accuracy: f64,
    pub cv_scores: Vec<f64>,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub classifier: String,
    /// True when the scores came from the mock classifier.
    pub placeholder: bool,
    /// Per-class scores on the holdout split.
    pub report: ClassificationReport,
}

/// Runs the holdout and k-fold evaluations.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    settings: EvaluationSettings,
}

fn take_rows(x: &[Vec<f64>], idx: &[usize]) -> Vec<Vec<f64>> {
    idx.iter().map(|&i| x[i].clone()).collect()
}

fn take_labels(y: &[i64], idx: &[usize]) -> Vec<i64> {
    idx.iter().map(|&i| y[i]).collect()
}

impl Evaluator {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    /// Train on a stratified holdout split, score it, then cross-validate on
    /// the full set. Cross-validated accuracy is the headline number.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::InsufficientSamples`] when the set is below the
    /// configured minimum; otherwise whatever splitting or the classifier
    /// reports.
    pub fn evaluate(&self, set: &FeatureSet, classifier: &mut dyn Classifier) -> Result<EvaluationResults> {
        let samples = set.n_samples();
        if samples < self.settings.min_samples {
            return Err(EvaluationError::InsufficientSamples {
                samples,
                required: self.settings.min_samples,
            }
            .into());
        }

        let split = stratified_holdout(&set.y, self.settings.test_fraction, self.settings.seed)?;
        let y_train = take_labels(&set.y, &split.train);
        let y_test = take_labels(&set.y, &split.test);
        classifier.fit(&take_rows(&set.x, &split.train), &y_train)?;
        let y_pred = classifier.predict(&take_rows(&set.x, &split.test))?;
        let holdout_accuracy = accuracy(&y_test, &y_pred);
        let report = classification_report(&y_test, &y_pred);

        let mut cv_scores = Vec::with_capacity(self.settings.cv_folds);
        for (fold, part) in stratified_k_fold(&set.y, self.settings.cv_folds)?
            .into_iter()
            .enumerate()
        {
            classifier.fit(&take_rows(&set.x, &part.train), &take_labels(&set.y, &part.train))?;
            let predicted = classifier.predict(&take_rows(&set.x, &part.test))?;
            let score = accuracy(&take_labels(&set.y, &part.test), &predicted);
            debug!(fold, score, "cross-validation fold scored");
            cv_scores.push(score);
        }
        let (cv_mean, cv_std) = mean_std(&cv_scores);

        info!(
            classifier = classifier.name(),
            samples,
            accuracy = holdout_accuracy,
            cv_mean,
            "evaluation complete"
        );

        Ok(EvaluationResults {
            samples,
            features: set.n_features(),
            classes: set.classes(),
            train_size: split.train.len(),
            test_size: split.test.len(),
            accuracy: holdout_accuracy,
            cv_scores,
            cv_mean,
            cv_std,
            classifier: classifier.name().to_string(),
            placeholder: classifier.is_placeholder(),
            report,
        })
    }
}
