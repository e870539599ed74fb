//! Classifier strategy seam.
//!
//! The evaluator only sees [`Classifier`]. Which implementation backs it is
//! decided once, at startup, by [`select_classifier`].

use rand::prelude::*;
use rand_distr::Dirichlet;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ValidationError};
use crate::storage::ModelConfig;

/// Which classifier the probe should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// The real classifier when it is compiled in, otherwise the mock.
    #[default]
    Auto,
    /// Nearest-neighbour classifier.
    Knn,
    /// Random placeholder.
    Mock,
}

/// A multi-class classifier over dense `f64` rows.
///
/// `fit` may be called repeatedly; every call discards previous state.
pub trait Classifier {
    /// Short human-readable name.
    fn name(&self) -> &str;

    /// True for stand-ins that carry no predictive signal.
    fn is_placeholder(&self) -> bool {
        false
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[i64]) -> Result<()>;

    fn predict(&mut self, x: &[Vec<f64>]) -> Result<Vec<i64>>;

    /// Per-row probabilities, columns ordered like [`Classifier::classes`].
    fn predict_proba(&mut self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Sorted classes seen by the last `fit`.
    fn classes(&self) -> &[i64];
}

/// Check the shape of a training set and return its sorted distinct classes.
pub(crate) fn validate_training_set(x: &[Vec<f64>], y: &[i64]) -> Result<Vec<i64>> {
    if x.is_empty() {
        return Err(ValidationError::EmptyCollection("training set".into()).into());
    }
    if x.len() != y.len() {
        return Err(ValidationError::InvalidValue {
            field: "y".into(),
            message: format!("{} targets for {} rows", y.len(), x.len()),
        }
        .into());
    }
    let width = x[0].len();
    if x.iter().any(|row| row.len() != width) {
        return Err(ValidationError::InvalidValue {
            field: "x".into(),
            message: "rows have differing widths".into(),
        }
        .into());
    }
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    Ok(classes)
}

pub(crate) fn not_fitted(name: &str) -> crate::error::CoreError {
    ValidationError::EmptyCollection(format!("{name} has not been fitted")).into()
}

/// Placeholder used when no real classifier is available.
///
/// Fitting only records the class set. Predictions are uniform draws from it
/// and probabilities come from a flat Dirichlet, so accuracy hovers around
/// chance. Seeded, so runs are reproducible.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    classes: Vec<i64>,
    rng: Mcg128Xsl64,
}

impl MockClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            classes: Vec::new(),
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_placeholder(&self) -> bool {
        true
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[i64]) -> Result<()> {
        self.classes = validate_training_set(x, y)?;
        Ok(())
    }

    fn predict(&mut self, x: &[Vec<f64>]) -> Result<Vec<i64>> {
        if self.classes.is_empty() {
            return Err(not_fitted(self.name()));
        }
        let n = self.classes.len();
        Ok(x
            .iter()
            .map(|_| self.classes[self.rng.gen_range(0..n)])
            .collect())
    }

    fn predict_proba(&mut self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self.classes.len() {
            0 => Err(not_fitted(self.name())),
            1 => Ok(x.iter().map(|_| vec![1.0]).collect()),
            n => {
                let dirichlet = Dirichlet::new(&vec![1.0; n]).map_err(|e| {
                    ValidationError::InvalidValue {
                        field: "dirichlet.alpha".into(),
                        message: e.to_string(),
                    }
                })?;
                Ok(x.iter().map(|_| dirichlet.sample(&mut self.rng)).collect())
            }
        }
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

/// The classifier chosen for a run.
pub struct ClassifierSelection {
    pub classifier: Box<dyn Classifier>,
    pub requested: ClassifierKind,
    /// Why the requested classifier was replaced by the mock, if it was.
    pub fallback_reason: Option<String>,
}

impl std::fmt::Debug for ClassifierSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierSelection")
            .field("classifier", &self.classifier.name())
            .field("requested", &self.requested)
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

/// Pick the classifier for this run. Never fails: an unavailable real
/// classifier degrades to [`MockClassifier`] with a warning.
pub fn select_classifier(config: &ModelConfig, seed: u64) -> ClassifierSelection {
    let requested = config.classifier;
    let selection = match requested {
        ClassifierKind::Mock => ClassifierSelection {
            classifier: Box::new(MockClassifier::new(seed)),
            requested,
            fallback_reason: None,
        },
        ClassifierKind::Auto | ClassifierKind::Knn => real_classifier(config, seed, requested),
    };
    info!(
        classifier = selection.classifier.name(),
        ?requested,
        "classifier selected"
    );
    selection
}

#[cfg(feature = "knn")]
fn real_classifier(config: &ModelConfig, _seed: u64, requested: ClassifierKind) -> ClassifierSelection {
    ClassifierSelection {
        classifier: Box::new(super::knn::NearestNeighborClassifier::new(config.neighbors)),
        requested,
        fallback_reason: None,
    }
}

#[cfg(not(feature = "knn"))]
fn real_classifier(_config: &ModelConfig, seed: u64, requested: ClassifierKind) -> ClassifierSelection {
    let reason = "nearest-neighbour classifier not compiled in (enable the `knn` feature)".to_string();
    tracing::warn!("{reason}; falling back to the mock classifier");
    ClassifierSelection {
        classifier: Box::new(MockClassifier::new(seed)),
        requested,
        fallback_reason: Some(reason),
    }
}
