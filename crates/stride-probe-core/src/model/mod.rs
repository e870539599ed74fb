//! Classifiers and their evaluation.
//!
//! - [`Classifier`] is the strategy seam; [`select_classifier`] picks the
//!   implementation once per run.
//! - [`Evaluator`] runs a stratified holdout plus stratified k-fold
//!   cross-validation and returns [`EvaluationResults`].

mod classifier;
mod evaluator;
#[cfg(feature = "knn")]
mod knn;
mod metrics;
mod split;

pub use classifier::{select_classifier, Classifier, ClassifierKind, ClassifierSelection, MockClassifier};
pub use evaluator::{EvaluationResults, EvaluationSettings, Evaluator};
#[cfg(feature = "knn")]
pub use knn::NearestNeighborClassifier;
pub use metrics::{accuracy, classification_report, mean_std, ClassMetrics, ClassificationReport};
pub use split::{stratified_holdout, stratified_k_fold, HoldoutSplit};
