//! The probe run: resolve data, build and select features, evaluate, report.

use std::io::Write;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::energy::select_features;
use crate::error::{CoreError, EvaluationError, Result};
use crate::model::{Classifier, EvaluationResults, EvaluationSettings, Evaluator};
use crate::report::{render_results, rule, Verdict};
use crate::source::{DataResolver, DataSource};
use crate::storage::Config;

const TITLE: &str = "Stride Energy Probe - Energy Level Prediction";

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub source: DataSource,
    pub results: EvaluationResults,
    pub verdict: Verdict,
}

/// Run the probe once, writing the human-readable report to `out`.
///
/// Evaluation errors from selection or training are printed to `out` as
/// `Error: ...` before being returned. Any other error is returned unprinted
/// for the caller to report.
pub fn run_probe(
    config: &Config,
    classifier: &mut dyn Classifier,
    today: NaiveDate,
    out: &mut dyn Write,
) -> Result<ProbeOutcome> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "{TITLE}")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out)?;

    let settings = EvaluationSettings::from(&config.evaluation);
    let data = DataResolver::new(&config.data, settings.min_samples, settings.seed, today)
        .resolve(out)?;

    let set = match select_features(&data.frame) {
        Ok(set) if !set.is_empty() => set,
        Ok(_) => {
            return Err(report_failure(
                out,
                EvaluationError::InsufficientSamples {
                    samples: 0,
                    required: settings.min_samples,
                }
                .into(),
                "Could not prepare features. Exiting.",
            ));
        }
        Err(e @ CoreError::Evaluation(_)) => {
            writeln!(out, "{e}")?;
            return Err(report_failure(out, e, "Could not prepare features. Exiting."));
        }
        Err(e) => return Err(e),
    };

    writeln!(out)?;
    writeln!(out, "{}", rule('-'))?;
    writeln!(out, "Evaluating classifier")?;
    writeln!(out, "{}", rule('-'))?;
    if classifier.is_placeholder() {
        writeln!(out, "Using mock classifier (real classifier not available)")?;
    } else {
        writeln!(out, "Using {} classifier", classifier.name())?;
    }

    let results = match Evaluator::new(settings).evaluate(&set, classifier) {
        Ok(results) => results,
        Err(CoreError::Evaluation(e)) => {
            let message = e.to_string();
            return Err(report_failure(out, e.into(), &message));
        }
        Err(e) => return Err(e),
    };

    writeln!(out)?;
    writeln!(
        out,
        "Dataset: {} samples ({} train, {} test)",
        results.samples, results.train_size, results.test_size
    )?;
    writeln!(out, "Features: {}", results.features)?;
    writeln!(out, "Classes: {:?}", results.classes)?;
    if let Ok(json) = serde_json::to_string(&results) {
        debug!(results = %json, "evaluation results");
    }

    let verdict = render_results(&results, out)?;
    Ok(ProbeOutcome {
        source: data.source,
        results,
        verdict,
    })
}

/// Print `Error: {message}` and hand the error back. A failed write wins.
fn report_failure(out: &mut dyn Write, err: CoreError, message: &str) -> CoreError {
    error!(%err, "probe aborted");
    match writeln!(out).and_then(|_| writeln!(out, "Error: {message}")) {
        Ok(()) => err,
        Err(io) => io.into(),
    }
}
