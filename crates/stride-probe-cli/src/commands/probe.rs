//! The probe run: configuration, classifier selection, pipeline.

use std::io::{self, Write};

use chrono::Local;
use tracing::{info, warn};

use stride_probe_core::{run_probe, select_classifier, Config, CoreError};

/// Load configuration, pick the classifier once and run the probe on stdout.
pub fn run() -> Result<(), CoreError> {
    let config = Config::load()?;
    info!(db_path = %config.data.db_path.display(), "configuration loaded");

    let mut selection = select_classifier(&config.model, config.evaluation.seed);
    if let Some(reason) = &selection.fallback_reason {
        warn!(%reason, "real classifier unavailable");
        println!("Warning: {reason}. Using mock classifier for demo.");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = run_probe(
        &config,
        selection.classifier.as_mut(),
        Local::now().date_naive(),
        &mut out,
    )?;
    out.flush()?;

    info!(
        verdict = outcome.verdict.label(),
        synthetic = outcome.source.is_synthetic(),
        "probe finished"
    );
    Ok(())
}
