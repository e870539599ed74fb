//! Console rendering of evaluation results.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::model::EvaluationResults;

pub const PROMISING_THRESHOLD: f64 = 0.6;
pub const MARGINAL_THRESHOLD: f64 = 0.4;

const RULE_WIDTH: usize = 40;

/// Three-tier reading of the cross-validated accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Promising,
    Marginal,
    Weak,
}

impl Verdict {
    /// Strictly above 0.6 is promising, strictly above 0.4 marginal.
    pub fn from_cv_mean(cv_mean: f64) -> Self {
        if cv_mean > PROMISING_THRESHOLD {
            Verdict::Promising
        } else if cv_mean > MARGINAL_THRESHOLD {
            Verdict::Marginal
        } else {
            Verdict::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Promising => "PROMISING",
            Verdict::Marginal => "MARGINAL",
            Verdict::Weak => "WEAK",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Verdict::Promising => "classifier shows predictive power",
            Verdict::Marginal => "Some signal, needs more data/features",
            Verdict::Weak => "Consider alternative approaches",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label(), self.description())
    }
}

/// `0.8125` -> `"81.25%"`.
pub fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// Follow-up suggestions, which depend on whether the scores mean anything.
pub fn next_steps(placeholder: bool) -> [&'static str; 3] {
    if placeholder {
        [
            "Build with the `knn` feature to enable the real classifier",
            "Re-run with the real classifier",
            "Compare against a gradient-boosting baseline",
        ]
    } else {
        [
            "Collect more real energy data (target: 100+ samples)",
            "Add academic event proximity features",
            "Test on goal feasibility prediction",
        ]
    }
}

/// Print the results block, the verdict and the next steps.
pub fn render_results(results: &EvaluationResults, out: &mut dyn Write) -> io::Result<Verdict> {
    let verdict = Verdict::from_cv_mean(results.cv_mean);

    writeln!(out)?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "RESULTS")?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "Samples:     {}", results.samples)?;
    writeln!(out, "Features:    {}", results.features)?;
    writeln!(out, "Classes:     {:?}", results.classes)?;
    writeln!(out, "Classifier:  {}", results.classifier)?;
    writeln!(out)?;
    writeln!(out, "Test Accuracy:  {}", percent(results.accuracy))?;
    writeln!(
        out,
        "CV Accuracy:    {} (+/- {})",
        percent(results.cv_mean),
        percent(results.cv_std)
    )?;
    writeln!(out)?;
    writeln!(out, "Verdict: {verdict}")?;
    writeln!(out)?;
    writeln!(out, "Next steps:")?;
    for (i, step) in next_steps(results.placeholder).iter().enumerate() {
        writeln!(out, "{}. {step}", i + 1)?;
    }
    Ok(verdict)
}
