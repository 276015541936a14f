use serde::Serialize;

use super::error::DiagnosticError;

/// Coarse classification of a verdict label, used to color the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Fault,
    Indeterminate,
}

/// Canonical outcome of one diagnostic attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    /// Display label, first character uppercased.
    pub label: String,

    /// Confidence ready for display (`"87.3%"`), or empty.
    pub confidence_display: String,

    /// Response text exactly as received (empty when no response arrived).
    pub raw: String,

    /// Model score, when the server profile reports one.
    pub score: Option<f64>,

    /// Failure kind, `None` for a successfully interpreted verdict.
    #[serde(skip)]
    pub error: Option<DiagnosticError>,
}

impl DiagnosticResult {
    pub fn diagnosed(label: String, confidence_display: String, raw: &str) -> Self {
        Self {
            label,
            confidence_display,
            raw: raw.to_string(),
            score: None,
            error: None,
        }
    }

    /// Result for a stage that failed before a verdict was available.
    pub fn from_error(error: DiagnosticError) -> Self {
        Self {
            label: error.status_text(),
            confidence_display: String::new(),
            raw: String::new(),
            score: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Classify the label. A score, when present, takes precedence.
    pub fn verdict(&self) -> Verdict {
        if self.error.is_some() {
            return Verdict::Indeterminate;
        }
        if let Some(score) = self.score {
            return if score > 0.5 { Verdict::Fault } else { Verdict::Normal };
        }
        let label = self.label.to_lowercase();
        // "abnormal" contains "normal", so faults are checked first.
        if label.contains("fault") || label.contains("abnormal") {
            Verdict::Fault
        } else if label.contains("normal") {
            Verdict::Normal
        } else {
            Verdict::Indeterminate
        }
    }
}
