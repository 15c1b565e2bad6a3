//! Recoverable conditions raised while building a plot.
//!
//! Every entry is also emitted as a `tracing` warning so hosts that only wire a
//! subscriber still see them; the collected list is returned with the plot.

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A path resolved against none of the documents, or a companion path
    /// missed in documents that supplied values.
    ResolutionMiss,
    /// Values, errors, labels or paired axes disagree in length.
    ShapeMismatch,
    /// A resolved scale was zero or non-finite and replaced by `1`.
    ScaleDegenerate,
    /// Configuration input was dropped or replaced by a default.
    ConfigAdjusted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Path or parameter the diagnostic is about.
    pub subject: String,
    pub message: String,
    /// Results file of the configuration being processed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_file: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    results_file: Option<String>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps every entry pushed from now on with `results_file`.
    #[must_use]
    pub fn with_results_file(mut self, results_file: impl Into<String>) -> Self {
        self.results_file = Some(results_file.into());
        self
    }

    #[must_use]
    pub fn results_file(&self) -> Option<&str> {
        self.results_file.as_deref()
    }

    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let subject = subject.into();
        let message = message.into();
        warn!(
            kind = ?kind,
            subject = %subject,
            results_file = self.results_file.as_deref().unwrap_or_default(),
            "{message}"
        );
        self.entries.push(Diagnostic {
            kind,
            subject,
            message,
            results_file: self.results_file.clone(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// Adopts entries that were already reported.
impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        Self {
            entries,
            results_file: None,
        }
    }
}
