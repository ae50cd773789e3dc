// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use itertools::Itertools;

use crate::ChainError;

/// Severity of a collected diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Which part of the build produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Discovery,
    Rule,
    RuleViolation,
    Connection,
    AddressSpace,
    ModuleNotFound,
    Validation,
}

/// A single message collected during one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Dotted path of the affected object, e.g. `filter_0.data_in`.
    pub subject: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{}: {}: {}", self.severity, subject, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Collector for the diagnostics of a single build.
///
/// One instance is created per `auto_connect` call and threaded through the
/// resolution pass by mutable reference. Entries keep their insertion order,
/// so two builds of the same chain report identical lists.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and mirrors it to the `log` facade.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Note => log::info!("{diagnostic}"),
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Error => {
                log::error!("{diagnostic}");
                self.error_count += 1;
            }
        }
        self.entries.push(diagnostic);
    }

    pub(crate) fn push(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        subject: Option<String>,
        message: impl Into<String>,
    ) {
        self.emit(Diagnostic {
            severity,
            kind,
            subject,
            message: message.into(),
        });
    }

    pub(crate) fn note(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Note, kind, Some(subject.into()), message);
    }

    pub(crate) fn warning(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Warning, kind, Some(subject.into()), message);
    }

    pub(crate) fn error(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, kind, Some(subject.into()), message);
    }

    /// Records a `ChainError` with the severity it carries.
    pub(crate) fn record(&mut self, error: &ChainError) {
        self.push(error.severity(), error.kind(), error.subject(), error.to_string());
    }

    /// Returns `true` once any `Error`-severity entry has been collected.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    /// Renders every entry grouped by severity, errors first. Within a group
    /// the collection order is preserved.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for severity in [Severity::Error, Severity::Warning, Severity::Note] {
            let group = self.with_severity(severity).collect::<Vec<_>>();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("{} {}(s):\n", group.len(), severity));
            out.push_str(&group.iter().map(|d| format!("  {d}")).join("\n"));
            out.push('\n');
        }
        out
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
