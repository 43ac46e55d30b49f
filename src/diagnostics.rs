//! Per-file diagnostics store.
//!
//! Diagnostics never interrupt a scan. Each entry belongs to the phase that
//! produced it so that re-scanning a file and re-running the binder pass
//! each replace only their own messages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// The naming resolver fell back to a default type.
    AmbiguousIdentity,
    /// The base name was longer than a system name and got truncated.
    NameTooLong,
    /// A directive named something that cannot be pinned to one identity.
    UnresolvedReference,
    /// A directive could not be parsed at all.
    MalformedDirective,
    /// A binder source has no service program to attach its exports to.
    UnmatchedBinderTarget,
}

/// One message about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        path: impl Into<PathBuf>,
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            severity,
            kind,
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        match self.line {
            Some(line) => write!(
                f,
                "{}:{}: {}: {}",
                self.path.display(),
                line,
                severity,
                self.message
            ),
            None => write!(f, "{}: {}: {}", self.path.display(), severity, self.message),
        }
    }
}

/// Which pass produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Scan,
    Binding,
}

#[derive(Debug, Clone)]
struct Entry {
    phase: Phase,
    diagnostic: Diagnostic,
}

/// Diagnostics keyed by relative source path.
#[derive(Debug, Default)]
pub struct DiagnosticsLog {
    entries: Mutex<HashMap<PathBuf, Vec<Entry>>>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything recorded for `path` with a fresh scan's messages.
    pub(crate) fn replace_scan(&self, path: &Path, diagnostics: Vec<Diagnostic>) {
        for d in &diagnostics {
            trace_diagnostic(d);
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if diagnostics.is_empty() {
            entries.remove(path);
            return;
        }
        entries.insert(
            path.to_path_buf(),
            diagnostics
                .into_iter()
                .map(|diagnostic| Entry {
                    phase: Phase::Scan,
                    diagnostic,
                })
                .collect(),
        );
    }

    /// Drop every binding-phase message and record a new set.
    pub(crate) fn replace_binding(&self, diagnostics: Vec<Diagnostic>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for list in entries.values_mut() {
            list.retain(|e| e.phase != Phase::Binding);
        }
        entries.retain(|_, list| !list.is_empty());

        for diagnostic in diagnostics {
            trace_diagnostic(&diagnostic);
            entries
                .entry(diagnostic.path.clone())
                .or_default()
                .push(Entry {
                    phase: Phase::Binding,
                    diagnostic,
                });
        }
    }

    /// Forget a path entirely.
    pub fn clear(&self, path: &Path) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(path);
    }

    /// Messages for one path, scan phase first.
    pub fn logs_for(&self, path: &Path) -> Vec<Diagnostic> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(path)
            .map(|list| list.iter().map(|e| e.diagnostic.clone()).collect())
            .unwrap_or_default()
    }

    /// Every message, sorted by path then line.
    pub fn all(&self) -> Vec<Diagnostic> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Diagnostic> = entries
            .values()
            .flatten()
            .map(|e| e.diagnostic.clone())
            .collect();
        all.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
        all
    }

    pub fn is_empty(&self) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.is_empty()
    }
}

fn trace_diagnostic(d: &Diagnostic) {
    match d.severity {
        Severity::Info => debug!(path = %d.path.display(), line = ?d.line, kind = ?d.kind, "{}", d.message),
        Severity::Warning => {
            warn!(path = %d.path.display(), line = ?d.line, kind = ?d.kind, "{}", d.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(path: &str, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic::new(path, Severity::Warning, kind, "something")
    }

    #[test]
    fn test_replace_scan_overwrites() {
        let log = DiagnosticsLog::new();
        log.replace_scan(
            Path::new("a.rpgle"),
            vec![
                diag("a.rpgle", DiagnosticKind::MalformedDirective),
                diag("a.rpgle", DiagnosticKind::UnresolvedReference),
            ],
        );
        assert_eq!(log.logs_for(Path::new("a.rpgle")).len(), 2);

        log.replace_scan(Path::new("a.rpgle"), vec![]);
        assert!(log.logs_for(Path::new("a.rpgle")).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_binding_phase_is_replaced_separately() {
        let log = DiagnosticsLog::new();
        log.replace_scan(
            Path::new("srva.bnd"),
            vec![diag("srva.bnd", DiagnosticKind::MalformedDirective)],
        );
        log.replace_binding(vec![diag("srva.bnd", DiagnosticKind::UnresolvedReference)]);
        assert_eq!(log.logs_for(Path::new("srva.bnd")).len(), 2);

        log.replace_binding(vec![diag("srva.bnd", DiagnosticKind::UnresolvedReference)]);
        assert_eq!(log.logs_for(Path::new("srva.bnd")).len(), 2, "no duplicates");

        log.replace_binding(vec![]);
        let left = log.logs_for(Path::new("srva.bnd"));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, DiagnosticKind::MalformedDirective);
    }

    #[test]
    fn test_display() {
        let d = diag("q/a.rpgle", DiagnosticKind::MalformedDirective).at_line(3);
        assert_eq!(d.to_string(), "q/a.rpgle:3: warning: something");
    }
}
