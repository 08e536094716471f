//! Diagnostics for non-fatal conditions.
//!
//! Parse failures are hard errors; everything else (a path that matched
//! nothing, a value shape the target element cannot take, a removal that
//! found nothing) is reported through a caller-supplied [`DiagnosticSink`]
//! so a batch of edits keeps going instead of aborting.

use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal condition raised during locate/mutate operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A path query matched no element.
    PathNotFound {
        /// The path as the caller wrote it.
        path: String,
        /// The rewritten form, when the original lacked a `/`/`//` prefix.
        rewritten: Option<String>,
        /// Deepest partial match consumed before the search gave up,
        /// rendered as a tag chain (empty when nothing matched at all).
        longest_match: String,
    },

    /// `set` was given a value whose shape the target cannot take.
    /// The offending key is skipped; sibling keys are still processed.
    UnsupportedShape {
        key: String,
        element: String,
        message: String,
    },

    /// `remove` matched nothing.
    RemovalNotFound { path: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::PathNotFound { .. } | Diagnostic::RemovalNotFound { .. } => {
                Severity::Warning
            }
            Diagnostic::UnsupportedShape { .. } => Severity::Error,
        }
    }

    /// Render for display. `names` is an optional lookup that maps domain
    /// identifiers appearing in paths to human-readable names.
    pub fn render(&self, names: Option<&dyn SymbolNames>) -> String {
        let decorate = |raw: &str| -> String {
            match names.and_then(|n| n.display_name(raw)) {
                Some(pretty) => format!("{raw} ({pretty})"),
                None => raw.to_string(),
            }
        };
        match self {
            Diagnostic::PathNotFound {
                path,
                rewritten,
                longest_match,
            } => {
                let mut msg = format!("no element matches path {}", decorate(path));
                if let Some(rewritten) = rewritten {
                    msg.push_str(&format!(" (interpreted as {rewritten})"));
                }
                if !longest_match.is_empty() {
                    msg.push_str(&format!("; deepest partial match: {longest_match}"));
                }
                msg
            }
            Diagnostic::UnsupportedShape {
                key,
                element,
                message,
            } => {
                format!("cannot set '{key}' on <{element}>: {message}")
            }
            Diagnostic::RemovalNotFound { path } => {
                format!("nothing to remove at {}", decorate(path))
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(None))
    }
}

/// Injectable lookup from domain identifiers to human-readable names,
/// consumed only when rendering diagnostics. The surrounding toolkit keeps
/// a registry of these; the core only needs the seam.
pub trait SymbolNames {
    fn display_name(&self, id: &str) -> Option<String>;
}

/// Receives diagnostics as they are raised.
pub trait DiagnosticSink {
    fn report(&mut self, diag: Diagnostic);
}

/// Collects diagnostics into a vector for later inspection.
#[derive(Debug, Default)]
pub struct CollectedSink {
    pub diags: Vec<Diagnostic>,
}

impl CollectedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity() == Severity::Error)
    }
}

impl DiagnosticSink for CollectedSink {
    fn report(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }
}

/// Discards every diagnostic.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diag: Diagnostic) {}
}
