//! Source spans and the diagnostics collected across every pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A byte-offset range into the original source buffer.
///
/// Carried by every [`crate::token::Token`] and every
/// [`crate::ast::Node`] so later passes can report precise locations
/// without re-lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One entry accumulated by the [`Diagnostics`] collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }
}

/// Accumulates diagnostics across passes. Every pass that can degrade
/// gracefully (an unresolved import, an unused local, a widened type)
/// pushes here instead of failing the compilation outright.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn warn(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::warning(message, span));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Renders source text with a caret under each diagnostic's span,
    /// matching the human-readable format the driver is expected to print.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for d in &self.entries {
            let tag = match d.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            out.push_str(&format!("{tag}: {}\n", d.message));
            if let Some(span) = d.span {
                let line_start = source[..span.start as usize]
                    .rfind('\n')
                    .map_or(0, |i| i + 1);
                let line_end = source[span.start as usize..]
                    .find('\n')
                    .map_or(source.len(), |i| span.start as usize + i);
                let line = &source[line_start..line_end];
                let caret_col = span.start as usize - line_start;
                out.push_str(&format!("  {line}\n"));
                out.push_str(&format!("  {}^\n", " ".repeat(caret_col)));
            }
        }
        out
    }
}
