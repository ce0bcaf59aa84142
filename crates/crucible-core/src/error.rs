//! Error kinds for every compiler pass (spec §7).

use crate::span::Span;
use std::fmt;
use thiserror::Error;

/// The seven error kinds a pass can fail with.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("malformed token: {0}")]
    LexError(String),

    #[error("grammar violation: {0}")]
    ParseError(String),

    #[error("module not found: {0}")]
    ImportError(String),

    #[error("semantic error: {0}")]
    SemanticError(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("unsupported construct: {0}")]
    UnsupportedError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// A single pass's failure, carrying the kind, an optional source span,
/// and any context frames accumulated while the error propagated upward.
///
/// Every pass either completes or returns this with a span; no pass
/// catches and swallows an error from the pass before it.
#[derive(Debug)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub context: Vec<String>,
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl CompileError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            span: None,
            context: Vec::new(),
        }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        for (i, ctx) in self.context.iter().enumerate() {
            write!(f, "\n  {}. {ctx}", i + 1)?;
        }
        Ok(())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Extension trait mirroring `anyhow::Context` for pass-local results,
/// so a pass can annotate an error on its way out without having to
/// construct a `CompileError` by hand at every call site.
pub trait ResultExt<T> {
    fn ctx(self, message: impl Into<String>) -> CompileResult<T>;
}

impl<T> ResultExt<T> for CompileResult<T> {
    fn ctx(self, message: impl Into<String>) -> CompileResult<T> {
        self.map_err(|e| e.with_context(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_span_and_context() {
        let err = CompileError::at(
            ErrorKind::UnsupportedError("yield from".into()),
            Span::new(10, 20),
        )
        .with_context("in function 'gen'");

        let rendered = format!("{err}");
        assert!(rendered.contains("yield from"));
        assert!(rendered.contains("10..20"));
        assert!(rendered.contains("in function 'gen'"));
    }

    #[test]
    fn new_error_has_no_span_or_context() {
        let err = CompileError::new(ErrorKind::ParseError("unexpected EOF".into()));
        assert!(err.span.is_none());
        assert!(err.context.is_empty());
    }
}
