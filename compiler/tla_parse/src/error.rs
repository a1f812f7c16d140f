//! The reportable parse failure value.

use thiserror::Error;
use tla_diagnostic::{Diagnostic, ErrorCode};
use tla_ir::Span;

/// Terminal failure of a top-level parse.
///
/// Carries the furthest-advanced failure recorded across the whole attempt:
/// many shallower alternatives were tried and abandoned, but the deepest
/// point is the most plausible location of the actual mistake. A failure is
/// fatal to its compilation unit; it is never coerced into an AST node.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("parse failure at {}: expected {expected}", .span.start)]
pub struct ParseFailure {
    /// Where the deepest failure occurred.
    pub span: Span,
    /// What the parser expected there.
    pub expected: String,
    /// Which failure class was hit.
    pub code: ErrorCode,
}

impl ParseFailure {
    /// Convert to a diagnostic for reporting.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code)
            .with_message(format!("expected {}", self.expected))
            .with_label(self.span, self.code.description())
    }
}
