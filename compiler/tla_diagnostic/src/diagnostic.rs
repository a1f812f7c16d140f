use std::fmt;

use tla_ir::Span;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A labeled span with a message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    /// Create a primary label (the main error location).
    pub fn primary(span: Span, message: impl Into<String>) -> Label {
        Label {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a secondary label (related context).
    pub fn secondary(span: Span, message: impl Into<String>) -> Label {
        Label {
            span,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// A diagnostic with the context needed for useful error messages.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    /// Severity level.
    pub severity: Severity,
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Create an error-severity diagnostic for the given code.
    pub fn error(code: ErrorCode) -> Diagnostic {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: String::new(),
            labels: Vec::new(),
        }
    }

    /// Set the main message.
    pub fn with_message(mut self, message: impl Into<String>) -> Diagnostic {
        self.message = message.into();
        self
    }

    /// Attach a primary label.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Diagnostic {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Attach a secondary label.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Diagnostic {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// The primary span, if any label was attached.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|l| l.is_primary)
            .or_else(|| self.labels.first())
            .map(|l| l.span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        for label in &self.labels {
            write!(f, "\n  --> {}: {}", label.span, label.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tla_ir::{Pos, Span};

    fn span() -> Span {
        Span::new(
            Pos {
                offset: 4,
                line: 2,
                column: 1,
            },
            Pos {
                offset: 6,
                line: 2,
                column: 3,
            },
        )
    }

    #[test]
    fn builder_collects_labels() {
        let diag = Diagnostic::error(ErrorCode::E1001)
            .with_message("expected `THEN`")
            .with_label(span(), "here");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.primary_span(), Some(span()));
    }

    #[test]
    fn display_includes_code_and_location() {
        let diag = Diagnostic::error(ErrorCode::E1002)
            .with_message("token below minimum column")
            .with_label(span(), "expected content at or beyond column 3");
        let rendered = diag.to_string();
        assert_eq!(
            rendered,
            "error[E1002]: token below minimum column\n  --> 2:1: expected content at or beyond column 3"
        );
    }
}
