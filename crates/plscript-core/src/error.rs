//! Unified error type for routine compilation.
//!
//! Every failure path in the compiler surfaces as a [`CompileError`]. The
//! variants form a fixed taxonomy:
//!
//! ```text
//! CompileError
//! ├── Syntax             - malformed source text (always positioned)
//! ├── Definition         - undefined/shell type, relation, column, condition
//! ├── UnsupportedType    - pseudo-type used as a concrete type
//! ├── InvalidDefinition  - structurally invalid routine definition
//! ├── InvalidUsage       - trigger-only types used outside trigger context
//! ├── DuplicateName      - repeated parameter/variable name in one scope
//! ├── AmbiguousReference - a variable and a column both resolve
//! ├── UndefinedField     - record-qualified field not found
//! ├── Internal           - grammar/contract violation, not user-recoverable
//! └── WithContext        - any of the above, wrapped with routine and line
//! ```
//!
//! Errors abort the compile session outright; there is no recovery or retry
//! inside the compiler. The caller decides whether to surface the message
//! verbatim or suppress it (e.g. best-effort validation).

use thiserror::Error;

use crate::Span;

/// Errors raised while compiling a routine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Malformed source text, reported with its position.
    #[error("syntax error at {span}: {message}")]
    Syntax { message: String, span: Span },

    /// A referenced object (type, relation, column, exception condition)
    /// does not exist or is only a shell.
    #[error("{message}")]
    Definition { message: String },

    /// A pseudo-type was used where a concrete variable, parameter or return
    /// type is required.
    #[error("{message}")]
    UnsupportedType { message: String },

    /// The routine definition itself is structurally invalid.
    #[error("{message}")]
    InvalidDefinition {
        message: String,
        hint: Option<String>,
    },

    /// A construct was used outside its only valid context.
    #[error("{message}")]
    InvalidUsage { message: String },

    /// The same name was declared twice in one scope.
    #[error("parameter name \"{name}\" used more than once")]
    DuplicateName { name: String },

    /// An identifier matches both a routine variable and a table column.
    #[error("column reference \"{name}\" is ambiguous")]
    AmbiguousReference {
        name: String,
        detail: String,
        span: Span,
    },

    /// A record-qualified field name could not be resolved. The usual cause
    /// is a field name that lexes as a reserved keyword, so the message
    /// points at quoting.
    #[error("record \"{record}\" has no field \"{field}\"")]
    UndefinedField {
        record: String,
        field: String,
        span: Span,
    },

    /// The external grammar violated its contract. Indicates a defect, not
    /// bad user input.
    #[error("internal error: {message}")]
    Internal { message: String },

    /// An error wrapped with the compile context it occurred in.
    #[error("compilation of function \"{routine}\" near line {line}: {source}")]
    WithContext {
        routine: String,
        line: u32,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Shorthand for a positioned syntax error.
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        CompileError::Syntax {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        CompileError::Definition {
            message: message.into(),
        }
    }

    /// Shorthand for an internal contract violation.
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    /// Wrap this error with the routine name and nearest source line.
    ///
    /// An error that already carries context is returned unchanged; the
    /// innermost context is the most precise one.
    pub fn with_context(self, routine: &str, line: u32) -> Self {
        match self {
            err @ CompileError::WithContext { .. } => err,
            err => CompileError::WithContext {
                routine: routine.to_string(),
                line,
                source: Box::new(err),
            },
        }
    }

    /// The source position this error refers to, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Syntax { span, .. } => Some(*span),
            CompileError::AmbiguousReference { span, .. } => Some(*span),
            CompileError::UndefinedField { span, .. } => Some(*span),
            CompileError::WithContext { source, .. } => source.span(),
            _ => None,
        }
    }

    /// A usage hint suitable for appending to the error report.
    pub fn hint(&self) -> Option<&str> {
        match self {
            CompileError::InvalidDefinition { hint, .. } => hint.as_deref(),
            CompileError::UndefinedField { .. } => {
                Some("If the field name is a reserved key word, use double quotes to quote it.")
            }
            CompileError::AmbiguousReference { detail, .. } => Some(detail),
            CompileError::WithContext { source, .. } => source.hint(),
            _ => None,
        }
    }

    /// Strip any context wrapper, exposing the underlying error.
    pub fn root(&self) -> &CompileError {
        match self {
            CompileError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_once() {
        let err = CompileError::definition("type \"mood\" is only a shell")
            .with_context("f", 3)
            .with_context("g", 9);

        match &err {
            CompileError::WithContext { routine, line, .. } => {
                assert_eq!(routine, "f");
                assert_eq!(*line, 3);
            }
            other => panic!("expected context wrapper, got {other:?}"),
        }
        assert!(matches!(err.root(), CompileError::Definition { .. }));
    }

    #[test]
    fn span_passes_through_context() {
        let err = CompileError::syntax("unexpected token", Span::new(2, 7, 3)).with_context("f", 2);
        assert_eq!(err.span(), Some(Span::new(2, 7, 3)));
    }

    #[test]
    fn undefined_field_hints_at_quoting() {
        let err = CompileError::UndefinedField {
            record: "r".into(),
            field: "select".into(),
            span: Span::default(),
        };
        assert!(err.hint().unwrap().contains("double quotes"));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = CompileError::DuplicateName { name: "x".into() };
        assert_eq!(err.to_string(), "parameter name \"x\" used more than once");
    }
}
