//! Compiler error type.

use serde::Serialize;
use thiserror::Error;

use crate::span::Span;

/// An error from any stage of the pipeline, tagged with the source
/// span it points at.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileError {
    #[error("lex error: {message}")]
    Lex { message: String, span: Span },
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Span },
    #[error("codegen error: {message}")]
    Codegen { message: String, span: Span },
}

impl CompileError {
    /// Stage name, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex { .. } => "lex",
            CompileError::Syntax { .. } => "syntax",
            CompileError::Codegen { .. } => "codegen",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Lex { span, .. }
            | CompileError::Syntax { span, .. }
            | CompileError::Codegen { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lex { message, .. }
            | CompileError::Syntax { message, .. }
            | CompileError::Codegen { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err = CompileError::Syntax { message: "unexpected token".into(), span: Span::empty(0) };
        assert_eq!(err.kind(), "syntax");
        assert_eq!(err.to_string(), "syntax error: unexpected token");
    }
}
