//! Engine error types.

use crate::metadata::DeclarationKind;
use crate::parser::{LexError, ParseError};

/// Defects in the declared schema itself. Fatal: the declaring module must
/// not load.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthoringError {
    /// A declaration whose type could not be classified
    #[error("Cannot classify type `{type_text}` of {kind} `{declaration}`")]
    UnresolvedType {
        kind: DeclarationKind,
        declaration: String,
        type_text: String,
    },

    /// Classification nested deeper than `max_depth`
    #[error("Type of `{declaration}` nests deeper than {max_depth} levels")]
    DepthExceeded { declaration: String, max_depth: usize },

    /// A type alias that refers back to itself
    #[error("Type alias `{alias}` refers to itself")]
    CircularAlias { alias: String },

    /// A documented custom type whose tags do not match its parameters
    #[error("Invalid custom type `{name}`: {reason}")]
    InvalidCustomType { name: String, reason: String },

    /// A declaration that cannot carry the annotation it has
    #[error("Invalid declaration `{declaration}`: {reason}")]
    InvalidDeclaration { declaration: String, reason: String },
}

/// Errors from emitting metadata for a source file.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Lexer errors
    #[error("Lexer error: {}", join(.0))]
    Lex(Vec<LexError>),

    /// Parse errors
    #[error("Parse error: {}", join(.0))]
    Parse(Vec<ParseError>),

    /// Schema authoring error
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    /// Payload serialization failure
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<LexError>> for EmitError {
    fn from(errors: Vec<LexError>) -> Self {
        EmitError::Lex(errors)
    }
}

impl From<Vec<ParseError>> for EmitError {
    fn from(errors: Vec<ParseError>) -> Self {
        EmitError::Parse(errors)
    }
}
