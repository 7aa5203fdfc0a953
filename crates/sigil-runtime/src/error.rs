//! Runtime error types.

use sigil_engine::EmitError;

use crate::validator::ValidationResult;

/// Errors raised by a schema that is itself inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Phase two of the build has not run for this schema
    #[error("Schema `{name}` is not constructed")]
    NotConstructed { name: String },

    /// A model reference that names no registered model
    #[error("Unknown model `{name}`")]
    UnknownModel { name: String },

    /// An attribute listed on a model without a registered schema
    #[error("Model `{owner}` has no schema for attribute `{name}`")]
    MissingAttribute { owner: String, name: String },

    /// `Unresolved` reached validator construction
    #[error("Unresolved type in `{declaration}`")]
    UnresolvedType { declaration: String },

    /// A constraint option that cannot be used
    #[error("Invalid option `{option}` on `{declaration}`: {reason}")]
    InvalidOption {
        declaration: String,
        option: String,
        reason: String,
    },

    /// The store owning a schema was dropped
    #[error("Metadata store is no longer alive")]
    StoreDropped,
}

/// Errors applying or recording attribute changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChangeError {
    /// An array primitive used on a non-array value
    #[error("Attribute `{attribute}` does not hold an array")]
    NotAnArray { attribute: String },

    /// A change path that does not address the value
    #[error("Change path `{path}` does not address the value")]
    InvalidPath { path: String },

    /// Positional write past the end of an array
    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while loading declarations or driving models.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Emitting metadata for a source failed
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// An annotation call without an emitted payload
    #[error("Declaration `{declaration}` carries no emitted metadata")]
    MissingMetadata { declaration: String },

    /// An emitted payload that does not parse, or parses as the wrong record
    #[error("Invalid metadata on `{declaration}`: {reason}")]
    InvalidMetadata { declaration: String, reason: String },

    /// Schema error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Change log error
    #[error(transparent)]
    Change(#[from] ChangeError),

    #[error("Unknown model `{0}`")]
    UnknownModel(String),

    #[error("Model `{0}` is abstract and cannot be instantiated")]
    AbstractModel(String),

    #[error("Model `{model}` has no attribute `{name}`")]
    UnknownAttribute { model: String, name: String },

    #[error("Model `{model}` has no action `{name}`")]
    UnknownAction { model: String, name: String },

    /// A value rejected before it reached a collaborator
    #[error("Validation failed with {} issue(s)", .0.errors.len())]
    Validation(ValidationResult),

    /// Failure reported by a repository or transport
    #[error("Collaborator error: {0}")]
    Collaborator(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SchemaError::MissingAttribute {
            owner: "User".into(),
            name: "email".into(),
        };
        assert_eq!(err.to_string(), "Model `User` has no schema for attribute `email`");

        let err: RuntimeError = ChangeError::IndexOutOfBounds { index: 4, len: 2 }.into();
        assert_eq!(err.to_string(), "Index 4 is out of bounds for length 2");
    }
}
