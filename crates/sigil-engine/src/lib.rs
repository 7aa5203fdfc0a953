//! Sigil Engine
//!
//! This crate turns annotated declaration sources into embedded schema
//! metadata:
//! - **Parser**: Lexer, interner, and declaration parser (`parser` module)
//! - **Classifier**: Rule-driven reduction of type expressions to
//!   [`MetadataType`] trees (`classifier` module)
//! - **Emitter**: Per-declaration metadata records and decorator rewriting
//!   (`emitter` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_engine::{emit_source, EngineConfig};
//!
//! let source = r#"
//!     @Model()
//!     class User {
//!         @Attr() name: string;
//!         @Attr() tags?: string[];
//!     }
//! "#;
//!
//! let (rewritten, units) = emit_source("user.ts", source, &EngineConfig::default())?;
//! assert_eq!(units.len(), 3);
//! assert!(rewritten.contains(r#"@Attr('{"name":"name""#));
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::needless_return)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: Lexer, interner, AST, and parser
pub mod parser;

/// Type classification: rules, contexts, and the program symbol table
pub mod classifier;

/// Metadata emission and decorator rewriting
pub mod emitter;

/// Metadata data model and JSON wire format
pub mod metadata;

/// Engine configuration
pub mod config;

/// Engine error types
pub mod error;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{
    // Lexer
    Lexer, LexError, Token, Span,
    // Parser
    Parser, ParseError, ParseErrorKind,
    // Interner
    Interner, Symbol,
    // AST
    ast,
};

pub use classifier::{Classifier, Program, Rule, Target};
pub use config::EngineConfig;
pub use emitter::{apply_edits, emit_source, Edit, EmittedUnit, Emitter};
pub use error::{AuthoringError, EmitError};
pub use metadata::{
    ActionMetadata, AttrMetadata, DeclarationKind, LiteralKind, Metadata, MetadataType,
    ModelMetadata, PrimitiveName,
};
