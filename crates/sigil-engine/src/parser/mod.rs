//! Sigil parser - Lexer and parser for declaration sources.
//!
//! This module provides lexical analysis (tokenization) and syntactic
//! analysis (parsing) for the TypeScript-flavoured declaration language in
//! which models, attributes and custom types are written.
//!
//! # Example
//!
//! ```ignore
//! use sigil_engine::parser::Parser;
//!
//! let source = r#"
//!     @Model()
//!     export class User extends BaseModel {
//!         @Attr() name!: string;
//!     }
//! "#;
//!
//! let parser = Parser::new(source).unwrap();
//! match parser.parse() {
//!     Ok((module, _interner)) => println!("{} statements", module.len()),
//!     Err(errors) => {
//!         for err in errors {
//!             eprintln!("{}", err);
//!         }
//!     }
//! }
//! ```

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod interner;

// Re-exports for convenience
pub use token::{Token, Span};
pub use lexer::{Lexer, LexError};
pub use parser::{Parser, ParseError, ParseErrorKind};
pub use interner::{Interner, Symbol};
