//! Abstract Syntax Tree (AST) for Sigil declaration sources.
//!
//! This module defines the AST for declaration sources:
//! - Module structure and top-level declarations (imports, classes,
//!   interfaces, type aliases)
//! - Type expressions
//! - Expressions used in decorator arguments and field initializers
//!
//! Every AST node includes a `Span` for precise source location tracking.
//! Method and function bodies are not represented; the parser skips them.

use crate::parser::interner::Symbol;
use crate::parser::token::Span;

pub mod expression;
pub mod statement;
pub mod types;

pub use expression::*;
pub use statement::*;
pub use types::*;

/// Root node: a declaration source file
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Top-level statements (declarations, imports, skipped code)
    pub statements: Vec<Statement>,

    /// Span covering the entire module
    pub span: Span,
}

impl Module {
    /// Create a new module
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Self { statements, span }
    }

    /// Check if the module is empty
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Get the number of top-level statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// Identifier
///
/// Represents a name for a class, member, parameter, type, etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: Symbol,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: Symbol, span: Span) -> Self {
        Self { name, span }
    }
}

/// A `/** ... */` documentation comment attached to a declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocComment {
    /// Free text before the first tag, with leading `*` gutters removed
    pub summary: String,
    /// `@tag rest-of-line` entries in source order
    pub tags: Vec<DocTag>,
}

/// A single `@name text` line of a doc comment.
#[derive(Debug, Clone, PartialEq)]
pub struct DocTag {
    pub name: String,
    pub text: String,
}

impl DocComment {
    /// Parse the body of a doc comment (text between `/**` and `*/`).
    pub fn parse(body: &str) -> Self {
        let mut summary = Vec::new();
        let mut tags: Vec<DocTag> = Vec::new();

        for raw_line in body.lines() {
            let line = raw_line.trim();
            let line = line.strip_prefix('*').unwrap_or(line).trim();
            for segment in tag_segments(line) {
                if let Some(tag_line) = segment.strip_prefix('@') {
                    let (name, text) = match tag_line.find(char::is_whitespace) {
                        Some(idx) => (&tag_line[..idx], tag_line[idx..].trim()),
                        None => (tag_line, ""),
                    };
                    tags.push(DocTag {
                        name: name.to_string(),
                        text: text.to_string(),
                    });
                } else if let Some(last) = tags.last_mut() {
                    // Continuation of the previous tag
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(segment);
                } else {
                    summary.push(segment);
                }
            }
        }

        Self {
            summary: summary.join(" "),
            tags,
        }
    }

    /// Check whether a tag with this name is present.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// All tags with this name, in source order.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DocTag> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }
}

/// Split a doc line before every `@tag` that starts the line or follows
/// whitespace, so inline tags such as `Summary. @internal` are found.
fn tag_segments(line: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut previous: Option<char> = None;
    for (idx, c) in line.char_indices() {
        let at_tag = c == '@'
            && previous.map_or(true, char::is_whitespace)
            && line[idx + 1..].starts_with(|next: char| next.is_ascii_alphabetic());
        if at_tag && idx > 0 {
            starts.push(idx);
        }
        previous = Some(c);
    }

    let mut segments = Vec::new();
    let mut begin = 0;
    for start in starts {
        segments.push(line[begin..start].trim());
        begin = start;
    }
    segments.push(line[begin..].trim());
    segments.retain(|segment| !segment.is_empty());
    segments
}
