//! Parser for Sigil declaration sources
//!
//! This module implements a recursive descent parser that transforms the
//! token stream from the lexer into an Abstract Syntax Tree (AST).

pub mod error;
pub mod expr;
pub mod guards;
pub mod recovery;
pub mod stmt;
pub mod types;

use crate::parser::ast::*;
use crate::parser::interner::{Interner, Symbol};
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};
use rustc_hash::FxHashMap;

pub use error::{ParseError, ParseErrorKind};

/// Parser state for declaration sources.
///
/// Recursive descent with arbitrary lookahead; doc comments are lifted out
/// of the token stream and attached to the index of the token that follows
/// them, so grammar rules never see them.
pub struct Parser {
    /// Pre-tokenized input, without doc comments
    tokens: Vec<(Token, Span)>,

    /// Doc comment bodies keyed by the index of the following token
    docs: FxHashMap<usize, Symbol>,

    /// Current position in token stream
    pos: usize,

    /// Current recursion depth
    depth: usize,

    /// Accumulated parse errors (allows continuing after errors)
    errors: Vec<ParseError>,

    interner: Interner,
}

impl Parser {
    /// Create a new parser from source code.
    pub fn new(source: &str) -> Result<Self, Vec<LexError>> {
        Self::with_interner(source, Interner::with_capacity(256))
    }

    /// Create a parser that interns into an existing interner.
    pub fn with_interner(source: &str, interner: Interner) -> Result<Self, Vec<LexError>> {
        let (raw_tokens, interner) = Lexer::with_interner(source, interner).tokenize()?;

        let mut tokens = Vec::with_capacity(raw_tokens.len());
        let mut docs = FxHashMap::default();
        for (token, span) in raw_tokens {
            match token {
                // The last doc comment before a token wins
                Token::DocComment(body) => {
                    docs.insert(tokens.len(), body);
                }
                other => tokens.push((other, span)),
            }
        }

        if !matches!(tokens.last(), Some((Token::Eof, _))) {
            let eof_span = Span::new(source.len(), source.len(), 1, 1);
            tokens.push((Token::Eof, eof_span));
        }

        Ok(Self {
            tokens,
            docs,
            pos: 0,
            depth: 0,
            errors: Vec::new(),
            interner,
        })
    }

    /// Parse the entire source file into a Module AST.
    ///
    /// Returns the Module and interner on success, or all accumulated errors.
    pub fn parse(mut self) -> Result<(Module, Interner), Vec<ParseError>> {
        let start_span = self.current_span();
        let mut statements = Vec::new();
        let mut guard = guards::LoopGuard::with_limit("module_statements", 1_000_000);

        while !self.at_eof() {
            if let Err(err) = guard.check() {
                self.errors.push(err);
                break;
            }
            let before = self.pos;
            match stmt::parse_statement(&mut self) {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    recovery::sync_to_statement_boundary(&mut self);
                    // Guarantee progress when recovery stops on the token
                    // that failed
                    if self.pos == before {
                        self.advance();
                    }
                }
            }
        }

        let span = match statements.last() {
            Some(last) => self.combine_spans(&start_span, last.span()),
            None => start_span,
        };

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        Ok((Module::new(statements, span), self.interner))
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Get the current token.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    /// Get the current token's span.
    #[inline]
    pub fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Peek at the next token (lookahead).
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(1)
    }

    /// Peek `n` tokens ahead; `peek_nth(0)` is the current token.
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Span of the token `n` positions ahead.
    #[inline]
    pub fn peek_span(&self, n: usize) -> Option<Span> {
        self.tokens.get(self.pos + n).map(|(_, span)| *span)
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].1
        }
    }

    /// Advance to the next token, returning the previous current token.
    pub fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Check if the current token matches the given kind.
    #[inline]
    pub fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(expected)
    }

    /// Check if the current token matches any of the given kinds.
    pub fn check_any(&self, expected: &[Token]) -> bool {
        expected.iter().any(|tok| self.check(tok))
    }

    /// Check whether the current token is the identifier `name`.
    pub fn check_identifier(&self, name: &str) -> bool {
        matches!(self.current(), Token::Identifier(sym) if self.interner.resolve(*sym) == name)
    }

    /// Consume the current token if it matches, reporting whether it did.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Check if we've reached EOF.
    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    /// Consume the current token if it matches the expected kind.
    ///
    /// Returns Ok(token) on match, or Err(ParseError) on mismatch.
    pub fn expect(&mut self, expected: Token) -> Result<Token, ParseError> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected_token(&[expected]))
        }
    }

    /// Position marker for speculative parsing.
    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    /// Rewind to a marker returned by `checkpoint`.
    pub fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Doc comment attached to the current token, if any.
    pub fn doc_comment(&self) -> Option<DocComment> {
        self.docs
            .get(&self.pos)
            .map(|body| DocComment::parse(self.interner.resolve(*body)))
    }

    /// Run `f` one nesting level deeper, failing once `MAX_PARSE_DEPTH` is hit.
    pub fn nested<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Parser) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= guards::MAX_PARSE_DEPTH {
            return Err(ParseError::parser_limit_exceeded(
                format!(
                    "Maximum nesting depth ({}) exceeded in {}",
                    guards::MAX_PARSE_DEPTH,
                    name
                ),
                self.current_span(),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Error Handling
    // ========================================================================

    /// Create an "unexpected token" error at the current position.
    pub fn unexpected_token(&self, expected: &[Token]) -> ParseError {
        let span = self.current_span();
        if self.at_eof() {
            ParseError::unexpected_eof(expected.to_vec(), span)
        } else {
            ParseError::unexpected_token(expected.to_vec(), self.current().clone(), span)
        }
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    /// Combine two spans into a single span.
    pub fn combine_spans(&self, start: &Span, end: &Span) -> Span {
        Span {
            start: start.start,
            end: end.end.max(start.start),
            line: start.line,
            column: start.column,
        }
    }

    /// Intern a string.
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    /// Resolve a symbol.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Parse an identifier, also accepting keywords when `allow_keywords`
    /// is set (member names, property keys, qualified name segments).
    pub fn parse_identifier(&mut self, allow_keywords: bool) -> Result<Identifier, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Identifier::new(name, span))
            }
            other if allow_keywords => match other.keyword_text() {
                Some(text) => {
                    let name = self.intern(text);
                    self.advance();
                    Ok(Identifier::new(name, span))
                }
                None => Err(self.unexpected_token(&[Token::Identifier(Symbol::dummy())])),
            },
            _ => Err(self.unexpected_token(&[Token::Identifier(Symbol::dummy())])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_new() {
        let parser = Parser::new("class User {}").unwrap();
        assert!(matches!(parser.current(), Token::Class));
    }

    #[test]
    fn test_parser_advance_and_peek() {
        let mut parser = Parser::new("class User").unwrap();

        assert!(matches!(parser.peek(), Some(Token::Identifier(_))));
        let tok = parser.advance();
        assert!(matches!(tok, Token::Class));
        assert!(matches!(parser.current(), Token::Identifier(_)));
    }

    #[test]
    fn test_parser_at_eof() {
        let parser = Parser::new("").unwrap();
        assert!(parser.at_eof());
    }

    #[test]
    fn test_doc_comments_are_lifted() {
        let parser = Parser::new("/** @internal */ class User {}").unwrap();

        assert!(matches!(parser.current(), Token::Class));
        let doc = parser.doc_comment().expect("doc attached to class keyword");
        assert!(doc.has_tag("internal"));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut parser = Parser::new("a b c").unwrap();
        let mark = parser.checkpoint();
        parser.advance();
        parser.advance();
        parser.restore(mark);
        assert!(parser.check_identifier("a"));
    }

    #[test]
    fn test_keyword_as_identifier() {
        let mut parser = Parser::new("type").unwrap();
        assert!(parser.parse_identifier(false).is_err());
        let id = parser.parse_identifier(true).unwrap();
        assert_eq!(parser.resolve(id.name), "type");
    }
}
