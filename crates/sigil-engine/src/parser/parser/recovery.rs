//! Error recovery and skipping strategies for the parser.
//!
//! When the parser encounters an error, it resynchronizes at the next
//! declaration boundary so that later declarations are still reported.
//! The same token-balanced skipping is used for code the parser does not
//! model at all: method bodies, functions, variables and enums.

use super::guards::LoopGuard;
use super::{ParseError, Parser};
use crate::parser::token::{Span, Token};

/// Tokens that start a top-level declaration.
pub fn is_declaration_start(token: &Token) -> bool {
    matches!(
        token,
        Token::Class
            | Token::Interface
            | Token::Type
            | Token::Import
            | Token::Export
            | Token::Abstract
            | Token::Declare
            | Token::Function
            | Token::Const
            | Token::Let
            | Token::Var
            | Token::Enum
            | Token::Namespace
            | Token::At
    )
}

/// Synchronize to the next statement boundary.
///
/// Used after a parse error: skips tokens until a point where statement
/// parsing can resume.
pub fn sync_to_statement_boundary(parser: &mut Parser) {
    let mut guard = LoopGuard::new("statement_recovery");

    while !parser.at_eof() {
        if guard.check().is_err() {
            return;
        }

        match parser.current() {
            token if is_declaration_start(token) => return,

            // Semicolon marks end of previous statement
            Token::Semicolon => {
                parser.advance();
                return;
            }

            // Skip nested blocks wholesale so members of a broken class are
            // not mistaken for top-level declarations
            Token::LeftBrace | Token::LeftParen | Token::LeftBracket => {
                if skip_balanced(parser).is_err() {
                    return;
                }
            }

            _ => {
                parser.advance();
            }
        }
    }
}

/// Closing delimiter for an opening one.
fn closing_for(token: &Token) -> Option<Token> {
    match token {
        Token::LeftBrace => Some(Token::RightBrace),
        Token::LeftParen => Some(Token::RightParen),
        Token::LeftBracket => Some(Token::RightBracket),
        _ => None,
    }
}

/// Skip a balanced `{...}`, `(...)` or `[...]` group starting at the current
/// token. Returns the span from the opening to the closing delimiter.
pub fn skip_balanced(parser: &mut Parser) -> Result<Span, ParseError> {
    let start = parser.current_span();
    let open = parser.current().clone();
    let Some(close) = closing_for(&open) else {
        return Err(parser.unexpected_token(&[Token::LeftBrace]));
    };

    let mut stack = vec![close];
    parser.advance();
    let mut guard = LoopGuard::with_limit("skip_balanced", 1_000_000);

    while let Some(expected_close) = stack.last().cloned() {
        guard.check()?;
        if parser.at_eof() {
            return Err(ParseError::unclosed_delimiter(open, start));
        }
        let current = parser.current().clone();
        if let Some(nested) = closing_for(&current) {
            stack.push(nested);
        } else if parser.check(&expected_close) {
            stack.pop();
        }
        if stack.is_empty() {
            let end = parser.current_span();
            parser.advance();
            return Ok(parser.combine_spans(&start, &end));
        }
        parser.advance();
    }

    Ok(start)
}

/// Skip an unmodelled statement: everything up to a `;` at nesting depth 0,
/// the end of a block-bodied form (`function f() {}`, `enum E {}`), or the
/// start of the next declaration.
pub fn skip_statement(parser: &mut Parser) -> Result<Span, ParseError> {
    let start = parser.current_span();
    let mut end = start;
    let block_bodied = matches!(
        parser.current(),
        Token::Function | Token::Enum | Token::Namespace
    );
    let mut first = true;
    let mut guard = LoopGuard::new("skip_statement");

    while !parser.at_eof() {
        guard.check()?;
        match parser.current() {
            Token::Semicolon => {
                end = parser.current_span();
                parser.advance();
                break;
            }
            Token::LeftBrace if block_bodied => {
                end = skip_balanced(parser)?;
                break;
            }
            Token::LeftBrace | Token::LeftParen | Token::LeftBracket => {
                end = skip_balanced(parser)?;
            }
            Token::RightBrace | Token::RightParen | Token::RightBracket => {
                // Stray closer at top level; consume it so we make progress
                end = parser.current_span();
                parser.advance();
                break;
            }
            token if !first && is_declaration_start(token) => break,
            _ => {
                end = parser.current_span();
                parser.advance();
            }
        }
        first = false;
    }

    Ok(parser.combine_spans(&start, &end))
}

/// Skip tokens until we find one of the expected tokens at nesting depth 0.
pub fn skip_until(parser: &mut Parser, expected: &[Token]) -> Result<(), ParseError> {
    let mut guard = LoopGuard::new("skip_until");

    while !parser.at_eof() {
        guard.check()?;
        if parser.check_any(expected) {
            return Ok(());
        }
        if closing_for(parser.current()).is_some() {
            skip_balanced(parser)?;
        } else {
            parser.advance();
        }
    }
    Ok(())
}
