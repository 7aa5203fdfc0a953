//! Token tests for the declaration lexer.

use sigil_engine::parser::{Interner, Lexer, Span, Token};

fn lex_tokens(source: &str) -> (Vec<(Token, Span)>, Interner) {
    let lexer = Lexer::new(source);
    lexer.tokenize().unwrap()
}

fn assert_tokens(source: &str, expected: Vec<Token>) {
    let (tokens, _interner) = lex_tokens(source);
    let actual: Vec<Token> = tokens.iter().map(|(t, _)| t.clone()).collect();

    // Expected should include EOF
    let mut expected_with_eof = expected;
    expected_with_eof.push(Token::Eof);

    assert_eq!(actual, expected_with_eof, "Token mismatch");
}

fn assert_identifier(token: &Token, interner: &Interner, expected_name: &str) {
    match token {
        Token::Identifier(sym) => assert_eq!(interner.resolve(*sym), expected_name),
        _ => panic!("Expected identifier, got {:?}", token),
    }
}

#[test]
fn test_decorator_tokens() {
    let (tokens, interner) = lex_tokens("@Attr() name?: string;");
    assert_eq!(tokens[0].0, Token::At);
    assert_identifier(&tokens[1].0, &interner, "Attr");
    assert_eq!(tokens[2].0, Token::LeftParen);
    assert_eq!(tokens[3].0, Token::RightParen);
    assert_identifier(&tokens[4].0, &interner, "name");
    assert_eq!(tokens[5].0, Token::Question);
    assert_eq!(tokens[6].0, Token::Colon);
    assert_identifier(&tokens[7].0, &interner, "string");
    assert_eq!(tokens[8].0, Token::Semicolon);
}

#[test]
fn test_declaration_keywords() {
    assert_tokens(
        "export abstract class implements extends readonly",
        vec![
            Token::Export,
            Token::Abstract,
            Token::Class,
            Token::Implements,
            Token::Extends,
            Token::Readonly,
        ],
    );
}

#[test]
fn test_type_operators() {
    assert_tokens(
        "| & ?. ?? => ...",
        vec![
            Token::Pipe,
            Token::Amp,
            Token::QuestionDot,
            Token::QuestionQuestion,
            Token::Arrow,
            Token::DotDotDot,
        ],
    );
}

#[test]
fn test_string_literal_is_unescaped() {
    let (tokens, interner) = lex_tokens(r#"'{"a":"it\'s"}'"#);
    match &tokens[0].0 {
        Token::StringLiteral(sym) => assert_eq!(interner.resolve(*sym), r#"{"a":"it's"}"#),
        other => panic!("Expected string literal, got {:?}", other),
    }
}

#[test]
fn test_doc_comment_token() {
    let (tokens, interner) = lex_tokens("/** @customType */ type X = string;");
    match &tokens[0].0 {
        Token::DocComment(sym) => assert!(interner.resolve(*sym).contains("@customType")),
        other => panic!("Expected doc comment, got {:?}", other),
    }
}

#[test]
fn test_spans_track_lines() {
    let (tokens, _) = lex_tokens("class A {\n  x: number;\n}");
    let (_, x_span) = &tokens[3];
    assert_eq!(x_span.line, 2);
    assert_eq!(x_span.column, 3);
}
