//! Lexer for Sigil declaration sources.
//!
//! This module implements the lexer using the logos library. It converts
//! source text into a stream of tokens with precise source locations.
//! Documentation comments (`/** ... */`) are kept as tokens because the
//! classifier reads `@customType`, `@property` and `@internal` tags from them.

use crate::parser::interner::Interner;
use crate::parser::token::{Span, Token};
use logos::Logos;

/// Logos-based token enum for lexing.
///
/// This enum is used internally by logos for efficient tokenization.
/// It's converted to our main Token enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace and plain comments are skipped by the manual loop in
    // `tokenize`; these rules only catch stray cases logos sees directly.
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*\*", lex_doc_comment)]
    DocComment(String),

    // Keywords (must come before identifiers)
    #[token("class")]
    Class,

    #[token("interface")]
    Interface,

    #[token("type")]
    Type,

    #[token("function")]
    Function,

    #[token("const")]
    Const,

    #[token("let")]
    Let,

    #[token("var")]
    Var,

    #[token("enum")]
    Enum,

    #[token("namespace")]
    Namespace,

    #[token("import")]
    Import,

    #[token("export")]
    Export,

    #[token("from")]
    From,

    #[token("as")]
    As,

    #[token("abstract")]
    Abstract,

    #[token("extends")]
    Extends,

    #[token("implements")]
    Implements,

    #[token("readonly")]
    Readonly,

    #[token("private")]
    Private,

    #[token("protected")]
    Protected,

    #[token("public")]
    Public,

    #[token("static")]
    Static,

    #[token("declare")]
    Declare,

    #[token("async")]
    Async,

    #[token("new")]
    New,

    #[token("this")]
    This,

    #[token("typeof")]
    Typeof,

    #[token("keyof")]
    Keyof,

    #[token("instanceof")]
    Instanceof,

    #[token("in")]
    In,

    #[token("void")]
    Void,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // Identifiers (must come after keywords)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Numbers with numeric separator support
    #[regex(r"0x[0-9a-fA-F]+(_[0-9a-fA-F]+)*", parse_hex)]
    #[regex(r"0b[01]+(_[01]+)*", parse_binary)]
    #[regex(r"0o[0-7]+(_[0-7]+)*", parse_octal)]
    IntLiteral(i64),

    /// Decimal integer; values past `i64` become float tokens
    #[regex(r"[0-9]+(_[0-9]+)*", |lex| lex.slice().replace('_', ""))]
    DecimalLiteral(String),

    #[regex(r"[0-9]+(_[0-9]+)*\.[0-9]+(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?", parse_float)]
    #[regex(r"[0-9]+(_[0-9]+)*[eE][+-]?[0-9]+(_[0-9]+)*", parse_float)]
    #[regex(r"\.[0-9]+(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?", parse_float)]
    FloatLiteral(f64),

    #[regex(r"[0-9]+(_[0-9]+)*n", parse_bigint)]
    BigIntLiteral(String),

    // Strings
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", parse_string)]
    StringLiteral(String),

    // Unterminated strings are reported instead of being split into tokens
    #[regex(r#""([^"\\\n]|\\.)*"#)]
    #[regex(r"'([^'\\\n]|\\.)*")]
    UnterminatedString,

    // Template literal start
    #[token("`")]
    Backtick,

    // Operators (longest match wins)
    #[token("===")]
    EqualEqualEqual,

    #[token("!==")]
    BangEqualEqual,

    #[token("**")]
    StarStar,

    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,

    #[token("<<")]
    LessLess,

    #[token("?.")]
    QuestionDot,

    #[token("??=")]
    QuestionQuestionEqual,

    #[token("??")]
    QuestionQuestion,

    #[token("=>")]
    Arrow,

    #[token("+=")]
    PlusEqual,

    #[token("-=")]
    MinusEqual,

    #[token("*=")]
    StarEqual,

    #[token("/=")]
    SlashEqual,

    #[token("%=")]
    PercentEqual,

    #[token("&=")]
    AmpEqual,

    #[token("|=")]
    PipeEqual,

    #[token("^=")]
    CaretEqual,

    // Single-character tokens. `>` is never merged into `>>` so that nested
    // type arguments such as `Array<Array<T>>` close one level per token.
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("!")]
    Bang,

    #[token("~")]
    Tilde,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("=")]
    Equal,

    #[token("?")]
    Question,

    #[token("...")]
    DotDotDot,

    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    #[token("@")]
    At,

    #[token("#")]
    Hash,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

// Helper parsing functions
fn lex_doc_comment(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    // "/**" already consumed, find "*/"
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => {
            let body = remainder[..end].to_string();
            lex.bump(end + 2);
            Some(body)
        }
        None => {
            lex.bump(remainder.len());
            None
        }
    }
}

fn parse_hex(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&s, 16).ok()
}

fn parse_binary(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&s, 2).ok()
}

fn parse_octal(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&s, 8).ok()
}

fn parse_float(lex: &mut logos::Lexer<LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_bigint(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    Some(s[..s.len() - 1].replace('_', ""))
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    Some(unescape_string(inner))
}

/// Resolve escape sequences in a string or template literal body.
pub(crate) fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let mut hex = String::new();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    while let Some(&ch) = chars.peek() {
                        chars.next();
                        if ch == '}' {
                            break;
                        }
                        hex.push(ch);
                    }
                } else {
                    for _ in 0..4 {
                        match chars.peek() {
                            Some(&ch) if ch.is_ascii_hexdigit() => {
                                hex.push(ch);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => result.push(ch),
                    None => {
                        // Invalid code point, keep as-is
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some('x') => {
                let mut hex = String::new();
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&ch) if ch.is_ascii_hexdigit() => {
                            hex.push(ch);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 => result.push(byte as char),
                    _ => {
                        result.push_str("\\x");
                        result.push_str(&hex);
                    }
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => result.push(other),
            None => break,
        }
    }

    result
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    errors: Vec<LexError>,
    interner: Interner,
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    UnterminatedString { span: Span },
    UnterminatedTemplate { span: Span },
    UnterminatedComment { span: Span },
    InvalidNumber { text: String, span: Span },
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_interner(source, Interner::with_capacity(256))
    }

    /// Create a lexer that interns into an existing interner.
    pub fn with_interner(source: &'a str, interner: Interner) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            errors: Vec::new(),
            interner,
        }
    }

    /// Format all errors with source context
    pub fn format_errors(errors: &[LexError], source: &str) -> String {
        errors
            .iter()
            .map(|e| e.format_with_source(source))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tokenize(mut self) -> Result<(Vec<(Token, Span)>, Interner), Vec<LexError>> {
        let mut pos = 0;
        let mut line = 1u32;
        let mut column = 1u32;
        let source = self.source;
        let bytes = source.as_bytes();

        while pos < bytes.len() {
            // Skip whitespace and plain comments manually. Doc comments are
            // left for logos so they become tokens.
            while pos < bytes.len() {
                match bytes[pos] {
                    b' ' | b'\t' | b'\r' => {
                        column += 1;
                        pos += 1;
                    }
                    b'\n' => {
                        line += 1;
                        column = 1;
                        pos += 1;
                    }
                    b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                        while pos < bytes.len() && bytes[pos] != b'\n' {
                            pos += 1;
                            column += 1;
                        }
                    }
                    b'/' if bytes.get(pos + 1) == Some(&b'*') && !self.is_doc_comment(pos) => {
                        let start = Span::new(pos, pos + 2, line, column);
                        pos += 2;
                        column += 2;
                        let mut closed = false;
                        while pos < bytes.len() {
                            if bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/') {
                                pos += 2;
                                column += 2;
                                closed = true;
                                break;
                            }
                            if bytes[pos] == b'\n' {
                                line += 1;
                                column = 1;
                            } else {
                                column += 1;
                            }
                            pos += 1;
                        }
                        if !closed {
                            self.errors.push(LexError::UnterminatedComment { span: start });
                        }
                    }
                    _ => break,
                }
            }

            if pos >= bytes.len() {
                break;
            }

            // Template literals are scanned by hand so that `${ ... }`
            // segments with nested braces and quotes stay inside one token.
            if bytes[pos] == b'`' {
                let start_span = Span::new(pos, pos + 1, line, column);
                match self.lex_template(pos + 1) {
                    Some((raw, end_pos)) => {
                        let sym = self.interner.intern(&raw);
                        let span = Span::new(pos, end_pos, line, column);
                        self.tokens.push((Token::TemplateLiteral(sym), span));
                        advance_position(&source[pos..end_pos], &mut line, &mut column);
                        pos = end_pos;
                    }
                    None => {
                        self.errors
                            .push(LexError::UnterminatedTemplate { span: start_span });
                        pos = bytes.len();
                    }
                }
                continue;
            }

            let mut logos_lexer = LogosToken::lexer(&source[pos..]);
            let Some(token_result) = logos_lexer.next() else {
                break;
            };
            let range = logos_lexer.span();
            let abs_start = pos + range.start;
            let abs_end = pos + range.end;
            // logos may have skipped whitespace before the token
            advance_position(&source[pos..abs_start], &mut line, &mut column);
            let span = Span::new(abs_start, abs_end, line, column);

            match token_result {
                Ok(LogosToken::UnterminatedString) => {
                    self.errors.push(LexError::UnterminatedString { span });
                }
                Ok(logos_token) => {
                    let token = self.convert_token(logos_token);
                    self.tokens.push((token, span));
                }
                Err(_) => {
                    let text = &source[abs_start..abs_end];
                    if text.starts_with("/**") {
                        self.errors.push(LexError::UnterminatedComment { span });
                    } else if text.starts_with(|c: char| c.is_ascii_digit()) {
                        self.errors.push(LexError::InvalidNumber {
                            text: text.to_string(),
                            span,
                        });
                    } else {
                        let char = text.chars().next().unwrap_or('\0');
                        self.errors.push(LexError::UnexpectedCharacter { char, span });
                    }
                }
            }

            advance_position(&source[abs_start..abs_end], &mut line, &mut column);
            pos = abs_end;
        }

        let eof_span = Span::new(source.len(), source.len(), line, column);
        self.tokens.push((Token::Eof, eof_span));

        if self.errors.is_empty() {
            Ok((self.tokens, self.interner))
        } else {
            Err(self.errors)
        }
    }

    /// `/**` opens a doc comment, except for the empty block comment `/**/`.
    fn is_doc_comment(&self, pos: usize) -> bool {
        let rest = &self.source[pos..];
        rest.starts_with("/**") && !rest.starts_with("/**/")
    }

    fn convert_token(&mut self, logos_token: LogosToken) -> Token {
        match logos_token {
            LogosToken::Class => Token::Class,
            LogosToken::Interface => Token::Interface,
            LogosToken::Type => Token::Type,
            LogosToken::Function => Token::Function,
            LogosToken::Const => Token::Const,
            LogosToken::Let => Token::Let,
            LogosToken::Var => Token::Var,
            LogosToken::Enum => Token::Enum,
            LogosToken::Namespace => Token::Namespace,
            LogosToken::Import => Token::Import,
            LogosToken::Export => Token::Export,
            LogosToken::From => Token::From,
            LogosToken::As => Token::As,
            LogosToken::Abstract => Token::Abstract,
            LogosToken::Extends => Token::Extends,
            LogosToken::Implements => Token::Implements,
            LogosToken::Readonly => Token::Readonly,
            LogosToken::Private => Token::Private,
            LogosToken::Protected => Token::Protected,
            LogosToken::Public => Token::Public,
            LogosToken::Static => Token::Static,
            LogosToken::Declare => Token::Declare,
            LogosToken::Async => Token::Async,
            LogosToken::New => Token::New,
            LogosToken::This => Token::This,
            LogosToken::Typeof => Token::Typeof,
            LogosToken::Keyof => Token::Keyof,
            LogosToken::Instanceof => Token::Instanceof,
            LogosToken::In => Token::In,
            LogosToken::Void => Token::Void,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::Identifier(s) => Token::Identifier(self.interner.intern(&s)),
            LogosToken::DocComment(s) => Token::DocComment(self.interner.intern(&s)),
            LogosToken::IntLiteral(n) => Token::IntLiteral(n),
            LogosToken::DecimalLiteral(digits) => match digits.parse::<i64>() {
                Ok(n) => Token::IntLiteral(n),
                Err(_) => Token::FloatLiteral(digits.parse().unwrap_or(f64::INFINITY)),
            },
            LogosToken::FloatLiteral(n) => Token::FloatLiteral(n),
            LogosToken::BigIntLiteral(s) => Token::BigIntLiteral(self.interner.intern(&s)),
            LogosToken::StringLiteral(s) => Token::StringLiteral(self.interner.intern(&s)),
            LogosToken::EqualEqualEqual => Token::EqualEqualEqual,
            LogosToken::BangEqualEqual => Token::BangEqualEqual,
            LogosToken::StarStar => Token::StarStar,
            LogosToken::EqualEqual => Token::EqualEqual,
            LogosToken::BangEqual => Token::BangEqual,
            LogosToken::LessEqual => Token::LessEqual,
            LogosToken::GreaterEqual => Token::GreaterEqual,
            LogosToken::AmpAmp => Token::AmpAmp,
            LogosToken::PipePipe => Token::PipePipe,
            LogosToken::PlusPlus => Token::PlusPlus,
            LogosToken::MinusMinus => Token::MinusMinus,
            LogosToken::LessLess => Token::LessLess,
            LogosToken::QuestionDot => Token::QuestionDot,
            LogosToken::QuestionQuestion => Token::QuestionQuestion,
            LogosToken::QuestionQuestionEqual => Token::QuestionQuestionEqual,
            LogosToken::Arrow => Token::Arrow,
            LogosToken::PlusEqual => Token::PlusEqual,
            LogosToken::MinusEqual => Token::MinusEqual,
            LogosToken::StarEqual => Token::StarEqual,
            LogosToken::SlashEqual => Token::SlashEqual,
            LogosToken::PercentEqual => Token::PercentEqual,
            LogosToken::AmpEqual => Token::AmpEqual,
            LogosToken::PipeEqual => Token::PipeEqual,
            LogosToken::CaretEqual => Token::CaretEqual,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Bang => Token::Bang,
            LogosToken::Tilde => Token::Tilde,
            LogosToken::Less => Token::Less,
            LogosToken::Greater => Token::Greater,
            LogosToken::Amp => Token::Amp,
            LogosToken::Pipe => Token::Pipe,
            LogosToken::Caret => Token::Caret,
            LogosToken::Equal => Token::Equal,
            LogosToken::Question => Token::Question,
            LogosToken::DotDotDot => Token::DotDotDot,
            LogosToken::Dot => Token::Dot,
            LogosToken::Colon => Token::Colon,
            LogosToken::At => Token::At,
            LogosToken::Hash => Token::Hash,
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Comma => Token::Comma,
            // Skipped or handled before conversion
            LogosToken::Whitespace
            | LogosToken::LineComment
            | LogosToken::UnterminatedString
            | LogosToken::Backtick => Token::Eof,
        }
    }

    /// Scan a template literal body starting just after the opening backtick.
    ///
    /// Returns the unescaped raw text (interpolations kept verbatim) and the
    /// byte offset just past the closing backtick.
    fn lex_template(&self, start: usize) -> Option<(String, usize)> {
        let mut raw = String::new();
        let mut chars = self.source[start..].char_indices().peekable();
        let mut interpolation_depth = 0usize;

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '`' if interpolation_depth == 0 => {
                    return Some((unescape_string(&raw), start + offset + 1));
                }
                '\\' => {
                    raw.push(ch);
                    if let Some((_, escaped)) = chars.next() {
                        raw.push(escaped);
                    }
                }
                '$' if interpolation_depth == 0 && matches!(chars.peek(), Some((_, '{'))) => {
                    raw.push('$');
                    raw.push('{');
                    chars.next();
                    interpolation_depth = 1;
                }
                '{' if interpolation_depth > 0 => {
                    interpolation_depth += 1;
                    raw.push(ch);
                }
                '}' if interpolation_depth > 0 => {
                    interpolation_depth -= 1;
                    raw.push(ch);
                }
                _ => raw.push(ch),
            }
        }

        None
    }
}

fn advance_position(text: &str, line: &mut u32, column: &mut u32) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

impl LexError {
    /// Get the span of this error
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedTemplate { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidNumber { span, .. } => span,
        }
    }

    /// Get a description of this error
    pub fn description(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => {
                format!("Unexpected character '{}'", char)
            }
            LexError::UnterminatedString { .. } => "Unterminated string literal".to_string(),
            LexError::UnterminatedTemplate { .. } => "Unterminated template literal".to_string(),
            LexError::UnterminatedComment { .. } => "Unterminated comment".to_string(),
            LexError::InvalidNumber { text, .. } => format!("Invalid number '{}'", text),
        }
    }

    /// Get a hint for fixing this error
    pub fn hint(&self) -> Option<String> {
        match self {
            LexError::UnterminatedString { .. } => {
                Some("Add a closing quote to terminate the string".to_string())
            }
            LexError::UnterminatedTemplate { .. } => {
                Some("Add a closing backtick (`) to terminate the template literal".to_string())
            }
            LexError::UnterminatedComment { .. } => {
                Some("Close the comment with */".to_string())
            }
            _ => None,
        }
    }

    /// Format the error with source context
    pub fn format_with_source(&self, source: &str) -> String {
        let span = self.span();
        let mut result = format!(
            "Error at {}:{}: {}\n",
            span.line,
            span.column,
            self.description()
        );

        if let Some(error_line) = source.lines().nth(span.line.saturating_sub(1) as usize) {
            result.push_str("  |\n");
            result.push_str(&format!("{:3} | {}\n", span.line, error_line));
            result.push_str(&format!(
                "  | {}^\n",
                " ".repeat(span.column.saturating_sub(1) as usize)
            ));
        }

        if let Some(hint) = self.hint() {
            result.push_str(&format!("\nHint: {}\n", hint));
        }

        result
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.description(),
            self.span().line,
            self.span().column
        )
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Interner) {
        let (tokens, interner) = Lexer::new(source).tokenize().expect("should lex");
        (tokens.into_iter().map(|(t, _)| t).collect(), interner)
    }

    #[test]
    fn test_doc_comment_is_token() {
        let (tokens, interner) = lex("/** @customType */\ntype X = string;");
        match &tokens[0] {
            Token::DocComment(sym) => assert_eq!(interner.resolve(*sym), " @customType "),
            other => panic!("Expected DocComment token, got {:?}", other),
        }
        assert_eq!(tokens[1], Token::Type);
    }

    #[test]
    fn test_plain_comments_skipped() {
        let (tokens, _) = lex("// line\n/* block */ /**/ class");
        assert_eq!(tokens, vec![Token::Class, Token::Eof]);
    }

    #[test]
    fn test_nested_type_arguments_close_separately() {
        let (tokens, _) = lex("Array<Array<T>>");
        let closers = tokens.iter().filter(|t| **t == Token::Greater).count();
        assert_eq!(closers, 2);
    }

    #[test]
    fn test_decimal_literals() {
        let (tokens, _) = lex("1_000 99999999999999999999");
        assert_eq!(tokens[0], Token::IntLiteral(1000));
        assert_eq!(tokens[1], Token::FloatLiteral(1e20));
    }

    #[test]
    fn test_bigint_literal() {
        let (tokens, interner) = lex("10n");
        match &tokens[0] {
            Token::BigIntLiteral(sym) => assert_eq!(interner.resolve(*sym), "10"),
            other => panic!("Expected BigIntLiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_template_with_interpolation() {
        let (tokens, interner) = lex("`a ${ {b: 1}.b } c`");
        match &tokens[0] {
            Token::TemplateLiteral(sym) => {
                assert_eq!(interner.resolve(*sym), "a ${ {b: 1}.b } c")
            }
            other => panic!("Expected TemplateLiteral, got {:?}", other),
        }
        assert_eq!(tokens[1], Token::Eof);
    }

    #[test]
    fn test_string_escapes() {
        let (tokens, interner) = lex(r#"'it\'s' "a\nb""#);
        match (&tokens[0], &tokens[1]) {
            (Token::StringLiteral(a), Token::StringLiteral(b)) => {
                assert_eq!(interner.resolve(*a), "it's");
                assert_eq!(interner.resolve(*b), "a\nb");
            }
            other => panic!("Expected two strings, got {:?}", other),
        }
    }

    #[test]
    fn test_span_line_and_column() {
        let (tokens, _) = Lexer::new("class\n  User").tokenize().expect("should lex");
        assert_eq!((tokens[1].1.line, tokens[1].1.column), (2, 3));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let errors = Lexer::new("'abc").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let errors = Lexer::new("class \u{00a7}").tokenize().unwrap_err();
        assert!(matches!(
            errors[0],
            LexError::UnexpectedCharacter { char: '\u{00a7}', .. }
        ));
    }
}
