//! Token definitions for Sigil declaration sources.
//!
//! This module defines all tokens that can appear in a declaration source,
//! including keywords, operators, literals, and documentation comments.

use crate::parser::interner::Symbol;
use std::fmt;

/// A token in a declaration source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declaration keywords
    Class,
    Interface,
    Type,
    Function,
    Const,
    Let,
    Var,
    Enum,
    Namespace,

    // Modules
    Import,
    Export,
    From,
    As,

    // Class modifiers
    Abstract,
    Extends,
    Implements,
    Readonly,
    Private,
    Protected,
    Public,
    Static,
    Declare,
    Async,

    // Expression / type operators
    New,
    This,
    Typeof,
    Keyof,
    Instanceof,
    In,
    Void,

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    BigIntLiteral(Symbol),
    StringLiteral(Symbol),
    TemplateLiteral(Symbol),
    True,
    False,
    Null,

    // Identifiers
    Identifier(Symbol),

    /// Documentation comment (`/** ... */`), content without delimiters
    DocComment(Symbol),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,

    // Unary
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,

    // Comparison
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    AmpAmp,
    PipePipe,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    LessLess,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    QuestionQuestionEqual,

    // Other
    Question,
    QuestionQuestion,
    QuestionDot,
    DotDotDot,
    Dot,
    Colon,
    Arrow,
    At,
    Hash,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,

    // Special
    Eof,
}

/// Source location information for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Class => write!(f, "class"),
            Token::Interface => write!(f, "interface"),
            Token::Type => write!(f, "type"),
            Token::Function => write!(f, "function"),
            Token::Const => write!(f, "const"),
            Token::Let => write!(f, "let"),
            Token::Var => write!(f, "var"),
            Token::Enum => write!(f, "enum"),
            Token::Namespace => write!(f, "namespace"),
            Token::Import => write!(f, "import"),
            Token::Export => write!(f, "export"),
            Token::From => write!(f, "from"),
            Token::As => write!(f, "as"),
            Token::Abstract => write!(f, "abstract"),
            Token::Extends => write!(f, "extends"),
            Token::Implements => write!(f, "implements"),
            Token::Readonly => write!(f, "readonly"),
            Token::Private => write!(f, "private"),
            Token::Protected => write!(f, "protected"),
            Token::Public => write!(f, "public"),
            Token::Static => write!(f, "static"),
            Token::Declare => write!(f, "declare"),
            Token::Async => write!(f, "async"),
            Token::New => write!(f, "new"),
            Token::This => write!(f, "this"),
            Token::Typeof => write!(f, "typeof"),
            Token::Keyof => write!(f, "keyof"),
            Token::Instanceof => write!(f, "instanceof"),
            Token::In => write!(f, "in"),
            Token::Void => write!(f, "void"),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::BigIntLiteral(_) => write!(f, "<bigint>"),
            Token::StringLiteral(_) => write!(f, "\"<string>\""),
            Token::TemplateLiteral(_) => write!(f, "`...`"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Identifier(_) => write!(f, "<identifier>"),
            Token::DocComment(_) => write!(f, "/** ... */"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::StarStar => write!(f, "**"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Bang => write!(f, "!"),
            Token::Tilde => write!(f, "~"),
            Token::EqualEqual => write!(f, "=="),
            Token::BangEqual => write!(f, "!="),
            Token::EqualEqualEqual => write!(f, "==="),
            Token::BangEqualEqual => write!(f, "!=="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::LessLess => write!(f, "<<"),
            Token::Equal => write!(f, "="),
            Token::PlusEqual => write!(f, "+="),
            Token::MinusEqual => write!(f, "-="),
            Token::StarEqual => write!(f, "*="),
            Token::SlashEqual => write!(f, "/="),
            Token::PercentEqual => write!(f, "%="),
            Token::AmpEqual => write!(f, "&="),
            Token::PipeEqual => write!(f, "|="),
            Token::CaretEqual => write!(f, "^="),
            Token::QuestionQuestionEqual => write!(f, "??="),
            Token::Question => write!(f, "?"),
            Token::QuestionQuestion => write!(f, "??"),
            Token::QuestionDot => write!(f, "?."),
            Token::DotDotDot => write!(f, "..."),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Arrow => write!(f, "=>"),
            Token::At => write!(f, "@"),
            Token::Hash => write!(f, "#"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

impl Token {
    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Class
                | Token::Interface
                | Token::Type
                | Token::Function
                | Token::Const
                | Token::Let
                | Token::Var
                | Token::Enum
                | Token::Namespace
                | Token::Import
                | Token::Export
                | Token::From
                | Token::As
                | Token::Abstract
                | Token::Extends
                | Token::Implements
                | Token::Readonly
                | Token::Private
                | Token::Protected
                | Token::Public
                | Token::Static
                | Token::Declare
                | Token::Async
                | Token::New
                | Token::This
                | Token::Typeof
                | Token::Keyof
                | Token::Instanceof
                | Token::In
                | Token::Void
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::IntLiteral(_)
                | Token::FloatLiteral(_)
                | Token::BigIntLiteral(_)
                | Token::StringLiteral(_)
                | Token::TemplateLiteral(_)
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Keywords that are also valid property and member names.
    ///
    /// Declaration sources frequently use names such as `type`, `from` or
    /// `default` for attributes; the parser accepts them wherever a member
    /// name is expected.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Class => "class",
            Token::Interface => "interface",
            Token::Type => "type",
            Token::Function => "function",
            Token::Const => "const",
            Token::Let => "let",
            Token::Var => "var",
            Token::Enum => "enum",
            Token::Namespace => "namespace",
            Token::Import => "import",
            Token::Export => "export",
            Token::From => "from",
            Token::As => "as",
            Token::Abstract => "abstract",
            Token::Extends => "extends",
            Token::Implements => "implements",
            Token::Readonly => "readonly",
            Token::Private => "private",
            Token::Protected => "protected",
            Token::Public => "public",
            Token::Static => "static",
            Token::Declare => "declare",
            Token::Async => "async",
            Token::New => "new",
            Token::This => "this",
            Token::Typeof => "typeof",
            Token::Keyof => "keyof",
            Token::Instanceof => "instanceof",
            Token::In => "in",
            Token::Void => "void",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        };
        Some(text)
    }
}
