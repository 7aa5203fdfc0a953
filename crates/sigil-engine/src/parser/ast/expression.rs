//! Expression AST nodes
//!
//! Expressions appear in decorator arguments and field initializers. The
//! classifier infers types from initializers and the loader evaluates
//! literal decorator options, so literals are modelled precisely while
//! function bodies are reduced to spans.

use super::*;
use crate::parser::interner::Symbol;
use crate::parser::token::Span;

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: 42, 0xFF, 0b1010
    IntLiteral(IntLiteral),

    /// Float literal: 3.14, 1.0e10
    FloatLiteral(FloatLiteral),

    /// BigInt literal: 10n
    BigIntLiteral(BigIntLiteral),

    /// String literal: "hello"
    StringLiteral(StringLiteral),

    /// Template literal: `Hello, ${name}!` (raw text)
    TemplateLiteral(TemplateLiteral),

    /// Boolean literal: true, false
    BooleanLiteral(BooleanLiteral),

    /// Null literal
    NullLiteral(Span),

    /// Identifier
    Identifier(Identifier),

    /// This expression: this
    This(Span),

    /// Array literal: [1, 2, 3]
    Array(ArrayExpression),

    /// Object literal: { x: 1, y: 2 }
    Object(ObjectExpression),

    /// Spread: ...xs (inside arrays and call arguments)
    Spread(SpreadElement),

    /// Unary expression: !x, -y, typeof z
    Unary(UnaryExpression),

    /// Binary expression: x + y, a * b
    Binary(BinaryExpression),

    /// Logical expression: x && y, a ?? b
    Logical(LogicalExpression),

    /// Assignment: x = 42, y += 1
    Assignment(AssignmentExpression),

    /// Ternary: x ? y : z
    Conditional(ConditionalExpression),

    /// Function call: foo(1, 2, 3)
    Call(CallExpression),

    /// Member access: obj.prop, obj?.prop
    Member(MemberExpression),

    /// Index access: arr[0]
    Index(IndexExpression),

    /// New expression: new Point(1, 2)
    New(NewExpression),

    /// Arrow function: (x) => x + 1
    Arrow(ArrowFunction),

    /// Function expression or object method; the body is skipped
    Function(Span),

    /// Parenthesized: (expr)
    Parenthesized(ParenthesizedExpression),

    /// Type cast: expr as T, expr satisfies T
    TypeCast(TypeCastExpression),

    /// Non-null assertion: expr!
    NonNull(NonNullExpression),
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> &Span {
        match self {
            Expression::IntLiteral(e) => &e.span,
            Expression::FloatLiteral(e) => &e.span,
            Expression::BigIntLiteral(e) => &e.span,
            Expression::StringLiteral(e) => &e.span,
            Expression::TemplateLiteral(e) => &e.span,
            Expression::BooleanLiteral(e) => &e.span,
            Expression::NullLiteral(span) => span,
            Expression::Identifier(e) => &e.span,
            Expression::This(span) => span,
            Expression::Array(e) => &e.span,
            Expression::Object(e) => &e.span,
            Expression::Spread(e) => &e.span,
            Expression::Unary(e) => &e.span,
            Expression::Binary(e) => &e.span,
            Expression::Logical(e) => &e.span,
            Expression::Assignment(e) => &e.span,
            Expression::Conditional(e) => &e.span,
            Expression::Call(e) => &e.span,
            Expression::Member(e) => &e.span,
            Expression::Index(e) => &e.span,
            Expression::New(e) => &e.span,
            Expression::Arrow(e) => &e.span,
            Expression::Function(span) => span,
            Expression::Parenthesized(e) => &e.span,
            Expression::TypeCast(e) => &e.span,
            Expression::NonNull(e) => &e.span,
        }
    }

    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::IntLiteral(_)
                | Expression::FloatLiteral(_)
                | Expression::BigIntLiteral(_)
                | Expression::StringLiteral(_)
                | Expression::TemplateLiteral(_)
                | Expression::BooleanLiteral(_)
                | Expression::NullLiteral(_)
                | Expression::Array(_)
                | Expression::Object(_)
        )
    }

    /// Strip parentheses, casts and non-null assertions.
    pub fn unwrapped(&self) -> &Expression {
        let mut current = self;
        loop {
            current = match current {
                Expression::Parenthesized(p) => &p.expression,
                Expression::TypeCast(c) => &c.object,
                Expression::NonNull(n) => &n.object,
                _ => return current,
            };
        }
    }
}

// ============================================================================
// Literal Expressions
// ============================================================================

/// Integer literal: 42, 0xFF, 0b1010
#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub value: i64,
    pub span: Span,
}

/// Float literal: 3.14, 1.0e10
#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub value: f64,
    pub span: Span,
}

/// BigInt literal: 10n (digits only)
#[derive(Debug, Clone, PartialEq)]
pub struct BigIntLiteral {
    pub digits: Symbol,
    pub span: Span,
}

/// String literal: "hello"
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: Symbol,
    pub span: Span,
}

/// Template literal, kept as raw text with interpolations verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    pub raw: Symbol,
    pub span: Span,
}

/// Boolean literal: true, false
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanLiteral {
    pub value: bool,
    pub span: Span,
}

// ============================================================================
// Array and Object Expressions
// ============================================================================

/// Array expression: [1, 2, 3], [...xs]; `None` marks a hole
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    pub elements: Vec<Option<Expression>>,
    pub span: Span,
}

/// Object expression: { x: 1, y: 2 }
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    /// key: value, shorthand `key`, or method `key() {}`
    Property(Property),
    /// ...other
    Spread(SpreadElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyName,
    pub value: Expression,
    pub shorthand: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadElement {
    pub argument: Box<Expression>,
    pub span: Span,
}

// ============================================================================
// Unary & Binary Expressions
// ============================================================================

/// Unary expression: !x, -y, ++z
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,             // +x
    Minus,            // -x
    Not,              // !x
    BitwiseNot,       // ~x
    Typeof,           // typeof x
    Void,             // void x
    Await,            // await x
    PrefixIncrement,  // ++x
    PrefixDecrement,  // --x
    PostfixIncrement, // x++
    PostfixDecrement, // x--
}

/// Binary expression: x + y, a * b
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Exponent, // **

    // Comparison
    Equal,          // ==
    NotEqual,       // !=
    StrictEqual,    // ===
    StrictNotEqual, // !==
    LessThan,       // <
    LessEqual,      // <=
    GreaterThan,    // >
    GreaterEqual,   // >=
    Instanceof,     // instanceof
    In,             // in

    // Bitwise
    BitwiseAnd, // &
    BitwiseOr,  // |
    BitwiseXor, // ^
    LeftShift,  // <<
    RightShift, // >>
}

/// Logical expression: x && y, a || b
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub operator: LogicalOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,               // &&
    Or,                // ||
    NullishCoalescing, // ??
}

/// Assignment expression: x = 42, y += 1
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub operator: AssignmentOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,         // =
    AddAssign,      // +=
    SubAssign,      // -=
    MulAssign,      // *=
    DivAssign,      // /=
    ModAssign,      // %=
    AndAssign,      // &=
    OrAssign,       // |=
    XorAssign,      // ^=
    NullishAssign,  // ??=
}

// ============================================================================
// Complex Expressions
// ============================================================================

/// Conditional (ternary): x ? y : z
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

/// Function call: foo(1, 2, 3)
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub type_args: Vec<TypeAnnotation>,
    pub arguments: Vec<Expression>,
    pub optional: bool,
    pub span: Span,
}

/// Member access: obj.prop, obj?.prop
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Identifier,
    pub optional: bool,
    pub span: Span,
}

/// Index access: arr[0]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub optional: bool,
    pub span: Span,
}

/// New expression: new Point(1, 2)
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub callee: Box<Expression>,
    pub type_args: Vec<TypeAnnotation>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Arrow function: (x) => x + 1
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: ArrowBody,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    /// Block body, skipped token-balanced
    Block(Span),
}

/// Parenthesized expression: (expr)
#[derive(Debug, Clone, PartialEq)]
pub struct ParenthesizedExpression {
    pub expression: Box<Expression>,
    pub span: Span,
}

/// Type cast expression: expr as TypeName
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCastExpression {
    /// The expression to cast
    pub object: Box<Expression>,
    /// The target type
    pub target_type: TypeAnnotation,
    pub span: Span,
}

/// Non-null assertion: expr!
#[derive(Debug, Clone, PartialEq)]
pub struct NonNullExpression {
    pub object: Box<Expression>,
    pub span: Span,
}
