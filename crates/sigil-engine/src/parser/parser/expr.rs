//! Expression parsing
//!
//! Precedence climbing over the binary operators; arrow functions are
//! detected with bounded lookahead and, where the head is ambiguous
//! (`(a): T => a` vs. `c ? (a) : b`), by speculative parsing.

use super::guards::LoopGuard;
use super::recovery::skip_balanced;
use super::stmt::{parse_parameters, parse_property_name, parse_type_parameters, starts_property_name};
use super::types::{offset_after_parens, parse_return_type_annotation, parse_type_annotation, parse_type_arguments};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

/// Parse an expression (assignment level).
pub fn parse_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.nested("expression", parse_assignment)
}

/// Parse a parenthesized argument list: (a, ...b, c)
pub fn parse_arguments(parser: &mut Parser) -> Result<Vec<Expression>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut arguments = Vec::new();
    let mut guard = LoopGuard::new("arguments");

    while !parser.check(&Token::RightParen) && !parser.at_eof() {
        guard.check()?;
        arguments.push(parse_spread_or_expression(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    parser.expect(Token::RightParen)?;
    Ok(arguments)
}

fn parse_spread_or_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    if parser.check(&Token::DotDotDot) {
        let start_span = parser.current_span();
        parser.advance();
        let argument = parse_expression(parser)?;
        let span = parser.combine_spans(&start_span, argument.span());
        return Ok(Expression::Spread(SpreadElement {
            argument: Box::new(argument),
            span,
        }));
    }
    parse_expression(parser)
}

// ============================================================================
// Assignment, arrows and conditionals
// ============================================================================

fn parse_assignment(parser: &mut Parser) -> Result<Expression, ParseError> {
    if let Some(arrow) = try_parse_arrow_function(parser)? {
        return Ok(arrow);
    }

    let left = parse_conditional(parser)?;

    let operator = match parser.current() {
        Token::Equal => AssignmentOperator::Assign,
        Token::PlusEqual => AssignmentOperator::AddAssign,
        Token::MinusEqual => AssignmentOperator::SubAssign,
        Token::StarEqual => AssignmentOperator::MulAssign,
        Token::SlashEqual => AssignmentOperator::DivAssign,
        Token::PercentEqual => AssignmentOperator::ModAssign,
        Token::AmpEqual => AssignmentOperator::AndAssign,
        Token::PipeEqual => AssignmentOperator::OrAssign,
        Token::CaretEqual => AssignmentOperator::XorAssign,
        Token::QuestionQuestionEqual => AssignmentOperator::NullishAssign,
        _ => return Ok(left),
    };
    parser.advance();

    let right = parser.nested("assignment", parse_assignment)?;
    let span = parser.combine_spans(left.span(), right.span());
    Ok(Expression::Assignment(AssignmentExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }))
}

fn parse_conditional(parser: &mut Parser) -> Result<Expression, ParseError> {
    let test = parse_binary(parser, 1)?;
    if !parser.check(&Token::Question) {
        return Ok(test);
    }
    parser.advance();

    let consequent = parse_expression(parser)?;
    parser.expect(Token::Colon)?;
    let alternate = parse_expression(parser)?;
    let span = parser.combine_spans(test.span(), alternate.span());

    Ok(Expression::Conditional(ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        span,
    }))
}

/// Identifiers that are keywords elsewhere but valid binding names.
fn is_contextual_identifier(token: &Token) -> bool {
    matches!(
        token,
        Token::Type
            | Token::From
            | Token::As
            | Token::Readonly
            | Token::Declare
            | Token::Abstract
            | Token::Namespace
            | Token::Async
    )
}

/// Detect and parse an arrow function at the current position.
fn try_parse_arrow_function(parser: &mut Parser) -> Result<Option<Expression>, ParseError> {
    let start_span = parser.current_span();
    let mark = parser.checkpoint();

    let is_async = parser.check(&Token::Async)
        && matches!(
            parser.peek(),
            Some(Token::LeftParen) | Some(Token::Identifier(_)) | Some(Token::Less)
        );
    let offset = usize::from(is_async);

    let head_token = parser.peek_nth(offset).cloned();
    match head_token {
        // x => ...
        Some(Token::Identifier(_)) => {
            if !matches!(parser.peek_nth(offset + 1), Some(Token::Arrow)) {
                return Ok(None);
            }
            if is_async {
                parser.advance();
            }
            let name = parser.parse_identifier(false)?;
            let param = Parameter {
                decorators: Vec::new(),
                modifiers: Modifiers::default(),
                span: name.span,
                name: ParameterName::Identifier(name),
                optional: false,
                is_rest: false,
                type_annotation: None,
                default: None,
            };
            parser.expect(Token::Arrow)?;
            parse_arrow_body(parser, start_span, vec![param], None, is_async).map(Some)
        }
        // (a, b) => ..., (a): T => ..., <T>(a: T) => ...
        Some(Token::LeftParen) | Some(Token::Less) => {
            let definite = matches!(head_token, Some(Token::LeftParen))
                && offset_after_parens(parser, offset)
                    .is_some_and(|after| matches!(parser.peek_nth(after), Some(Token::Arrow)));
            let possible = definite
                || offset_after_parens(parser, offset)
                    .is_some_and(|after| matches!(parser.peek_nth(after), Some(Token::Colon)))
                || matches!(head_token, Some(Token::Less));
            if !possible {
                return Ok(None);
            }

            if is_async {
                parser.advance();
            }
            match parse_arrow_head(parser) {
                Ok((params, return_type)) if parser.check(&Token::Arrow) => {
                    parser.advance();
                    parse_arrow_body(parser, start_span, params, return_type, is_async).map(Some)
                }
                Err(err) if definite => Err(err),
                _ => {
                    parser.restore(mark);
                    Ok(None)
                }
            }
        }
        _ => Ok(None),
    }
}

fn parse_arrow_head(
    parser: &mut Parser,
) -> Result<(Vec<Parameter>, Option<TypeAnnotation>), ParseError> {
    if parser.check(&Token::Less) {
        parse_type_parameters(parser)?;
    }
    let params = parse_parameters(parser)?;
    let return_type = if parser.eat(&Token::Colon) {
        Some(parse_return_type_annotation(parser)?)
    } else {
        None
    };
    Ok((params, return_type))
}

fn parse_arrow_body(
    parser: &mut Parser,
    start_span: Span,
    params: Vec<Parameter>,
    return_type: Option<TypeAnnotation>,
    is_async: bool,
) -> Result<Expression, ParseError> {
    let body = if parser.check(&Token::LeftBrace) {
        ArrowBody::Block(skip_balanced(parser)?)
    } else {
        ArrowBody::Expression(Box::new(parse_expression(parser)?))
    };
    let span = parser.combine_spans(&start_span, &parser.previous_span());

    Ok(Expression::Arrow(ArrowFunction {
        params,
        return_type,
        body,
        is_async,
        span,
    }))
}

// ============================================================================
// Binary operators
// ============================================================================

enum BinaryOp {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
    Cast,
}

/// Operator at the current position with its precedence and token width.
fn binary_operator(parser: &Parser) -> Option<(u8, BinaryOp, usize)> {
    let op = match parser.current() {
        Token::QuestionQuestion => (1, BinaryOp::Logical(LogicalOperator::NullishCoalescing), 1),
        Token::PipePipe => (2, BinaryOp::Logical(LogicalOperator::Or), 1),
        Token::AmpAmp => (3, BinaryOp::Logical(LogicalOperator::And), 1),
        Token::Pipe => (4, BinaryOp::Binary(BinaryOperator::BitwiseOr), 1),
        Token::Caret => (5, BinaryOp::Binary(BinaryOperator::BitwiseXor), 1),
        Token::Amp => (6, BinaryOp::Binary(BinaryOperator::BitwiseAnd), 1),
        Token::EqualEqual => (7, BinaryOp::Binary(BinaryOperator::Equal), 1),
        Token::BangEqual => (7, BinaryOp::Binary(BinaryOperator::NotEqual), 1),
        Token::EqualEqualEqual => (7, BinaryOp::Binary(BinaryOperator::StrictEqual), 1),
        Token::BangEqualEqual => (7, BinaryOp::Binary(BinaryOperator::StrictNotEqual), 1),
        // `>>` and `>>>` are lexed as adjacent `>` tokens so that nested
        // generics close cleanly
        Token::Greater => {
            let width = adjacent_greater_count(parser);
            if width > 1 {
                (9, BinaryOp::Binary(BinaryOperator::RightShift), width)
            } else {
                (8, BinaryOp::Binary(BinaryOperator::GreaterThan), 1)
            }
        }
        Token::Less => (8, BinaryOp::Binary(BinaryOperator::LessThan), 1),
        Token::LessEqual => (8, BinaryOp::Binary(BinaryOperator::LessEqual), 1),
        Token::GreaterEqual => (8, BinaryOp::Binary(BinaryOperator::GreaterEqual), 1),
        Token::Instanceof => (8, BinaryOp::Binary(BinaryOperator::Instanceof), 1),
        Token::In => (8, BinaryOp::Binary(BinaryOperator::In), 1),
        Token::As => (8, BinaryOp::Cast, 1),
        _ if parser.check_identifier("satisfies") => (8, BinaryOp::Cast, 1),
        Token::LessLess => (9, BinaryOp::Binary(BinaryOperator::LeftShift), 1),
        Token::Plus => (10, BinaryOp::Binary(BinaryOperator::Add), 1),
        Token::Minus => (10, BinaryOp::Binary(BinaryOperator::Subtract), 1),
        Token::Star => (11, BinaryOp::Binary(BinaryOperator::Multiply), 1),
        Token::Slash => (11, BinaryOp::Binary(BinaryOperator::Divide), 1),
        Token::Percent => (11, BinaryOp::Binary(BinaryOperator::Modulo), 1),
        Token::StarStar => (12, BinaryOp::Binary(BinaryOperator::Exponent), 1),
        _ => return None,
    };
    Some(op)
}

/// Number of directly adjacent `>` tokens starting at the current one (max 3).
fn adjacent_greater_count(parser: &Parser) -> usize {
    let mut count = 1;
    let mut end = parser.current_span().end;
    while count < 3 {
        match (parser.peek_nth(count), parser.peek_span(count)) {
            (Some(Token::Greater), Some(span)) if span.start == end => {
                end = span.end;
                count += 1;
            }
            _ => break,
        }
    }
    count
}

fn parse_binary(parser: &mut Parser, min_precedence: u8) -> Result<Expression, ParseError> {
    let mut left = parse_unary(parser)?;
    let mut guard = LoopGuard::new("binary_expression");

    while let Some((precedence, op, width)) = binary_operator(parser) {
        guard.check()?;
        if precedence < min_precedence {
            break;
        }
        for _ in 0..width {
            parser.advance();
        }

        left = match op {
            BinaryOp::Cast => {
                let target_type = parse_cast_target(parser)?;
                let span = parser.combine_spans(left.span(), &target_type.span);
                Expression::TypeCast(TypeCastExpression {
                    object: Box::new(left),
                    target_type,
                    span,
                })
            }
            BinaryOp::Binary(operator) => {
                // `**` is right-associative
                let next = if operator == BinaryOperator::Exponent {
                    precedence
                } else {
                    precedence + 1
                };
                let right = parser.nested("binary", |p| parse_binary(p, next))?;
                let span = parser.combine_spans(left.span(), right.span());
                Expression::Binary(BinaryExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                })
            }
            BinaryOp::Logical(operator) => {
                let right = parser.nested("logical", |p| parse_binary(p, precedence + 1))?;
                let span = parser.combine_spans(left.span(), right.span());
                Expression::Logical(LogicalExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                })
            }
        };
    }

    Ok(left)
}

/// Target of `as` / `satisfies`; `as const` becomes a reference named `const`.
fn parse_cast_target(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    if parser.check(&Token::Const) {
        let span = parser.current_span();
        parser.advance();
        let name = parser.intern("const");
        return Ok(TypeAnnotation::new(
            Type::Reference(TypeReference {
                name: vec![Identifier::new(name, span)],
                type_args: Vec::new(),
            }),
            span,
        ));
    }
    parse_type_annotation(parser)
}

// ============================================================================
// Unary and postfix
// ============================================================================

fn starts_operand(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(Token::Identifier(_))
            | Some(Token::This)
            | Some(Token::New)
            | Some(Token::LeftParen)
            | Some(Token::LeftBracket)
            | Some(Token::IntLiteral(_))
            | Some(Token::FloatLiteral(_))
            | Some(Token::StringLiteral(_))
            | Some(Token::TemplateLiteral(_))
    )
}

fn parse_unary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start_span = parser.current_span();

    let operator = match parser.current() {
        Token::Bang => UnaryOperator::Not,
        Token::Minus => UnaryOperator::Minus,
        Token::Plus => UnaryOperator::Plus,
        Token::Tilde => UnaryOperator::BitwiseNot,
        Token::Typeof => UnaryOperator::Typeof,
        Token::Void => UnaryOperator::Void,
        Token::PlusPlus => UnaryOperator::PrefixIncrement,
        Token::MinusMinus => UnaryOperator::PrefixDecrement,
        _ if parser.check_identifier("await") && starts_operand(parser.peek()) => {
            UnaryOperator::Await
        }
        _ => return parse_postfix(parser),
    };
    parser.advance();

    let operand = parser.nested("unary", parse_unary)?;
    let span = parser.combine_spans(&start_span, operand.span());
    Ok(Expression::Unary(UnaryExpression {
        operator,
        operand: Box::new(operand),
        span,
    }))
}

fn same_line(parser: &Parser) -> bool {
    parser.current_span().line == parser.previous_span().line
}

fn parse_postfix(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut expr = parse_primary(parser)?;
    let mut guard = LoopGuard::new("postfix_expression");

    loop {
        guard.check()?;
        match parser.current() {
            Token::Dot => {
                parser.advance();
                let property = parse_member_name(parser)?;
                expr = member(parser, expr, property, false);
            }
            Token::QuestionDot => {
                parser.advance();
                match parser.current() {
                    Token::LeftParen => expr = call(parser, expr, Vec::new(), true)?,
                    Token::LeftBracket => expr = index(parser, expr, true)?,
                    _ => {
                        let property = parse_member_name(parser)?;
                        expr = member(parser, expr, property, true);
                    }
                }
            }
            // A `[` on a new line begins the next class member
            Token::LeftBracket if same_line(parser) => expr = index(parser, expr, false)?,
            Token::LeftParen => expr = call(parser, expr, Vec::new(), false)?,
            Token::Less => match try_parse_call_type_arguments(parser) {
                Some(type_args) => expr = call(parser, expr, type_args, false)?,
                None => break,
            },
            // Tagged template: tag`...`
            Token::TemplateLiteral(raw) => {
                let raw = *raw;
                let template_span = parser.current_span();
                parser.advance();
                let span = parser.combine_spans(expr.span(), &template_span);
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    type_args: Vec::new(),
                    arguments: vec![Expression::TemplateLiteral(TemplateLiteral {
                        raw,
                        span: template_span,
                    })],
                    optional: false,
                    span,
                });
            }
            Token::Bang if same_line(parser) => {
                let end = parser.current_span();
                parser.advance();
                let span = parser.combine_spans(expr.span(), &end);
                expr = Expression::NonNull(NonNullExpression {
                    object: Box::new(expr),
                    span,
                });
            }
            Token::PlusPlus | Token::MinusMinus if same_line(parser) => {
                let operator = if parser.check(&Token::PlusPlus) {
                    UnaryOperator::PostfixIncrement
                } else {
                    UnaryOperator::PostfixDecrement
                };
                let end = parser.current_span();
                parser.advance();
                let span = parser.combine_spans(expr.span(), &end);
                expr = Expression::Unary(UnaryExpression {
                    operator,
                    operand: Box::new(expr),
                    span,
                });
            }
            _ => break,
        }
    }

    Ok(expr)
}

/// Property after `.`: any identifier or keyword, or `#private`.
fn parse_member_name(parser: &mut Parser) -> Result<Identifier, ParseError> {
    if parser.check(&Token::Hash) {
        let start_span = parser.current_span();
        parser.advance();
        let id = parser.parse_identifier(true)?;
        let name = format!("#{}", parser.resolve(id.name));
        let name = parser.intern(&name);
        return Ok(Identifier::new(name, parser.combine_spans(&start_span, &id.span)));
    }
    parser.parse_identifier(true)
}

fn member(parser: &Parser, object: Expression, property: Identifier, optional: bool) -> Expression {
    let span = parser.combine_spans(object.span(), &property.span);
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property,
        optional,
        span,
    })
}

fn index(parser: &mut Parser, object: Expression, optional: bool) -> Result<Expression, ParseError> {
    parser.expect(Token::LeftBracket)?;
    let index = parse_expression(parser)?;
    let end = parser.current_span();
    parser.expect(Token::RightBracket)?;
    let span = parser.combine_spans(object.span(), &end);
    Ok(Expression::Index(IndexExpression {
        object: Box::new(object),
        index: Box::new(index),
        optional,
        span,
    }))
}

fn call(
    parser: &mut Parser,
    callee: Expression,
    type_args: Vec<TypeAnnotation>,
    optional: bool,
) -> Result<Expression, ParseError> {
    let arguments = parse_arguments(parser)?;
    let span = parser.combine_spans(callee.span(), &parser.previous_span());
    Ok(Expression::Call(CallExpression {
        callee: Box::new(callee),
        type_args,
        arguments,
        optional,
        span,
    }))
}

/// Speculatively parse `<T>` followed by `(`; rewinds when the `<` turns
/// out to be a comparison.
fn try_parse_call_type_arguments(parser: &mut Parser) -> Option<Vec<TypeAnnotation>> {
    let mark = parser.checkpoint();
    match parse_type_arguments(parser) {
        Ok(args) if parser.check(&Token::LeftParen) => Some(args),
        _ => {
            parser.restore(mark);
            None
        }
    }
}

// ============================================================================
// Primary expressions
// ============================================================================

fn parse_primary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let span = parser.current_span();

    match parser.current().clone() {
        Token::IntLiteral(value) => {
            parser.advance();
            Ok(Expression::IntLiteral(IntLiteral { value, span }))
        }
        Token::FloatLiteral(value) => {
            parser.advance();
            Ok(Expression::FloatLiteral(FloatLiteral { value, span }))
        }
        Token::BigIntLiteral(digits) => {
            parser.advance();
            Ok(Expression::BigIntLiteral(BigIntLiteral { digits, span }))
        }
        Token::StringLiteral(value) => {
            parser.advance();
            Ok(Expression::StringLiteral(StringLiteral { value, span }))
        }
        Token::TemplateLiteral(raw) => {
            parser.advance();
            Ok(Expression::TemplateLiteral(TemplateLiteral { raw, span }))
        }
        Token::True | Token::False => {
            let value = parser.check(&Token::True);
            parser.advance();
            Ok(Expression::BooleanLiteral(BooleanLiteral { value, span }))
        }
        Token::Null => {
            parser.advance();
            Ok(Expression::NullLiteral(span))
        }
        Token::This => {
            parser.advance();
            Ok(Expression::This(span))
        }
        Token::Identifier(_) => Ok(Expression::Identifier(parser.parse_identifier(false)?)),
        Token::LeftParen => {
            parser.advance();
            let expression = parse_expression(parser)?;
            let end = parser.current_span();
            parser.expect(Token::RightParen)?;
            Ok(Expression::Parenthesized(ParenthesizedExpression {
                expression: Box::new(expression),
                span: parser.combine_spans(&span, &end),
            }))
        }
        Token::LeftBracket => parse_array(parser),
        Token::LeftBrace => parse_object(parser),
        Token::New => parse_new(parser),
        Token::Function => parse_function_expression(parser),
        Token::Async if matches!(parser.peek(), Some(Token::Function)) => {
            parser.advance();
            let function = parse_function_expression(parser)?;
            Ok(Expression::Function(parser.combine_spans(&span, function.span())))
        }
        Token::Slash | Token::SlashEqual => Err(ParseError::invalid_syntax(
            "regular expression literals are not supported",
            span,
        )
        .with_suggestion("Use `new RegExp(\"...\")` instead")),
        ref token if is_contextual_identifier(token) => {
            Ok(Expression::Identifier(parser.parse_identifier(true)?))
        }
        _ => Err(parser
            .unexpected_token(&[Token::Identifier(Symbol::dummy())])
            .with_suggestion("Expected an expression")),
    }
}

/// Parse array literal: [1, , ...xs]
fn parse_array(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::LeftBracket)?;
    let mut elements = Vec::new();
    let mut guard = LoopGuard::new("array_elements");

    while !parser.check(&Token::RightBracket) && !parser.at_eof() {
        guard.check()?;
        if parser.eat(&Token::Comma) {
            elements.push(None);
            continue;
        }
        elements.push(Some(parse_spread_or_expression(parser)?));
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    let end = parser.current_span();
    parser.expect(Token::RightBracket)?;
    Ok(Expression::Array(ArrayExpression {
        elements,
        span: parser.combine_spans(&start_span, &end),
    }))
}

/// Parse object literal: { a: 1, b, ...rest, [k]: v, m() {} }
fn parse_object(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::LeftBrace)?;
    let mut properties = Vec::new();
    let mut guard = LoopGuard::new("object_properties");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        properties.push(parser.nested("object_property", parse_object_property)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    let end = parser.current_span();
    parser.expect(Token::RightBrace)?;
    Ok(Expression::Object(ObjectExpression {
        properties,
        span: parser.combine_spans(&start_span, &end),
    }))
}

fn parse_object_property(parser: &mut Parser) -> Result<ObjectProperty, ParseError> {
    let start_span = parser.current_span();

    if parser.eat(&Token::DotDotDot) {
        let argument = parse_expression(parser)?;
        let span = parser.combine_spans(&start_span, argument.span());
        return Ok(ObjectProperty::Spread(SpreadElement {
            argument: Box::new(argument),
            span,
        }));
    }

    // Method prefixes: get / set / async / *
    let is_accessor = (parser.check_identifier("get") || parser.check_identifier("set"))
        && starts_property_name(parser.peek());
    let is_async_method = parser.check(&Token::Async) && starts_property_name(parser.peek());
    if is_accessor || is_async_method {
        parser.advance();
    }
    let is_generator = parser.eat(&Token::Star);

    let key = parse_property_name(parser)?;

    if is_accessor || is_async_method || is_generator || parser.check_any(&[Token::LeftParen, Token::Less]) {
        let value = parse_method_tail(parser, start_span)?;
        let span = *value.span();
        return Ok(ObjectProperty::Property(Property {
            key,
            value,
            shorthand: false,
            span,
        }));
    }

    if parser.eat(&Token::Colon) {
        let value = parse_expression(parser)?;
        let span = parser.combine_spans(&start_span, value.span());
        return Ok(ObjectProperty::Property(Property {
            key,
            value,
            shorthand: false,
            span,
        }));
    }

    // Shorthand: { name }
    match &key {
        PropertyName::Identifier(id) => {
            let value = Expression::Identifier(id.clone());
            Ok(ObjectProperty::Property(Property {
                key,
                value,
                shorthand: true,
                span: start_span,
            }))
        }
        _ => Err(parser.unexpected_token(&[Token::Colon])),
    }
}

/// `<T>(params): R { body }` after a method name; the body is skipped.
fn parse_method_tail(parser: &mut Parser, start_span: Span) -> Result<Expression, ParseError> {
    parse_arrow_head(parser)?;
    let end = skip_balanced(parser)?;
    Ok(Expression::Function(parser.combine_spans(&start_span, &end)))
}

/// `function name<T>(params): R { body }`; only the span is kept.
fn parse_function_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::Function)?;
    parser.eat(&Token::Star);
    if matches!(parser.current(), Token::Identifier(_)) {
        parser.advance();
    }
    parse_method_tail(parser, start_span)
}

/// Parse new expression: new Foo<T>(args), new ns.Foo
fn parse_new(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::New)?;

    let mut callee = if parser.check(&Token::New) {
        parser.nested("new", parse_new)?
    } else {
        parse_primary(parser)?
    };

    let mut guard = LoopGuard::new("new_callee");
    loop {
        guard.check()?;
        if parser.eat(&Token::Dot) {
            let property = parse_member_name(parser)?;
            callee = member(parser, callee, property, false);
        } else if parser.check(&Token::LeftBracket) && same_line(parser) {
            callee = index(parser, callee, false)?;
        } else {
            break;
        }
    }

    let type_args = if parser.check(&Token::Less) {
        let mark = parser.checkpoint();
        match parse_type_arguments(parser) {
            Ok(args) => args,
            Err(_) => {
                parser.restore(mark);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let arguments = if parser.check(&Token::LeftParen) {
        parse_arguments(parser)?
    } else {
        Vec::new()
    };

    let span = parser.combine_spans(&start_span, &parser.previous_span());
    Ok(Expression::New(NewExpression {
        callee: Box::new(callee),
        type_args,
        arguments,
        span,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    fn parse_expr(source: &str) -> (Expression, Interner) {
        let mut parser = Parser::new(source).unwrap();
        let expr = parse_expression(&mut parser).expect("expression should parse");
        assert!(parser.at_eof(), "trailing tokens after expression in {:?}", source);
        let (_, interner) = parser.parse().unwrap();
        (expr, interner)
    }

    #[test]
    fn test_precedence() {
        let (expr, _) = parse_expr("1 + 2 * 3");
        match expr {
            Expression::Binary(bin) => {
                assert_eq!(bin.operator, BinaryOperator::Add);
                assert!(matches!(*bin.right, Expression::Binary(_)));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let (expr, _) = parse_expr("2 ** 3 ** 2");
        match expr {
            Expression::Binary(bin) => {
                assert!(matches!(*bin.left, Expression::IntLiteral(_)));
                assert!(matches!(*bin.right, Expression::Binary(_)));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_shift_from_adjacent_greater_tokens() {
        let (expr, _) = parse_expr("a >> 2");
        match expr {
            Expression::Binary(bin) => assert_eq!(bin.operator, BinaryOperator::RightShift),
            other => panic!("Expected Binary, got {:?}", other),
        }

        let (expr, _) = parse_expr("a > b");
        match expr {
            Expression::Binary(bin) => assert_eq!(bin.operator, BinaryOperator::GreaterThan),
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal() {
        let (expr, interner) = parse_expr(
            "{ name: 'x', nested: { a: [1, 2] }, short, ...rest, 'quoted': null, [key]: 1, m() { return 1; } }",
        );
        match expr {
            Expression::Object(obj) => {
                assert_eq!(obj.properties.len(), 7);
                match &obj.properties[0] {
                    ObjectProperty::Property(p) => {
                        assert_eq!(p.key.text(&interner).as_deref(), Some("name"));
                    }
                    other => panic!("Expected Property, got {:?}", other),
                }
                assert!(matches!(&obj.properties[2], ObjectProperty::Property(p) if p.shorthand));
                assert!(matches!(obj.properties[3], ObjectProperty::Spread(_)));
                assert!(matches!(
                    &obj.properties[6],
                    ObjectProperty::Property(Property { value: Expression::Function(_), .. })
                ));
            }
            other => panic!("Expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        let (expr, _) = parse_expr("(value: string): boolean => value.length > 3");
        match expr {
            Expression::Arrow(arrow) => {
                assert_eq!(arrow.params.len(), 1);
                assert!(arrow.return_type.is_some());
                assert!(matches!(arrow.body, ArrowBody::Expression(_)));
            }
            other => panic!("Expected Arrow, got {:?}", other),
        }

        let (expr, _) = parse_expr("async v => { await save(v); }");
        match expr {
            Expression::Arrow(arrow) => {
                assert!(arrow.is_async);
                assert!(matches!(arrow.body, ArrowBody::Block(_)));
            }
            other => panic!("Expected Arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_with_parenthesized_branch() {
        let (expr, _) = parse_expr("flag ? (a) : b");
        assert!(matches!(expr, Expression::Conditional(_)));
    }

    #[test]
    fn test_generic_call_and_new() {
        let (expr, _) = parse_expr("create<User>(1)");
        match expr {
            Expression::Call(call) => assert_eq!(call.type_args.len(), 1),
            other => panic!("Expected Call, got {:?}", other),
        }

        let (expr, _) = parse_expr("new Map<string, number>()");
        match expr {
            Expression::New(new) => assert_eq!(new.type_args.len(), 2),
            other => panic!("Expected New, got {:?}", other),
        }

        let (expr, _) = parse_expr("a < b");
        assert!(matches!(expr, Expression::Binary(_)));
    }

    #[test]
    fn test_casts_are_unwrapped() {
        let (expr, _) = parse_expr("([1, 2] as const)!");
        assert!(matches!(expr.unwrapped(), Expression::Array(_)));
    }

    #[test]
    fn test_member_chain() {
        let (expr, _) = parse_expr("Roles.admin?.level");
        match expr {
            Expression::Member(m) => assert!(m.optional),
            other => panic!("Expected Member, got {:?}", other),
        }
    }
}
