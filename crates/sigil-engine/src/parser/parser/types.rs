//! Type annotation parsing

use super::guards::LoopGuard;
use super::recovery::skip_balanced;
use super::stmt::{ends_member_name, parse_parameters, parse_property_name, parse_type_parameters, starts_property_name};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

/// Parse a type annotation: `string`, `User[]`, `A | B`, `(x: T) => U`, ...
pub fn parse_type_annotation(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    parser.nested("type", |parser| {
        if is_function_type_start(parser) {
            parse_function_type(parser)
        } else {
            parse_union_type(parser)
        }
    })
}

/// Parse a return type, which may also be a type predicate
/// (`value is User`) or an assertion signature (`asserts value`).
pub fn parse_return_type_annotation(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();

    if parser.check_identifier("asserts")
        && matches!(parser.peek(), Some(Token::Identifier(_)) | Some(Token::This))
    {
        parser.advance();
        parser.advance();
        if is_identifier(parser, parser.peek_nth(0), "is") {
            parser.advance();
            parse_type_annotation(parser)?;
        }
        let span = parser.combine_spans(&start_span, &parser.previous_span());
        return Ok(TypeAnnotation::new(Type::Primitive(PrimitiveType::Void), span));
    }

    if matches!(parser.current(), Token::Identifier(_) | Token::This)
        && is_identifier(parser, parser.peek(), "is")
    {
        parser.advance();
        parser.advance();
        let target = parse_type_annotation(parser)?;
        let span = parser.combine_spans(&start_span, &target.span);
        return Ok(TypeAnnotation::new(Type::Primitive(PrimitiveType::Boolean), span));
    }

    parse_type_annotation(parser)
}

fn is_identifier(parser: &Parser, token: Option<&Token>, name: &str) -> bool {
    matches!(token, Some(Token::Identifier(sym)) if parser.resolve(*sym) == name)
}

/// Offset of the token just past the `)` matching the `(` at `offset`.
pub(super) fn offset_after_parens(parser: &Parser, offset: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut index = offset;
    loop {
        match parser.peek_nth(index)? {
            Token::LeftParen | Token::LeftBrace | Token::LeftBracket => depth += 1,
            Token::RightParen | Token::RightBrace | Token::RightBracket => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            Token::Eof => return None,
            _ => {}
        }
        index += 1;
    }
}

/// `(...) =>`, `<T>(...) =>` or `new (...) =>`.
fn is_function_type_start(parser: &Parser) -> bool {
    match parser.current() {
        Token::Less => true,
        Token::New => matches!(parser.peek(), Some(Token::LeftParen) | Some(Token::Less)),
        Token::LeftParen => offset_after_parens(parser, 0)
            .is_some_and(|after| matches!(parser.peek_nth(after), Some(Token::Arrow))),
        _ => false,
    }
}

fn parse_function_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();
    let is_constructor = parser.eat(&Token::New);

    let type_params = if parser.check(&Token::Less) {
        parse_type_parameters(parser)?
    } else {
        Vec::new()
    };
    let params = parse_parameters(parser)?;
    parser.expect(Token::Arrow)?;
    let return_type = parse_return_type_annotation(parser)?;
    let span = parser.combine_spans(&start_span, &return_type.span);

    Ok(TypeAnnotation::new(
        Type::Function(FunctionType {
            is_constructor,
            type_params,
            params,
            return_type: Box::new(return_type),
        }),
        span,
    ))
}

/// Parse union type: A | B | C (a leading `|` is allowed)
fn parse_union_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();
    parser.eat(&Token::Pipe);

    let first = parse_intersection_type(parser)?;
    if !parser.check(&Token::Pipe) {
        return Ok(first);
    }

    let mut members = vec![first];
    let mut guard = LoopGuard::new("union_type");
    while parser.eat(&Token::Pipe) {
        guard.check()?;
        members.push(parse_intersection_type(parser)?);
    }

    let span = parser.combine_spans(&start_span, &parser.previous_span());
    Ok(TypeAnnotation::new(Type::Union(members), span))
}

/// Parse intersection type: A & B (a leading `&` is allowed)
fn parse_intersection_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();
    parser.eat(&Token::Amp);

    let first = parse_type_operator(parser)?;
    if !parser.check(&Token::Amp) {
        return Ok(first);
    }

    let mut members = vec![first];
    let mut guard = LoopGuard::new("intersection_type");
    while parser.eat(&Token::Amp) {
        guard.check()?;
        members.push(parse_type_operator(parser)?);
    }

    let span = parser.combine_spans(&start_span, &parser.previous_span());
    Ok(TypeAnnotation::new(Type::Intersection(members), span))
}

/// Prefix type operators: `keyof T`, `readonly T[]`, `unique symbol`
fn parse_type_operator(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();
    match parser.current() {
        Token::Keyof => {
            parser.advance();
            let operand = parser.nested("keyof", parse_type_operator)?;
            let span = parser.combine_spans(&start_span, &operand.span);
            Ok(TypeAnnotation::new(Type::Keyof(Box::new(operand)), span))
        }
        // readonly only restricts mutation through the type
        Token::Readonly => {
            parser.advance();
            parser.nested("readonly", parse_type_operator)
        }
        _ if (parser.check_identifier("unique") || parser.check_identifier("infer"))
            && matches!(parser.peek(), Some(Token::Identifier(_))) =>
        {
            parser.advance();
            parse_postfix_type(parser)
        }
        _ => parse_postfix_type(parser),
    }
}

/// Postfix array and indexed-access types: `T[]`, `T["key"]`
fn parse_postfix_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();
    let mut ty = parse_primary_type(parser)?;
    let mut guard = LoopGuard::new("postfix_type");

    // A `[` on a new line starts the next member, not an array type
    while parser.check(&Token::LeftBracket)
        && parser.current_span().line == parser.previous_span().line
    {
        guard.check()?;
        parser.advance();
        if parser.check(&Token::RightBracket) {
            parser.advance();
            let span = parser.combine_spans(&start_span, &parser.previous_span());
            ty = TypeAnnotation::new(Type::Array(Box::new(ty)), span);
        } else {
            let index = parse_type_annotation(parser)?;
            parser.expect(Token::RightBracket)?;
            let span = parser.combine_spans(&start_span, &parser.previous_span());
            ty = TypeAnnotation::new(Type::IndexedAccess(Box::new(ty), Box::new(index)), span);
        }
    }

    Ok(ty)
}

fn parse_primary_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start_span = parser.current_span();

    let ty = match parser.current().clone() {
        Token::LeftParen => {
            parser.advance();
            let inner = parse_type_annotation(parser)?;
            parser.expect(Token::RightParen)?;
            Type::Parenthesized(Box::new(inner))
        }
        Token::LeftBrace => Type::Object(parse_type_members(parser)?),
        Token::LeftBracket => Type::Tuple(parse_tuple_elements(parser)?),
        Token::StringLiteral(value) => {
            parser.advance();
            Type::Literal(LiteralType::String(value))
        }
        Token::IntLiteral(n) => {
            parser.advance();
            Type::Literal(LiteralType::Number(n as f64))
        }
        Token::FloatLiteral(n) => {
            parser.advance();
            Type::Literal(LiteralType::Number(n))
        }
        Token::Minus => {
            parser.advance();
            match parser.current().clone() {
                Token::IntLiteral(n) => {
                    parser.advance();
                    Type::Literal(LiteralType::Number(-(n as f64)))
                }
                Token::FloatLiteral(n) => {
                    parser.advance();
                    Type::Literal(LiteralType::Number(-n))
                }
                _ => return Err(parser.unexpected_token(&[Token::IntLiteral(0)])),
            }
        }
        Token::BigIntLiteral(digits) => {
            parser.advance();
            Type::Literal(LiteralType::BigInt(digits))
        }
        Token::TemplateLiteral(_) => {
            parser.advance();
            Type::TemplateLiteral
        }
        Token::True => {
            parser.advance();
            Type::Literal(LiteralType::Boolean(true))
        }
        Token::False => {
            parser.advance();
            Type::Literal(LiteralType::Boolean(false))
        }
        Token::Null => {
            parser.advance();
            Type::Primitive(PrimitiveType::Null)
        }
        Token::Void => {
            parser.advance();
            Type::Primitive(PrimitiveType::Void)
        }
        Token::This => {
            parser.advance();
            Type::This
        }
        Token::Typeof => {
            parser.advance();
            let mut path = vec![parser.parse_identifier(false)?];
            while parser.eat(&Token::Dot) {
                path.push(parser.parse_identifier(true)?);
            }
            Type::Typeof(path)
        }
        Token::Identifier(_) => parse_type_reference(parser)?,
        _ => {
            return Err(parser
                .unexpected_token(&[Token::Identifier(Symbol::dummy())])
                .with_suggestion("Expected a type"))
        }
    };

    let span = parser.combine_spans(&start_span, &parser.previous_span());
    Ok(TypeAnnotation::new(ty, span))
}

/// Parse a named type: `string`, `User`, `ns.User`, `Array<T>`
fn parse_type_reference(parser: &mut Parser) -> Result<Type, ParseError> {
    let mut name = vec![parser.parse_identifier(false)?];
    while parser.check(&Token::Dot) {
        parser.advance();
        name.push(parser.parse_identifier(true)?);
    }

    let type_args = if parser.check(&Token::Less) {
        parse_type_arguments(parser)?
    } else {
        Vec::new()
    };

    if name.len() == 1 && type_args.is_empty() {
        if let Some(primitive) = PrimitiveType::from_keyword(parser.resolve(name[0].name)) {
            return Ok(Type::Primitive(primitive));
        }
    }

    Ok(Type::Reference(TypeReference { name, type_args }))
}

/// Parse type arguments: <T, U>
pub fn parse_type_arguments(parser: &mut Parser) -> Result<Vec<TypeAnnotation>, ParseError> {
    parser.expect(Token::Less)?;
    let mut args = Vec::new();
    let mut guard = LoopGuard::new("type_arguments");

    while !parser.check(&Token::Greater) && !parser.at_eof() {
        guard.check()?;
        args.push(parse_type_annotation(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    parser.expect(Token::Greater)?;
    Ok(args)
}

/// Parse tuple elements: [A, label?: B, ...C[]]
fn parse_tuple_elements(parser: &mut Parser) -> Result<Vec<TupleElement>, ParseError> {
    parser.expect(Token::LeftBracket)?;
    let mut elements = Vec::new();
    let mut guard = LoopGuard::new("tuple_elements");

    while !parser.check(&Token::RightBracket) && !parser.at_eof() {
        guard.check()?;
        let is_rest = parser.eat(&Token::DotDotDot);

        let labelled = matches!(parser.peek(), Some(Token::Colon))
            || (matches!(parser.peek(), Some(Token::Question))
                && matches!(parser.peek_nth(2), Some(Token::Colon)));
        let (label, mut optional) = if labelled {
            let label = parser.parse_identifier(true)?;
            let optional = parser.eat(&Token::Question);
            parser.expect(Token::Colon)?;
            (Some(label), optional)
        } else {
            (None, false)
        };

        let ty = parse_type_annotation(parser)?;
        if parser.eat(&Token::Question) {
            optional = true;
        }

        elements.push(TupleElement {
            label,
            ty,
            optional,
            is_rest,
        });

        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    parser.expect(Token::RightBracket)?;
    Ok(elements)
}

// ============================================================================
// Object type members
// ============================================================================

/// Parse a braced member list shared by object types and interface bodies.
pub fn parse_type_members(parser: &mut Parser) -> Result<Vec<TypeMember>, ParseError> {
    parser.expect(Token::LeftBrace)?;
    let mut members = Vec::new();
    let mut guard = LoopGuard::new("type_members");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        if parser.eat(&Token::Semicolon) || parser.eat(&Token::Comma) {
            continue;
        }
        members.push(parser.nested("type_member", parse_type_member)?);
    }

    parser.expect(Token::RightBrace)?;
    Ok(members)
}

fn parse_type_member(parser: &mut Parser) -> Result<TypeMember, ParseError> {
    let start_span = parser.current_span();
    let doc = parser.doc_comment();

    // Call and construct signatures
    if parser.check(&Token::LeftParen)
        || parser.check(&Token::Less)
        || (parser.check(&Token::New)
            && matches!(parser.peek(), Some(Token::LeftParen) | Some(Token::Less)))
    {
        parser.eat(&Token::New);
        if parser.check(&Token::Less) {
            parse_type_parameters(parser)?;
        }
        parse_parameters(parser)?;
        if parser.eat(&Token::Colon) {
            parse_return_type_annotation(parser)?;
        }
        return Ok(TypeMember::Other(parser.combine_spans(&start_span, &parser.previous_span())));
    }

    let mut is_readonly = false;
    if matches!(parser.current(), Token::Plus | Token::Minus)
        && matches!(parser.peek(), Some(Token::Readonly))
    {
        parser.advance();
    }
    if parser.check(&Token::Readonly) && !ends_member_name(parser.peek()) {
        parser.advance();
        is_readonly = true;
    }

    if parser.check(&Token::LeftBracket) && matches!(parser.peek(), Some(Token::Identifier(_))) {
        match parser.peek_nth(2) {
            Some(Token::Colon) => {
                return parse_index_signature(parser, is_readonly).map(TypeMember::Index);
            }
            // Mapped type: [K in keyof T]?: V
            Some(Token::In) => {
                skip_balanced(parser)?;
                if matches!(parser.current(), Token::Plus | Token::Minus) {
                    parser.advance();
                }
                parser.eat(&Token::Question);
                parser.expect(Token::Colon)?;
                let value = parse_type_annotation(parser)?;
                return Ok(TypeMember::Other(parser.combine_spans(&start_span, &value.span)));
            }
            _ => {}
        }
    }

    let getter = parser.check_identifier("get") && starts_property_name(parser.peek());
    let setter = parser.check_identifier("set") && starts_property_name(parser.peek());
    if getter || setter {
        parser.advance();
        let name = parse_property_name(parser)?;
        parse_parameters(parser)?;
        let return_type = if parser.eat(&Token::Colon) {
            Some(parse_return_type_annotation(parser)?)
        } else {
            None
        };
        let span = parser.combine_spans(&start_span, &parser.previous_span());
        if setter {
            return Ok(TypeMember::Other(span));
        }
        return Ok(TypeMember::Property(PropertySignature {
            doc,
            is_readonly: true,
            name,
            optional: false,
            type_annotation: return_type,
            span,
        }));
    }

    let name = parse_property_name(parser)?;
    let optional = parser.eat(&Token::Question);

    if parser.check(&Token::LeftParen) || parser.check(&Token::Less) {
        if parser.check(&Token::Less) {
            parse_type_parameters(parser)?;
        }
        let params = parse_parameters(parser)?;
        let return_type = if parser.eat(&Token::Colon) {
            Some(parse_return_type_annotation(parser)?)
        } else {
            None
        };
        let span = parser.combine_spans(&start_span, &parser.previous_span());
        return Ok(TypeMember::Method(MethodSignature {
            doc,
            name,
            optional,
            params,
            return_type,
            span,
        }));
    }

    let type_annotation = if parser.eat(&Token::Colon) {
        Some(parse_type_annotation(parser)?)
    } else {
        None
    };

    let span = parser.combine_spans(&start_span, &parser.previous_span());
    Ok(TypeMember::Property(PropertySignature {
        doc,
        is_readonly,
        name,
        optional,
        type_annotation,
        span,
    }))
}

/// Parse an index signature: [key: string]: T
pub fn parse_index_signature(
    parser: &mut Parser,
    is_readonly: bool,
) -> Result<IndexSignature, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::LeftBracket)?;
    let key_name = parser.parse_identifier(true)?;
    parser.expect(Token::Colon)?;
    let key_type = parse_type_annotation(parser)?;
    parser.expect(Token::RightBracket)?;
    parser.expect(Token::Colon)?;
    let value_type = parse_type_annotation(parser)?;
    let span: Span = parser.combine_spans(&start_span, &value_type.span);

    Ok(IndexSignature {
        is_readonly,
        key_name,
        key_type,
        value_type,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    fn parse_type(source: &str) -> (TypeAnnotation, Interner) {
        let mut parser = Parser::new(source).unwrap();
        let ty = parse_type_annotation(&mut parser).expect("type should parse");
        assert!(parser.at_eof(), "trailing tokens after type in {:?}", source);
        let (_, interner) = parser.parse().unwrap();
        (ty, interner)
    }

    #[test]
    fn test_primitive_and_reference() {
        let (ty, _) = parse_type("string");
        assert_eq!(ty.ty, Type::Primitive(PrimitiveType::String));

        let (ty, interner) = parse_type("models.User");
        match ty.ty {
            Type::Reference(reference) => {
                assert_eq!(reference.name.len(), 2);
                let base = reference.base().unwrap();
                assert_eq!(interner.resolve(base.name), "User");
            }
            other => panic!("Expected Reference, got {:?}", other),
        }
    }

    #[test]
    fn test_union_with_leading_pipe_and_array() {
        let (ty, _) = parse_type("| string[] | undefined");
        match ty.ty {
            Type::Union(members) => {
                assert_eq!(members.len(), 2);
                assert!(matches!(members[0].ty, Type::Array(_)));
                assert_eq!(members[1].ty, Type::Primitive(PrimitiveType::Undefined));
            }
            other => panic!("Expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_generics() {
        let (ty, _) = parse_type("Map<string, Array<Set<number>>>");
        match ty.ty {
            Type::Reference(reference) => assert_eq!(reference.type_args.len(), 2),
            other => panic!("Expected Reference, got {:?}", other),
        }
    }

    #[test]
    fn test_function_types() {
        let (ty, _) = parse_type("(a: string, b?: number) => void");
        match ty.ty {
            Type::Function(func) => {
                assert_eq!(func.params.len(), 2);
                assert!(!func.is_constructor);
            }
            other => panic!("Expected Function, got {:?}", other),
        }

        let (ty, _) = parse_type("(string | number)[]");
        assert!(matches!(ty.ty, Type::Array(_)));
    }

    #[test]
    fn test_literal_types() {
        let (ty, _) = parse_type("'a' | -1 | true | 10n");
        match ty.ty {
            Type::Union(members) => {
                assert!(matches!(members[1].ty, Type::Literal(LiteralType::Number(n)) if n == -1.0));
                assert_eq!(members[2].ty, Type::Literal(LiteralType::Boolean(true)));
                assert!(matches!(members[3].ty, Type::Literal(LiteralType::BigInt(_))));
            }
            other => panic!("Expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_and_object() {
        let (ty, _) = parse_type("[name: string, age?: number, ...rest: boolean[]]");
        match ty.ty {
            Type::Tuple(elements) => {
                assert_eq!(elements.len(), 3);
                assert!(elements[1].optional);
                assert!(elements[2].is_rest);
            }
            other => panic!("Expected Tuple, got {:?}", other),
        }

        let (ty, _) = parse_type("{ readonly a: string; b?: number, c(): void; [k: string]: any }");
        match ty.ty {
            Type::Object(members) => {
                assert_eq!(members.len(), 4);
                assert!(matches!(&members[0], TypeMember::Property(p) if p.is_readonly));
                assert!(matches!(members[2], TypeMember::Method(_)));
                assert!(matches!(members[3], TypeMember::Index(_)));
            }
            other => panic!("Expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_type_predicate_return() {
        let mut parser = Parser::new("value is User").unwrap();
        let ty = parse_return_type_annotation(&mut parser).unwrap();
        assert_eq!(ty.ty, Type::Primitive(PrimitiveType::Boolean));
    }

    #[test]
    fn test_keyof_and_indexed_access() {
        let (ty, _) = parse_type("keyof User['profile']");
        match ty.ty {
            Type::Keyof(inner) => assert!(matches!(inner.ty, Type::IndexedAccess(_, _))),
            other => panic!("Expected Keyof, got {:?}", other),
        }
    }
}
