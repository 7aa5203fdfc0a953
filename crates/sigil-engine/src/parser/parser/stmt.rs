//! Statement and declaration parsing

use super::guards::LoopGuard;
use super::recovery::{skip_balanced, skip_statement};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

/// Parse a top-level statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    parser.nested("statement", parse_statement_inner)
}

fn parse_statement_inner(parser: &mut Parser) -> Result<Statement, ParseError> {
    let doc = parser.doc_comment();

    match parser.current() {
        Token::Import => parse_import_declaration(parser),
        Token::At | Token::Class | Token::Abstract | Token::Export | Token::Declare => {
            parse_declaration(parser, doc)
        }
        Token::Interface => parse_interface_declaration(parser, doc, false).map(Statement::Interface),
        Token::Type if matches!(parser.peek(), Some(Token::Identifier(_))) => {
            parse_type_alias_declaration(parser, doc, false).map(Statement::TypeAlias)
        }
        Token::Semicolon => {
            let span = parser.current_span();
            parser.advance();
            Ok(Statement::Other(span))
        }
        _ => skip_statement(parser).map(Statement::Other),
    }
}

/// Parse a declaration that may carry decorators and `export` / `declare`
/// / `abstract` prefixes in any order.
fn parse_declaration(parser: &mut Parser, doc: Option<DocComment>) -> Result<Statement, ParseError> {
    let start_span = parser.current_span();
    let mut decorators = parse_decorators(parser)?;
    let mut is_exported = false;
    let mut is_abstract = false;
    let mut guard = LoopGuard::new("declaration_prefix");

    loop {
        guard.check()?;
        match parser.current() {
            Token::Export => {
                is_exported = true;
                parser.advance();
                if parser.check_identifier("default") {
                    parser.advance();
                }
            }
            Token::Declare => {
                parser.advance();
            }
            Token::Abstract => {
                is_abstract = true;
                parser.advance();
            }
            // `export @Model() class` puts decorators after the keyword
            Token::At => decorators.extend(parse_decorators(parser)?),
            _ => break,
        }
    }

    match parser.current() {
        Token::Class => {
            let class = parse_class_declaration(parser, ClassPrefix {
                doc,
                decorators,
                is_abstract,
                is_exported,
                start_span,
            })?;
            Ok(Statement::Class(class))
        }
        Token::Interface if decorators.is_empty() => {
            parse_interface_declaration(parser, doc, is_exported).map(Statement::Interface)
        }
        Token::Type
            if decorators.is_empty() && matches!(parser.peek(), Some(Token::Identifier(_))) =>
        {
            parse_type_alias_declaration(parser, doc, is_exported).map(Statement::TypeAlias)
        }
        _ if !decorators.is_empty() || is_abstract => {
            Err(parser.unexpected_token(&[Token::Class]))
        }
        _ => {
            let rest = skip_statement(parser)?;
            Ok(Statement::Other(parser.combine_spans(&start_span, &rest)))
        }
    }
}

// ============================================================================
// Imports
// ============================================================================

/// Parse import declaration
fn parse_import_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::Import)?;

    // `import type { A } from "x"` imports only types; the distinction does
    // not matter here
    if parser.check(&Token::Type)
        && matches!(
            parser.peek(),
            Some(Token::LeftBrace) | Some(Token::Star) | Some(Token::Identifier(_))
        )
    {
        parser.advance();
    }

    let mut specifiers = Vec::new();

    if parser.check(&Token::LeftBrace) {
        parser.advance();
        specifiers = parse_named_imports(parser)?;
        parser.expect(Token::RightBrace)?;
        parser.expect(Token::From)?;
    } else if parser.check(&Token::Star) {
        parser.advance();
        parser.expect(Token::As)?;
        specifiers.push(ImportSpecifier::Namespace(parser.parse_identifier(false)?));
        parser.expect(Token::From)?;
    } else if let Token::Identifier(_) = parser.current() {
        specifiers.push(ImportSpecifier::Default(parser.parse_identifier(false)?));

        // import foo, { bar } from "module"
        if parser.eat(&Token::Comma) {
            if parser.eat(&Token::LeftBrace) {
                specifiers.extend(parse_named_imports(parser)?);
                parser.expect(Token::RightBrace)?;
            } else {
                parser.expect(Token::Star)?;
                parser.expect(Token::As)?;
                specifiers.push(ImportSpecifier::Namespace(parser.parse_identifier(false)?));
            }
        }
        parser.expect(Token::From)?;
    }
    // Otherwise a side-effect import: import "module";

    let source = if let Token::StringLiteral(value) = parser.current() {
        let literal = StringLiteral {
            value: *value,
            span: parser.current_span(),
        };
        parser.advance();
        literal
    } else {
        return Err(parser.unexpected_token(&[Token::StringLiteral(Symbol::dummy())]));
    };

    parser.eat(&Token::Semicolon);

    let span = parser.combine_spans(&start_span, &source.span);
    Ok(Statement::Import(ImportDecl {
        specifiers,
        source,
        span,
    }))
}

/// Parse named imports: foo, bar as baz, type qux
fn parse_named_imports(parser: &mut Parser) -> Result<Vec<ImportSpecifier>, ParseError> {
    let mut specifiers = Vec::new();
    let mut guard = LoopGuard::new("named_imports");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;

        if parser.check(&Token::Type)
            && !matches!(parser.peek(), Some(Token::Comma) | Some(Token::RightBrace) | Some(Token::As))
        {
            parser.advance();
        }

        let name = parser.parse_identifier(true)?;
        let alias = if parser.eat(&Token::As) {
            Some(parser.parse_identifier(true)?)
        } else {
            None
        };

        specifiers.push(ImportSpecifier::Named { name, alias });

        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    Ok(specifiers)
}

// ============================================================================
// Class Declaration
// ============================================================================

struct ClassPrefix {
    doc: Option<DocComment>,
    decorators: Vec<Decorator>,
    is_abstract: bool,
    is_exported: bool,
    start_span: Span,
}

/// Parse class declaration after its prefix (decorators, modifiers)
fn parse_class_declaration(parser: &mut Parser, prefix: ClassPrefix) -> Result<ClassDecl, ParseError> {
    parser.expect(Token::Class)?;

    let name = parser.parse_identifier(false)?;

    let type_params = if parser.check(&Token::Less) {
        parse_type_parameters(parser)?
    } else {
        Vec::new()
    };

    let extends = if parser.eat(&Token::Extends) {
        Some(super::types::parse_type_annotation(parser)?)
    } else {
        None
    };

    let mut implements = Vec::new();
    if parser.eat(&Token::Implements) {
        let mut guard = LoopGuard::new("implements_clause");
        loop {
            guard.check()?;
            implements.push(super::types::parse_type_annotation(parser)?);
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }

    parser.expect(Token::LeftBrace)?;
    let members = parse_class_members(parser)?;
    let end_span = parser.current_span();
    parser.expect(Token::RightBrace)?;

    let span = parser.combine_spans(&prefix.start_span, &end_span);

    Ok(ClassDecl {
        doc: prefix.doc,
        decorators: prefix.decorators,
        is_abstract: prefix.is_abstract,
        is_exported: prefix.is_exported,
        name,
        type_params,
        extends,
        implements,
        members,
        span,
    })
}

/// Parse class members (fields, methods, accessors, constructor)
fn parse_class_members(parser: &mut Parser) -> Result<Vec<ClassMember>, ParseError> {
    let mut members = Vec::new();
    let mut guard = LoopGuard::new("class_members");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        if parser.eat(&Token::Semicolon) {
            continue;
        }
        members.push(parser.nested("class_member", parse_class_member)?);
    }

    Ok(members)
}

/// Tokens after which a modifier keyword is actually the member name:
/// `readonly: boolean`, `static()`, `private?: string`.
pub(super) fn ends_member_name(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(Token::LeftParen)
            | Some(Token::Colon)
            | Some(Token::Question)
            | Some(Token::Equal)
            | Some(Token::Semicolon)
            | Some(Token::Bang)
            | Some(Token::Less)
            | Some(Token::RightBrace)
            | Some(Token::Comma)
            | Some(Token::Eof)
            | None
    )
}

/// Tokens that can begin a property name.
pub(super) fn starts_property_name(token: Option<&Token>) -> bool {
    match token {
        Some(Token::Identifier(_))
        | Some(Token::StringLiteral(_))
        | Some(Token::IntLiteral(_))
        | Some(Token::FloatLiteral(_))
        | Some(Token::LeftBracket)
        | Some(Token::Hash) => true,
        Some(other) => other.is_keyword(),
        None => false,
    }
}

/// Parse member modifiers (visibility, static, readonly, ...).
pub(super) fn parse_modifiers(parser: &mut Parser) -> Result<Modifiers, ParseError> {
    let mut modifiers = Modifiers::default();
    let mut guard = LoopGuard::new("modifiers");

    loop {
        guard.check()?;
        if ends_member_name(parser.peek()) {
            break;
        }
        match parser.current() {
            Token::Private => modifiers.visibility = Visibility::Private,
            Token::Protected => modifiers.visibility = Visibility::Protected,
            Token::Public => modifiers.visibility = Visibility::Public,
            Token::Static => modifiers.is_static = true,
            Token::Readonly => modifiers.is_readonly = true,
            Token::Abstract => modifiers.is_abstract = true,
            Token::Async => modifiers.is_async = true,
            Token::Declare => modifiers.is_declare = true,
            _ if parser.check_identifier("override") => modifiers.is_override = true,
            _ if parser.check_identifier("accessor") => {}
            _ => break,
        }
        parser.advance();
    }

    Ok(modifiers)
}

/// Parse a single class member
fn parse_class_member(parser: &mut Parser) -> Result<ClassMember, ParseError> {
    let start_span = parser.current_span();
    let doc = parser.doc_comment();
    let decorators = parse_decorators(parser)?;
    let mut modifiers = parse_modifiers(parser)?;

    // static { ... } initialization block
    if modifiers.is_static && parser.check(&Token::LeftBrace) {
        let end = skip_balanced(parser)?;
        return Ok(ClassMember::Other(parser.combine_spans(&start_span, &end)));
    }

    // Index signature: [key: string]: T;
    if parser.check(&Token::LeftBracket)
        && matches!(parser.peek(), Some(Token::Identifier(_)))
        && matches!(parser.peek_nth(2), Some(Token::Colon))
    {
        let signature = super::types::parse_index_signature(parser, modifiers.is_readonly)?;
        parser.eat(&Token::Semicolon);
        return Ok(ClassMember::Other(parser.combine_spans(&start_span, &signature.span)));
    }

    // get / set accessors
    let accessor = if parser.check_identifier("get") && starts_property_name(parser.peek()) {
        Some(AccessorKind::Get)
    } else if parser.check_identifier("set") && starts_property_name(parser.peek()) {
        Some(AccessorKind::Set)
    } else {
        None
    };
    if let Some(kind) = accessor {
        parser.advance();
        let name = parse_property_name(parser)?;
        let params = parse_parameters(parser)?;
        let return_type = parse_return_type(parser)?;
        let end = parse_optional_body(parser)?;
        let span = parser.combine_spans(&start_span, &end);
        return Ok(ClassMember::Accessor(AccessorDecl {
            doc,
            decorators,
            modifiers,
            kind,
            name,
            params,
            return_type,
            span,
        }));
    }

    if parser.check_identifier("constructor") && matches!(parser.peek(), Some(Token::LeftParen)) {
        parser.advance();
        let params = parse_parameters(parser)?;
        let end = parse_optional_body(parser)?;
        let span = parser.combine_spans(&start_span, &end);
        return Ok(ClassMember::Constructor(ConstructorDecl { params, span }));
    }

    let name = parse_property_name(parser)?;
    if matches!(name, PropertyName::Private(_)) {
        modifiers.visibility = Visibility::Private;
    }

    let optional = parser.eat(&Token::Question);
    let definite = parser.eat(&Token::Bang);

    if parser.check(&Token::Less) || parser.check(&Token::LeftParen) {
        let type_params = if parser.check(&Token::Less) {
            parse_type_parameters(parser)?
        } else {
            Vec::new()
        };
        let params = parse_parameters(parser)?;
        let return_type = parse_return_type(parser)?;
        let has_body = parser.check(&Token::LeftBrace);
        let end = parse_optional_body(parser)?;
        let span = parser.combine_spans(&start_span, &end);

        return Ok(ClassMember::Method(MethodDecl {
            doc,
            decorators,
            modifiers,
            name,
            optional,
            type_params,
            params,
            return_type,
            has_body,
            span,
        }));
    }

    let type_annotation = if parser.eat(&Token::Colon) {
        Some(super::types::parse_type_annotation(parser)?)
    } else {
        None
    };

    let initializer = if parser.eat(&Token::Equal) {
        Some(super::expr::parse_expression(parser)?)
    } else {
        None
    };

    let end_span = match (&initializer, &type_annotation) {
        (Some(init), _) => *init.span(),
        (None, Some(ty)) => ty.span,
        (None, None) => *name.span(),
    };
    parser.eat(&Token::Semicolon);

    let span = parser.combine_spans(&start_span, &end_span);

    Ok(ClassMember::Field(FieldDecl {
        doc,
        decorators,
        modifiers,
        name,
        optional,
        definite,
        type_annotation,
        initializer,
        span,
    }))
}

/// `: T` after a parameter list
fn parse_return_type(parser: &mut Parser) -> Result<Option<TypeAnnotation>, ParseError> {
    if parser.eat(&Token::Colon) {
        Ok(Some(super::types::parse_return_type_annotation(parser)?))
    } else {
        Ok(None)
    }
}

/// Skip a `{ ... }` body, or consume the `;` of a body-less signature.
/// Returns the span of the last consumed token.
fn parse_optional_body(parser: &mut Parser) -> Result<Span, ParseError> {
    if parser.check(&Token::LeftBrace) {
        skip_balanced(parser)
    } else {
        let span = parser.previous_span();
        parser.eat(&Token::Semicolon);
        Ok(span)
    }
}

/// Parse a property name: identifier, keyword, string, number, `#private`
/// or `[computed]`.
pub(super) fn parse_property_name(parser: &mut Parser) -> Result<PropertyName, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::StringLiteral(value) => {
            parser.advance();
            Ok(PropertyName::StringLiteral(StringLiteral { value, span }))
        }
        Token::IntLiteral(n) => {
            parser.advance();
            Ok(PropertyName::NumericLiteral(n as f64, span))
        }
        Token::FloatLiteral(n) => {
            parser.advance();
            Ok(PropertyName::NumericLiteral(n, span))
        }
        Token::Hash => {
            parser.advance();
            let id = parser.parse_identifier(true)?;
            Ok(PropertyName::Private(id))
        }
        Token::LeftBracket => {
            parser.advance();
            let expr = super::expr::parse_expression(parser)?;
            let end = parser.current_span();
            parser.expect(Token::RightBracket)?;
            Ok(PropertyName::Computed(
                Box::new(expr),
                parser.combine_spans(&span, &end),
            ))
        }
        _ => Ok(PropertyName::Identifier(parser.parse_identifier(true)?)),
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Parse a parenthesized parameter list: (a: T, @Arg() b?: U = 1, ...rest)
pub fn parse_parameters(parser: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut params = Vec::new();
    let mut guard = LoopGuard::new("parameters");

    while !parser.check(&Token::RightParen) && !parser.at_eof() {
        guard.check()?;
        params.push(parse_parameter(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    parser.expect(Token::RightParen)?;
    Ok(params)
}

fn parse_parameter(parser: &mut Parser) -> Result<Parameter, ParseError> {
    let start_span = parser.current_span();
    let decorators = parse_decorators(parser)?;
    let modifiers = parse_modifiers(parser)?;
    let is_rest = parser.eat(&Token::DotDotDot);

    let name = match parser.current() {
        Token::LeftBrace | Token::LeftBracket => ParameterName::Pattern(skip_balanced(parser)?),
        Token::This => {
            let span = parser.current_span();
            parser.advance();
            let sym = parser.intern("this");
            ParameterName::Identifier(Identifier::new(sym, span))
        }
        _ => ParameterName::Identifier(parser.parse_identifier(true)?),
    };

    let optional = parser.eat(&Token::Question);

    let type_annotation = if parser.eat(&Token::Colon) {
        Some(super::types::parse_type_annotation(parser)?)
    } else {
        None
    };

    let default = if parser.eat(&Token::Equal) {
        Some(super::expr::parse_expression(parser)?)
    } else {
        None
    };

    let span = parser.combine_spans(&start_span, &parser.previous_span());

    Ok(Parameter {
        decorators,
        modifiers,
        name,
        optional,
        is_rest,
        type_annotation,
        default,
        span,
    })
}

/// Parse type parameters (generics): <T, U extends X = D>
pub fn parse_type_parameters(parser: &mut Parser) -> Result<Vec<TypeParameter>, ParseError> {
    parser.expect(Token::Less)?;
    let mut type_params = Vec::new();
    let mut guard = LoopGuard::new("type_parameters");

    while !parser.check(&Token::Greater) && !parser.at_eof() {
        guard.check()?;
        let start_span = parser.current_span();

        // Variance and const modifiers carry no meaning here
        if matches!(parser.current(), Token::In | Token::Const)
            || parser.check_identifier("out")
        {
            if matches!(parser.peek(), Some(Token::Identifier(_))) {
                parser.advance();
            }
        }

        let name = parser.parse_identifier(false)?;

        let constraint = if parser.eat(&Token::Extends) {
            Some(super::types::parse_type_annotation(parser)?)
        } else {
            None
        };

        let default = if parser.eat(&Token::Equal) {
            Some(super::types::parse_type_annotation(parser)?)
        } else {
            None
        };

        let span = parser.combine_spans(&start_span, &parser.previous_span());
        type_params.push(TypeParameter {
            name,
            constraint,
            default,
            span,
        });

        if !parser.check(&Token::Greater) {
            parser.expect(Token::Comma)?;
        }
    }

    parser.expect(Token::Greater)?;
    Ok(type_params)
}

// ============================================================================
// Interfaces and aliases
// ============================================================================

fn parse_interface_declaration(
    parser: &mut Parser,
    doc: Option<DocComment>,
    is_exported: bool,
) -> Result<InterfaceDecl, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::Interface)?;
    let name = parser.parse_identifier(false)?;

    let type_params = if parser.check(&Token::Less) {
        parse_type_parameters(parser)?
    } else {
        Vec::new()
    };

    let mut extends = Vec::new();
    if parser.eat(&Token::Extends) {
        let mut guard = LoopGuard::new("interface_extends");
        loop {
            guard.check()?;
            extends.push(super::types::parse_type_annotation(parser)?);
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }

    let members = super::types::parse_type_members(parser)?;
    let span = parser.combine_spans(&start_span, &parser.previous_span());

    Ok(InterfaceDecl {
        doc,
        is_exported,
        name,
        type_params,
        extends,
        members,
        span,
    })
}

/// Parse type alias declaration: type Foo = SomeType; or type Bar<T> = GenericType<T>;
fn parse_type_alias_declaration(
    parser: &mut Parser,
    doc: Option<DocComment>,
    is_exported: bool,
) -> Result<TypeAliasDecl, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::Type)?;

    let name = parser.parse_identifier(false)?;

    let type_params = if parser.check(&Token::Less) {
        parse_type_parameters(parser)?
    } else {
        Vec::new()
    };

    parser.expect(Token::Equal)?;
    let type_annotation = super::types::parse_type_annotation(parser)?;
    parser.eat(&Token::Semicolon);

    let span = parser.combine_spans(&start_span, &type_annotation.span);

    Ok(TypeAliasDecl {
        doc,
        is_exported,
        name,
        type_params,
        type_annotation,
        span,
    })
}

// ============================================================================
// Decorator Parsing
// ============================================================================

/// Parse decorators: @name or @name(args)
pub fn parse_decorators(parser: &mut Parser) -> Result<Vec<Decorator>, ParseError> {
    let mut decorators = Vec::new();
    let mut guard = LoopGuard::new("decorators");

    while parser.check(&Token::At) {
        guard.check()?;
        decorators.push(parse_decorator(parser)?);
    }

    Ok(decorators)
}

/// Parse a single decorator: @name, @ns.name, @name(args), @name(args)(args)
fn parse_decorator(parser: &mut Parser) -> Result<Decorator, ParseError> {
    let start_span = parser.current_span();
    parser.expect(Token::At)?;

    let first = parser.parse_identifier(false)?;
    let mut expression = Expression::Identifier(first);

    // Handle member access: @module.decorator
    while parser.eat(&Token::Dot) {
        let property = parser.parse_identifier(true)?;
        let span = parser.combine_spans(expression.span(), &property.span);
        expression = Expression::Member(MemberExpression {
            object: Box::new(expression),
            property,
            optional: false,
            span,
        });
    }

    // Check for call(s): @decorator(args) or chained @decorator(args1)(args2)
    while parser.check(&Token::LeftParen) {
        let call_start = *expression.span();
        let arguments = super::expr::parse_arguments(parser)?;
        let span = parser.combine_spans(&call_start, &parser.previous_span());
        expression = Expression::Call(CallExpression {
            callee: Box::new(expression),
            type_args: Vec::new(),
            arguments,
            optional: false,
            span,
        });
    }

    let span = parser.combine_spans(&start_span, expression.span());
    Ok(Decorator { expression, span })
}
