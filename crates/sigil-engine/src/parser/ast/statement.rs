//! Declaration AST nodes
//!
//! Top-level statements of a declaration source. Only the declarations the
//! classifier and emitter care about are modelled in detail; everything else
//! (functions, variables, enums, expression statements) is kept as a span.

use super::*;
use crate::parser::token::Span;

/// Top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// import { A, B as C } from "module";
    Import(ImportDecl),

    /// class declaration (possibly decorated)
    Class(ClassDecl),

    /// interface declaration
    Interface(InterfaceDecl),

    /// type alias: type Name<T> = ...;
    TypeAlias(TypeAliasDecl),

    /// Any other statement; skipped token-balanced
    Other(Span),
}

impl Statement {
    /// Get the span of this statement
    pub fn span(&self) -> &Span {
        match self {
            Statement::Import(s) => &s.span,
            Statement::Class(s) => &s.span,
            Statement::Interface(s) => &s.span,
            Statement::TypeAlias(s) => &s.span,
            Statement::Other(span) => span,
        }
    }
}

// ============================================================================
// Imports
// ============================================================================

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: StringLiteral,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// import { name } / import { name as alias }
    Named {
        name: Identifier,
        alias: Option<Identifier>,
    },
    /// import name from "module"
    Default(Identifier),
    /// import * as name from "module"
    Namespace(Identifier),
}

impl ImportSpecifier {
    /// The name bound in the importing module.
    pub fn local(&self) -> &Identifier {
        match self {
            ImportSpecifier::Named { name, alias } => alias.as_ref().unwrap_or(name),
            ImportSpecifier::Default(id) | ImportSpecifier::Namespace(id) => id,
        }
    }

    /// The name as declared in the source module.
    pub fn imported(&self) -> &Identifier {
        match self {
            ImportSpecifier::Named { name, .. } => name,
            ImportSpecifier::Default(id) | ImportSpecifier::Namespace(id) => id,
        }
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Decorator: @name, @ns.name, @name(args)
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub expression: Expression,
    pub span: Span,
}

impl Decorator {
    /// The decorated name with any namespace prefix and call removed:
    /// `@orm.Attr({..})` gives the `Attr` identifier.
    pub fn name(&self) -> Option<&Identifier> {
        let mut expr = &self.expression;
        loop {
            match expr {
                Expression::Call(call) => expr = &call.callee,
                Expression::Member(member) => return Some(&member.property),
                Expression::Identifier(id) => return Some(id),
                _ => return None,
            }
        }
    }

    /// Arguments of the outermost call, or an empty slice for a bare decorator.
    pub fn arguments(&self) -> &[Expression] {
        match &self.expression {
            Expression::Call(call) => &call.arguments,
            _ => &[],
        }
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Modifiers shared by class members and parameter properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_readonly: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    pub is_declare: bool,
    pub is_override: bool,
}

impl Modifiers {
    /// `private` or `protected` (including `#private` names)
    pub fn is_hidden(&self) -> bool {
        self.visibility != Visibility::Public
    }
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub doc: Option<DocComment>,
    pub decorators: Vec<Decorator>,
    pub is_abstract: bool,
    pub is_exported: bool,
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub extends: Option<TypeAnnotation>,
    pub implements: Vec<TypeAnnotation>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Accessor(AccessorDecl),
    Constructor(ConstructorDecl),
    /// Index signatures and static blocks
    Other(Span),
}

impl ClassMember {
    pub fn span(&self) -> &Span {
        match self {
            ClassMember::Field(m) => &m.span,
            ClassMember::Method(m) => &m.span,
            ClassMember::Accessor(m) => &m.span,
            ClassMember::Constructor(m) => &m.span,
            ClassMember::Other(span) => span,
        }
    }
}

/// Name of a class member or object type member
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyName {
    Identifier(Identifier),
    StringLiteral(StringLiteral),
    NumericLiteral(f64, Span),
    /// `#name`; the identifier excludes the hash
    Private(Identifier),
    /// `[expr]`
    Computed(Box<Expression>, Span),
}

impl PropertyName {
    pub fn span(&self) -> &Span {
        match self {
            PropertyName::Identifier(id) | PropertyName::Private(id) => &id.span,
            PropertyName::StringLiteral(s) => &s.span,
            PropertyName::NumericLiteral(_, span) | PropertyName::Computed(_, span) => span,
        }
    }

    /// Static text of the name; `None` for computed names.
    pub fn text(&self, interner: &crate::parser::interner::Interner) -> Option<String> {
        match self {
            PropertyName::Identifier(id) => Some(interner.resolve(id.name).to_string()),
            PropertyName::Private(id) => Some(format!("#{}", interner.resolve(id.name))),
            PropertyName::StringLiteral(s) => Some(interner.resolve(s.value).to_string()),
            PropertyName::NumericLiteral(n, _) => Some(n.to_string()),
            PropertyName::Computed(..) => None,
        }
    }
}

/// Field declaration: `@Attr() private readonly name?: string = "x";`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub doc: Option<DocComment>,
    pub decorators: Vec<Decorator>,
    pub modifiers: Modifiers,
    pub name: PropertyName,
    /// `?` marker
    pub optional: bool,
    /// `!` definite-assignment marker
    pub definite: bool,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// Method declaration; the body is skipped
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub doc: Option<DocComment>,
    pub decorators: Vec<Decorator>,
    pub modifiers: Modifiers,
    pub name: PropertyName,
    pub optional: bool,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub has_body: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
}

/// `get name(): T { }` / `set name(v: T) { }`
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorDecl {
    pub doc: Option<DocComment>,
    pub decorators: Vec<Decorator>,
    pub modifiers: Modifiers,
    pub kind: AccessorKind,
    pub name: PropertyName,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub span: Span,
}

/// Constructor; the body is skipped
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub params: Vec<Parameter>,
    pub span: Span,
}

/// Function, method or constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub decorators: Vec<Decorator>,
    /// Parameter-property modifiers (`constructor(private readonly x: T)`)
    pub modifiers: Modifiers,
    pub name: ParameterName,
    pub optional: bool,
    pub is_rest: bool,
    pub type_annotation: Option<TypeAnnotation>,
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterName {
    Identifier(Identifier),
    /// Destructuring pattern, skipped
    Pattern(Span),
}

impl ParameterName {
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            ParameterName::Identifier(id) => Some(id),
            ParameterName::Pattern(_) => None,
        }
    }
}

/// Type parameter: `T`, `T extends X`, `T = D`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParameter {
    pub name: Identifier,
    pub constraint: Option<TypeAnnotation>,
    pub default: Option<TypeAnnotation>,
    pub span: Span,
}

// ============================================================================
// Interfaces and aliases
// ============================================================================

/// interface Name<T> extends A, B { members }
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub doc: Option<DocComment>,
    pub is_exported: bool,
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub extends: Vec<TypeAnnotation>,
    pub members: Vec<TypeMember>,
    pub span: Span,
}

/// type Name<T> = type;
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub doc: Option<DocComment>,
    pub is_exported: bool,
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}
