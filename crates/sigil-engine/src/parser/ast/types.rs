//! Type expression AST nodes

use super::*;
use crate::parser::interner::Symbol;
use crate::parser::token::Span;

/// A type expression with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub ty: Type,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(ty: Type, span: Span) -> Self {
        Self { ty, span }
    }

    /// Strip any number of surrounding parentheses.
    pub fn unparenthesized(&self) -> &TypeAnnotation {
        let mut current = self;
        while let Type::Parenthesized(inner) = &current.ty {
            current = inner;
        }
        current
    }
}

/// Type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Keyword types: string, number, any, ...
    Primitive(PrimitiveType),

    /// Named reference with optional type arguments: `A.B<T>`
    Reference(TypeReference),

    /// Literal types: "a", 42, -1, true, 10n
    Literal(LiteralType),

    /// Template literal type; only its string-ness matters
    TemplateLiteral,

    /// `T[]`
    Array(Box<TypeAnnotation>),

    /// `[A, B?, ...C[]]`
    Tuple(Vec<TupleElement>),

    /// `A | B`
    Union(Vec<TypeAnnotation>),

    /// `A & B`
    Intersection(Vec<TypeAnnotation>),

    /// `(T)`
    Parenthesized(Box<TypeAnnotation>),

    /// `{ a: T; b?: U }`
    Object(Vec<TypeMember>),

    /// `(x: T) => U`, `new (x: T) => U`
    Function(FunctionType),

    /// `typeof value.path`
    Typeof(Vec<Identifier>),

    /// `keyof T`
    Keyof(Box<TypeAnnotation>),

    /// `T["key"]`
    IndexedAccess(Box<TypeAnnotation>, Box<TypeAnnotation>),

    /// `this`
    This,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Any,
    Unknown,
    Never,
    Void,
    Null,
    Undefined,
    Object,
}

impl PrimitiveType {
    /// Map a keyword spelling to a primitive type.
    pub fn from_keyword(name: &str) -> Option<Self> {
        let ty = match name {
            "string" => PrimitiveType::String,
            "number" => PrimitiveType::Number,
            "boolean" => PrimitiveType::Boolean,
            "bigint" => PrimitiveType::BigInt,
            "symbol" => PrimitiveType::Symbol,
            "any" => PrimitiveType::Any,
            "unknown" => PrimitiveType::Unknown,
            "never" => PrimitiveType::Never,
            "void" => PrimitiveType::Void,
            "null" => PrimitiveType::Null,
            "undefined" => PrimitiveType::Undefined,
            "object" => PrimitiveType::Object,
            _ => return None,
        };
        Some(ty)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::BigInt => "bigint",
            PrimitiveType::Symbol => "symbol",
            PrimitiveType::Any => "any",
            PrimitiveType::Unknown => "unknown",
            PrimitiveType::Never => "never",
            PrimitiveType::Void => "void",
            PrimitiveType::Null => "null",
            PrimitiveType::Undefined => "undefined",
            PrimitiveType::Object => "object",
        }
    }
}

/// Named type reference
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    /// Qualified name segments: `ns.Name` gives [ns, Name]
    pub name: Vec<Identifier>,
    pub type_args: Vec<TypeAnnotation>,
}

impl TypeReference {
    /// The last segment of the qualified name.
    pub fn base(&self) -> Option<&Identifier> {
        self.name.last()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(Symbol),
    Number(f64),
    Boolean(bool),
    BigInt(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub label: Option<Identifier>,
    pub ty: TypeAnnotation,
    pub optional: bool,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub is_constructor: bool,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Parameter>,
    pub return_type: Box<TypeAnnotation>,
}

/// Member of an object type literal or interface body
#[derive(Debug, Clone, PartialEq)]
pub enum TypeMember {
    Property(PropertySignature),
    Method(MethodSignature),
    /// `[key: string]: T`
    Index(IndexSignature),
    /// Call and construct signatures
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub doc: Option<DocComment>,
    pub is_readonly: bool,
    pub name: PropertyName,
    pub optional: bool,
    pub type_annotation: Option<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub doc: Option<DocComment>,
    pub name: PropertyName,
    pub optional: bool,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSignature {
    pub is_readonly: bool,
    pub key_name: Identifier,
    pub key_type: TypeAnnotation,
    pub value_type: TypeAnnotation,
    pub span: Span,
}
