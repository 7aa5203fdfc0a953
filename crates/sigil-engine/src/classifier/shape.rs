//! Object shapes, type parameter binding and initializer inference.

use super::context::{Node, Position, Scope};
use super::symbols::Program;
use super::Recurse;
use crate::config::EngineConfig;
use crate::error::AuthoringError;
use crate::metadata::{AttrMetadata, MetadataType, PrimitiveName};
use crate::parser::ast::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// JSON value of a numeric literal; integral values stay integers.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// `Optional` and bare `undefined` both mean "may be absent".
pub fn is_optional_type(ty: &MetadataType) -> bool {
    matches!(ty, MetadataType::Optional { .. } | MetadataType::Undefined)
}

pub fn has_internal_tag(doc: Option<&DocComment>) -> bool {
    doc.is_some_and(|doc| doc.has_tag("internal"))
}

/// Whether the outermost written type is the deferred-value wrapper.
pub fn is_lazy_annotation(ty: &TypeAnnotation, program: &Program, config: &EngineConfig) -> bool {
    match &ty.unparenthesized().ty {
        Type::Reference(reference) => reference.base().is_some_and(|id| {
            program.canonical_name(program.resolve(id.name)) == config.lazy_wrapper
        }),
        _ => false,
    }
}

/// Attribute metadata for a class field whose type is already classified.
pub fn field_metadata(
    name: String,
    field: &FieldDecl,
    ty: MetadataType,
    program: &Program,
    config: &EngineConfig,
) -> AttrMetadata {
    AttrMetadata {
        is_required: !field.optional && field.initializer.is_none() && !is_optional_type(&ty),
        is_read_only: field.modifiers.is_readonly,
        is_internal: field.modifiers.is_hidden() || has_internal_tag(field.doc.as_ref()),
        is_lazy: field
            .type_annotation
            .as_ref()
            .is_some_and(|ty| is_lazy_annotation(ty, program, config)),
        name,
        ty,
    }
}

// ============================================================================
// Type parameters
// ============================================================================

/// Bind type parameters to classified arguments. Missing arguments fall
/// back to the parameter default, then to `Unresolved`.
pub fn bind_type_params<'a>(
    recurse: &mut Recurse<'_, 'a>,
    params: &'a [TypeParameter],
    args: &'a [TypeAnnotation],
) -> Result<Scope, AuthoringError> {
    let mut scope = Scope::default();
    for (index, param) in params.iter().enumerate() {
        let name = recurse.parent().resolve(param.name.name).to_string();
        let ty = if let Some(arg) = args.get(index) {
            recurse.classify_type(arg)?
        } else if let Some(default) = &param.default {
            // Defaults may mention earlier parameters
            let mut bindings = (*recurse.parent().scope).clone();
            bindings.extend(scope.iter().map(|(k, v)| (k.clone(), v.clone())));
            let mut ctx = recurse.parent().child(Node::Type(default), Position::Nested);
            ctx.scope = Rc::new(bindings);
            recurse.run(ctx)?
        } else {
            MetadataType::Unresolved
        };
        scope.insert(name, ty);
    }
    Ok(scope)
}

// ============================================================================
// Shapes
// ============================================================================

/// Members of an object type literal or interface body. Methods, index
/// and call signatures carry no attribute data and are skipped.
pub fn object_members<'a>(
    recurse: &mut Recurse<'_, 'a>,
    members: &'a [TypeMember],
) -> Result<BTreeMap<String, AttrMetadata>, AuthoringError> {
    let program = recurse.parent().program;
    let config = recurse.parent().config;
    let mut out = BTreeMap::new();

    for member in members {
        let TypeMember::Property(prop) = member else {
            continue;
        };
        let Some(name) = prop.name.text(program.interner()) else {
            continue;
        };
        let ty = match &prop.type_annotation {
            Some(annotation) => {
                let ctx = recurse.parent().member(Node::Type(annotation), &name);
                recurse.run(ctx)?
            }
            None => MetadataType::Mixed,
        };
        let attr = AttrMetadata {
            is_required: !prop.optional && !is_optional_type(&ty),
            is_read_only: prop.is_readonly,
            is_internal: has_internal_tag(prop.doc.as_ref()),
            is_lazy: prop
                .type_annotation
                .as_ref()
                .is_some_and(|ty| is_lazy_annotation(ty, program, config)),
            name,
            ty,
        };
        out.insert(attr.name.clone(), attr);
    }
    Ok(out)
}

/// Expand a named interface or plain class into an `Interface` shape.
pub fn named_shape<'a>(
    recurse: &mut Recurse<'_, 'a>,
    name: &'a str,
    reference: &'a TypeReference,
) -> Result<MetadataType, AuthoringError> {
    let program = recurse.parent().program;
    let interfaces = program.interfaces(name);
    if !interfaces.is_empty() {
        return interface_shape(recurse, name, interfaces, &reference.type_args);
    }
    match program.class(name) {
        Some(class) => class_shape(recurse, name, class, &reference.type_args),
        None => Ok(MetadataType::Unresolved),
    }
}

fn interface_shape<'a>(
    recurse: &mut Recurse<'_, 'a>,
    name: &str,
    decls: Vec<&'a InterfaceDecl>,
    args: &'a [TypeAnnotation],
) -> Result<MetadataType, AuthoringError> {
    let params = decls
        .iter()
        .find(|decl| !decl.type_params.is_empty())
        .map(|decl| decl.type_params.as_slice())
        .unwrap_or(&[]);
    let scope = bind_type_params(recurse, params, args)?;
    let node = recurse.parent().node.clone();
    let ctx = recurse.parent().expansion(node, name, scope)?;
    let mut inner = recurse.with_parent(&ctx);

    let mut members = BTreeMap::new();
    for decl in decls {
        for base in &decl.extends {
            if let MetadataType::Interface { members: inherited } = inner.classify_type(base)? {
                members.extend(inherited);
            }
        }
        members.extend(object_members(&mut inner, &decl.members)?);
    }
    Ok(MetadataType::Interface { members })
}

/// Instance fields of a class that is not a model, including inherited ones.
pub fn class_shape<'a>(
    recurse: &mut Recurse<'_, 'a>,
    name: &str,
    class: &'a ClassDecl,
    args: &'a [TypeAnnotation],
) -> Result<MetadataType, AuthoringError> {
    let program = recurse.parent().program;
    let config = recurse.parent().config;
    let scope = bind_type_params(recurse, &class.type_params, args)?;
    let node = recurse.parent().node.clone();
    let mut ctx = recurse.parent().expansion(node, name, scope)?;
    ctx.owner = Some(name.into());
    let mut inner = recurse.with_parent(&ctx);

    let mut members = BTreeMap::new();
    if let Some(base) = &class.extends {
        if let MetadataType::Interface { members: inherited } = inner.classify_type(base)? {
            members.extend(inherited);
        }
    }
    for member in &class.members {
        let ClassMember::Field(field) = member else {
            continue;
        };
        if field.modifiers.is_static {
            continue;
        }
        let Some(field_name) = field.name.text(program.interner()) else {
            continue;
        };
        let ty = field_type(&mut inner, field, &field_name)?;
        let attr = field_metadata(field_name, field, ty, program, config);
        members.insert(attr.name.clone(), attr);
    }
    Ok(MetadataType::Interface { members })
}

/// Declared type of a field, or its initializer's type, or `Mixed`.
pub fn field_type<'a>(
    recurse: &mut Recurse<'_, 'a>,
    field: &'a FieldDecl,
    name: &str,
) -> Result<MetadataType, AuthoringError> {
    let node = match (&field.type_annotation, &field.initializer) {
        (Some(annotation), _) => Node::Type(annotation),
        (None, Some(initializer)) => Node::Initializer(initializer),
        (None, None) => return Ok(MetadataType::Mixed),
    };
    let ctx = recurse.parent().member(node, name);
    recurse.run(ctx)
}

// ============================================================================
// Initializers
// ============================================================================

fn is_const_assertion(ty: &TypeAnnotation, program: &Program) -> bool {
    match &ty.ty {
        Type::Reference(reference) => {
            reference.name.len() == 1
                && reference.type_args.is_empty()
                && reference
                    .base()
                    .is_some_and(|id| program.resolve(id.name) == "const")
        }
        _ => false,
    }
}

fn infer<'a>(recurse: &mut Recurse<'_, 'a>, expr: &'a Expression) -> Result<MetadataType, AuthoringError> {
    recurse.classify(Node::Initializer(expr), Position::Nested)
}

/// Distinct types in order of first appearance.
fn push_distinct(types: &mut Vec<MetadataType>, ty: MetadataType) {
    if !types.contains(&ty) {
        types.push(ty);
    }
}

fn union_of(mut types: Vec<MetadataType>) -> MetadataType {
    match types.len() {
        0 => MetadataType::Mixed,
        1 => types.remove(0),
        _ => MetadataType::Union { sub_types: types },
    }
}

/// Infer a type from an initializer expression.
///
/// A cast (other than `as const`) is trusted over the expression it
/// wraps. Expressions whose value cannot be known statically (calls,
/// identifiers, functions) are `Unresolved`.
pub fn infer_initializer<'a>(
    recurse: &mut Recurse<'_, 'a>,
    expr: &'a Expression,
) -> Result<MetadataType, AuthoringError> {
    let program = recurse.parent().program;
    let position = recurse.parent().position;

    let mut current = expr;
    loop {
        current = match current {
            Expression::Parenthesized(p) => &p.expression,
            Expression::NonNull(n) => &n.object,
            Expression::TypeCast(cast) if !is_const_assertion(&cast.target_type, program) => {
                return recurse.classify(Node::Type(&cast.target_type), position);
            }
            Expression::TypeCast(cast) => &cast.object,
            _ => break,
        };
    }

    let primitive = MetadataType::primitive;
    let ty = match current {
        Expression::StringLiteral(_) | Expression::TemplateLiteral(_) => primitive(PrimitiveName::String),
        Expression::IntLiteral(_) | Expression::FloatLiteral(_) => primitive(PrimitiveName::Number),
        Expression::BooleanLiteral(_) => primitive(PrimitiveName::Boolean),
        Expression::BigIntLiteral(_) => primitive(PrimitiveName::BigInt),
        Expression::NullLiteral(_) => MetadataType::Null,
        Expression::Identifier(id) => match program.resolve(id.name) {
            "undefined" => MetadataType::Undefined,
            "NaN" | "Infinity" => primitive(PrimitiveName::Number),
            _ => MetadataType::Unresolved,
        },

        Expression::Unary(unary) => match unary.operator {
            UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitwiseNot => {
                match unary.operand.unwrapped() {
                    Expression::BigIntLiteral(_) => primitive(PrimitiveName::BigInt),
                    _ => primitive(PrimitiveName::Number),
                }
            }
            UnaryOperator::Not => primitive(PrimitiveName::Boolean),
            UnaryOperator::Typeof => primitive(PrimitiveName::String),
            UnaryOperator::Void => MetadataType::Undefined,
            _ => MetadataType::Unresolved,
        },

        Expression::Binary(binary) => match binary.operator {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::StrictEqual
            | BinaryOperator::StrictNotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual
            | BinaryOperator::Instanceof
            | BinaryOperator::In => primitive(PrimitiveName::Boolean),
            BinaryOperator::Add => {
                let left = infer(recurse, &binary.left)?;
                let right = infer(recurse, &binary.right)?;
                let string = primitive(PrimitiveName::String);
                if left == string || right == string {
                    string
                } else if left == right && matches!(left, MetadataType::Primitive { .. }) {
                    left
                } else {
                    MetadataType::Unresolved
                }
            }
            _ => primitive(PrimitiveName::Number),
        },

        Expression::Conditional(cond) => {
            let mut types = Vec::new();
            push_distinct(&mut types, infer(recurse, &cond.consequent)?);
            push_distinct(&mut types, infer(recurse, &cond.alternate)?);
            union_of(types)
        }

        Expression::Array(array) => {
            let mut types = Vec::new();
            for element in array.elements.iter().flatten() {
                if matches!(element, Expression::Spread(_)) {
                    continue;
                }
                push_distinct(&mut types, infer(recurse, element)?);
            }
            MetadataType::array(union_of(types))
        }

        Expression::Object(object) => {
            let mut members = BTreeMap::new();
            for property in &object.properties {
                let ObjectProperty::Property(property) = property else {
                    continue;
                };
                if matches!(property.value, Expression::Function(_)) {
                    continue;
                }
                let Some(name) = property.key.text(program.interner()) else {
                    continue;
                };
                let ctx = recurse
                    .parent()
                    .member(Node::Initializer(&property.value), &name);
                let ty = recurse.run(ctx)?;
                members.insert(
                    name.clone(),
                    AttrMetadata {
                        is_required: !is_optional_type(&ty),
                        is_read_only: false,
                        is_internal: false,
                        is_lazy: false,
                        name,
                        ty,
                    },
                );
            }
            MetadataType::Interface { members }
        }

        Expression::New(new) => return infer_construction(recurse, new),

        _ => MetadataType::Unresolved,
    };
    Ok(ty)
}

fn infer_construction<'a>(
    recurse: &mut Recurse<'_, 'a>,
    new: &'a NewExpression,
) -> Result<MetadataType, AuthoringError> {
    let program = recurse.parent().program;
    let Expression::Identifier(id) = new.callee.unwrapped() else {
        return Ok(MetadataType::Unresolved);
    };
    let name = program.canonical_name(program.resolve(id.name));

    if program.is_model(name) {
        return Ok(MetadataType::model_ref(name));
    }
    if let Some(class) = program.class(name) {
        return class_shape(recurse, name, class, &new.type_args);
    }
    let ty = match name {
        "Date" => MetadataType::primitive(PrimitiveName::Date),
        "String" => MetadataType::primitive(PrimitiveName::String),
        "Number" => MetadataType::primitive(PrimitiveName::Number),
        "Boolean" => MetadataType::primitive(PrimitiveName::Boolean),
        "Array" => match new.type_args.first() {
            Some(element) => MetadataType::array(recurse.classify_type(element)?),
            None => MetadataType::array(MetadataType::Mixed),
        },
        _ => MetadataType::Unresolved,
    };
    Ok(ty)
}
