//! Classification rules
//!
//! Rules are evaluated in order and the first one whose `detect` matches
//! emits the result. The order encodes priority: wrappers are peeled
//! before anything else, and model references are recognized before the
//! structural union and interface rules get a chance to expand them.

use super::context::{Node, Position, RuleContext};
use super::{custom, shape, Recurse};
use crate::error::AuthoringError;
use crate::metadata::{LiteralKind, MetadataType, PrimitiveName};
use crate::parser::ast::*;

/// What a rule's `detect` found; handed back to its `emit`.
#[derive(Debug, Clone)]
pub enum Matched<'a> {
    /// A single child type to classify
    Type(&'a TypeAnnotation),
    /// Several child types (union or intersection members)
    Types(Vec<&'a TypeAnnotation>),
    /// Tuple slots
    Tuple(&'a [TupleElement]),
    /// Object type literal members
    Members(&'a [TypeMember]),
    /// A named reference the rule will look up again
    Reference(&'a str, &'a TypeReference),
    /// An initializer expression
    Expression(&'a Expression),
    /// A finished result
    Resolved(MetadataType),
}

/// A classification rule.
pub trait Rule: Send + Sync {
    /// Short name used in trace output
    fn name(&self) -> &'static str;

    /// Decide whether this rule applies to the context's node.
    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>>;

    /// Produce the metadata for a match, recursing into children as needed.
    fn emit<'a>(
        &self,
        matched: Matched<'a>,
        recurse: &mut Recurse<'_, 'a>,
    ) -> Result<MetadataType, AuthoringError>;
}

/// The rule list in priority order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ParenthesizedRule),
        Box::new(TypeParameterRule),
        Box::new(LazyWrapperRule),
        Box::new(AnyRule),
        Box::new(NullRule),
        Box::new(UndefinedRule),
        Box::new(BooleanRule),
        Box::new(OptionalUnionRule),
        Box::new(ModelReferenceRule),
        Box::new(CustomTypeRule),
        Box::new(LiteralRule),
        Box::new(PrimitiveRule),
        Box::new(ArrayRule),
        Box::new(TupleRule),
        Box::new(UnionRule),
        Box::new(IntersectionRule),
        Box::new(InterfaceRule),
        Box::new(AliasRule),
        Box::new(InitializerRule),
    ]
}

// ============================================================================
// Helpers
// ============================================================================

fn written<'a>(ctx: &RuleContext<'a>) -> Option<&'a Type> {
    match ctx.node {
        Node::Type(annotation) => Some(&annotation.ty),
        _ => None,
    }
}

/// Reference name (canonical, last segment) and node.
fn reference<'a>(ctx: &RuleContext<'a>) -> Option<(&'a str, &'a TypeReference)> {
    match written(ctx)? {
        Type::Reference(reference) => {
            let base = reference.base()?;
            let name = ctx.program.canonical_name(ctx.resolve(base.name));
            Some((name, reference))
        }
        _ => None,
    }
}

/// A reference that is not a type parameter bound in scope.
fn unbound_reference<'a>(ctx: &RuleContext<'a>) -> Option<(&'a str, &'a TypeReference)> {
    let (name, reference) = reference(ctx)?;
    if reference.name.len() == 1 && ctx.binding(name).is_some() {
        return None;
    }
    Some((name, reference))
}

fn collect_union<'a>(ty: &'a TypeAnnotation, out: &mut Vec<&'a TypeAnnotation>) {
    let ty = ty.unparenthesized();
    match &ty.ty {
        Type::Union(members) => {
            for member in members {
                collect_union(member, out);
            }
        }
        _ => out.push(ty),
    }
}

/// Flattened union members, for written unions and synthetic ones.
fn union_members<'a>(ctx: &RuleContext<'a>) -> Option<Vec<&'a TypeAnnotation>> {
    match &ctx.node {
        Node::Union(members) => Some(members.clone()),
        Node::Type(annotation) => match &annotation.ty {
            Type::Union(_) => {
                let mut out = Vec::new();
                collect_union(*annotation, &mut out);
                Some(out)
            }
            _ => None,
        },
        Node::Initializer(_) => None,
    }
}

fn is_primitive(ty: &TypeAnnotation, primitive: PrimitiveType) -> bool {
    matches!(ty.unparenthesized().ty, Type::Primitive(p) if p == primitive)
}

fn is_boolean_literal(ty: &TypeAnnotation, value: bool) -> bool {
    matches!(ty.unparenthesized().ty, Type::Literal(LiteralType::Boolean(b)) if b == value)
}

/// Classify in the parent's position (used by unwrapping rules).
fn classify_same<'a>(
    recurse: &mut Recurse<'_, 'a>,
    node: Node<'a>,
) -> Result<MetadataType, AuthoringError> {
    let position = recurse.parent().position;
    recurse.classify(node, position)
}

/// Builtin types spelled as references.
fn builtin_primitive(name: &str) -> Option<PrimitiveName> {
    match name {
        "Date" => Some(PrimitiveName::Date),
        "String" => Some(PrimitiveName::String),
        "Number" => Some(PrimitiveName::Number),
        "Boolean" => Some(PrimitiveName::Boolean),
        "BigInt" => Some(PrimitiveName::BigInt),
        _ => None,
    }
}

fn is_declared(ctx: &RuleContext<'_>, name: &str) -> bool {
    ctx.program.class(name).is_some()
        || ctx.program.alias(name).is_some()
        || !ctx.program.interfaces(name).is_empty()
}

// ============================================================================
// Wrappers
// ============================================================================

/// `(T)` classifies as `T`.
pub struct ParenthesizedRule;

impl Rule for ParenthesizedRule {
    fn name(&self) -> &'static str {
        "parenthesized"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match written(ctx)? {
            Type::Parenthesized(inner) => Some(Matched::Type(inner)),
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Type(inner) => classify_same(recurse, Node::Type(inner)),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// A type parameter bound by an enclosing alias, interface or class.
pub struct TypeParameterRule;

impl Rule for TypeParameterRule {
    fn name(&self) -> &'static str {
        "type_parameter"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let (name, reference) = reference(ctx)?;
        if reference.name.len() != 1 || !reference.type_args.is_empty() {
            return None;
        }
        ctx.binding(name).cloned().map(Matched::Resolved)
    }

    fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// The deferred-value wrapper (`Lazy<T>`) classifies as `T`; the emitter
/// records laziness separately.
pub struct LazyWrapperRule;

impl Rule for LazyWrapperRule {
    fn name(&self) -> &'static str {
        "lazy_wrapper"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let (name, reference) = unbound_reference(ctx)?;
        if name != ctx.config.lazy_wrapper || reference.type_args.len() != 1 {
            return None;
        }
        Some(Matched::Type(&reference.type_args[0]))
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Type(inner) => classify_same(recurse, Node::Type(inner)),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

// ============================================================================
// Terminals
// ============================================================================

macro_rules! keyword_rule {
    ($rule:ident, $name:literal, $primitive:expr, $result:expr) => {
        pub struct $rule;

        impl Rule for $rule {
            fn name(&self) -> &'static str {
                $name
            }

            fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
                match written(ctx)? {
                    Type::Primitive(p) if *p == $primitive => Some(Matched::Resolved($result)),
                    _ => None,
                }
            }

            fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
                match matched {
                    Matched::Resolved(ty) => Ok(ty),
                    _ => Ok(MetadataType::Unresolved),
                }
            }
        }
    };
}

keyword_rule!(AnyRule, "any", PrimitiveType::Any, MetadataType::Mixed);
keyword_rule!(NullRule, "null", PrimitiveType::Null, MetadataType::Null);
keyword_rule!(UndefinedRule, "undefined", PrimitiveType::Undefined, MetadataType::Undefined);

/// `boolean` and `true | false` are both `Primitive(Boolean)`.
pub struct BooleanRule;

impl Rule for BooleanRule {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let boolean = Matched::Resolved(MetadataType::primitive(PrimitiveName::Boolean));
        if let Some(Type::Primitive(PrimitiveType::Boolean)) = written(ctx) {
            return Some(boolean);
        }

        let members = union_members(ctx)?;
        let all_boolean = members
            .iter()
            .all(|m| is_boolean_literal(m, true) || is_boolean_literal(m, false));
        let has_both = members.iter().any(|m| is_boolean_literal(m, true))
            && members.iter().any(|m| is_boolean_literal(m, false));
        (all_boolean && has_both).then_some(boolean)
    }

    fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// `T | undefined` is `Optional(T)`.
pub struct OptionalUnionRule;

impl Rule for OptionalUnionRule {
    fn name(&self) -> &'static str {
        "optional_union"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let members = union_members(ctx)?;
        let rest: Vec<_> = members
            .iter()
            .copied()
            .filter(|m| !is_primitive(m, PrimitiveType::Undefined))
            .collect();
        if rest.len() == members.len() || rest.is_empty() {
            return None;
        }
        Some(Matched::Types(rest))
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        let Matched::Types(mut rest) = matched else {
            return Ok(MetadataType::Unresolved);
        };
        let inner = if rest.len() == 1 {
            recurse.classify(Node::Type(rest.remove(0)), Position::Nested)?
        } else {
            recurse.classify(Node::Union(rest), Position::Nested)?
        };
        Ok(MetadataType::optional(inner))
    }
}

/// References to model classes, and `this` inside a model.
pub struct ModelReferenceRule;

impl Rule for ModelReferenceRule {
    fn name(&self) -> &'static str {
        "model_reference"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        if let Some(Type::This) = written(ctx) {
            let owner = ctx.owner.as_deref()?;
            return ctx
                .program
                .is_model(owner)
                .then(|| Matched::Resolved(MetadataType::model_ref(owner)));
        }
        let (name, _) = unbound_reference(ctx)?;
        ctx.program
            .is_model(name)
            .then(|| Matched::Resolved(MetadataType::model_ref(name)))
    }

    fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// Aliases documented as custom types.
pub struct CustomTypeRule;

impl Rule for CustomTypeRule {
    fn name(&self) -> &'static str {
        "custom_type"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let (name, reference) = unbound_reference(ctx)?;
        let alias = ctx.program.alias(name)?;
        let tagged = alias
            .doc
            .as_ref()
            .is_some_and(|doc| doc.has_tag(&ctx.config.custom_type_tag));
        tagged.then_some(Matched::Reference(name, reference))
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Reference(name, reference) => custom::emit_custom(recurse, name, reference),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// Literal types: `"a"`, `42`, `true`, `10n`; template literal types are strings.
pub struct LiteralRule;

impl Rule for LiteralRule {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let ty = match written(ctx)? {
            Type::Literal(LiteralType::String(sym)) => {
                MetadataType::literal(LiteralKind::String, ctx.resolve(*sym))
            }
            Type::Literal(LiteralType::Number(n)) => {
                MetadataType::literal(LiteralKind::Number, shape::number_value(*n))
            }
            Type::Literal(LiteralType::Boolean(b)) => MetadataType::literal(LiteralKind::Boolean, *b),
            Type::Literal(LiteralType::BigInt(sym)) => {
                MetadataType::literal(LiteralKind::BigInt, ctx.resolve(*sym))
            }
            Type::TemplateLiteral => MetadataType::primitive(PrimitiveName::String),
            _ => return None,
        };
        Some(Matched::Resolved(ty))
    }

    fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// Primitive keywords and builtin scalar classes.
pub struct PrimitiveRule;

impl Rule for PrimitiveRule {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let name = match written(ctx)? {
            Type::Primitive(PrimitiveType::String) => PrimitiveName::String,
            Type::Primitive(PrimitiveType::Number) => PrimitiveName::Number,
            Type::Primitive(PrimitiveType::BigInt) => PrimitiveName::BigInt,
            Type::Reference(_) => {
                let (name, reference) = unbound_reference(ctx)?;
                if !reference.type_args.is_empty() || is_declared(ctx, name) {
                    return None;
                }
                builtin_primitive(name)?
            }
            _ => return None,
        };
        Some(Matched::Resolved(MetadataType::primitive(name)))
    }

    fn emit<'a>(&self, matched: Matched<'a>, _recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

// ============================================================================
// Composites
// ============================================================================

/// `T[]`, `Array<T>`, `ReadonlyArray<T>`
pub struct ArrayRule;

impl Rule for ArrayRule {
    fn name(&self) -> &'static str {
        "array"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match written(ctx)? {
            Type::Array(element) => Some(Matched::Type(element)),
            Type::Reference(_) => {
                let (name, reference) = unbound_reference(ctx)?;
                if !matches!(name, "Array" | "ReadonlyArray") || is_declared(ctx, name) {
                    return None;
                }
                match reference.type_args.as_slice() {
                    [] => Some(Matched::Resolved(MetadataType::array(MetadataType::Mixed))),
                    [element] => Some(Matched::Type(element)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Type(element) => Ok(MetadataType::array(recurse.classify_type(element)?)),
            Matched::Resolved(ty) => Ok(ty),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// `[A, B?, ...C[]]`
pub struct TupleRule;

impl Rule for TupleRule {
    fn name(&self) -> &'static str {
        "tuple"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match written(ctx)? {
            Type::Tuple(elements) => Some(Matched::Tuple(elements)),
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        let Matched::Tuple(elements) = matched else {
            return Ok(MetadataType::Unresolved);
        };
        let mut sub_types = Vec::with_capacity(elements.len());
        for element in elements {
            let ty = recurse.classify_type(&element.ty)?;
            sub_types.push(if element.optional {
                MetadataType::optional(ty)
            } else {
                ty
            });
        }
        Ok(MetadataType::Tuple { sub_types })
    }
}

/// Any remaining union.
pub struct UnionRule;

impl Rule for UnionRule {
    fn name(&self) -> &'static str {
        "union"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let members = union_members(ctx)?;
        (members.len() > 1).then_some(Matched::Types(members))
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        let Matched::Types(members) = matched else {
            return Ok(MetadataType::Unresolved);
        };
        let mut sub_types = Vec::with_capacity(members.len());
        for member in members {
            match recurse.classify_type(member)? {
                // Aliases of unions flatten into the outer union
                MetadataType::Union { sub_types: inner } => sub_types.extend(inner),
                ty => sub_types.push(ty),
            }
        }
        Ok(MetadataType::Union { sub_types })
    }
}

/// `A & B`
pub struct IntersectionRule;

impl Rule for IntersectionRule {
    fn name(&self) -> &'static str {
        "intersection"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match written(ctx)? {
            Type::Intersection(members) => Some(Matched::Types(members.iter().collect())),
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        let Matched::Types(members) = matched else {
            return Ok(MetadataType::Unresolved);
        };
        let sub_types = members
            .into_iter()
            .map(|member| recurse.classify_type(member))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MetadataType::Intersection { sub_types })
    }
}

/// Object type literals, interfaces and plain (non-model) classes.
pub struct InterfaceRule;

impl Rule for InterfaceRule {
    fn name(&self) -> &'static str {
        "interface"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match written(ctx)? {
            Type::Object(members) => Some(Matched::Members(members)),
            Type::Reference(_) => {
                let (name, reference) = unbound_reference(ctx)?;
                let is_shape = !ctx.program.interfaces(name).is_empty()
                    || ctx.program.class(name).is_some();
                is_shape.then_some(Matched::Reference(name, reference))
            }
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Members(members) => {
                let members = shape::object_members(recurse, members)?;
                Ok(MetadataType::Interface { members })
            }
            Matched::Reference(name, reference) => shape::named_shape(recurse, name, reference),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}

/// Plain type aliases expand to their body.
pub struct AliasRule;

impl Rule for AliasRule {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        let (name, reference) = unbound_reference(ctx)?;
        ctx.program
            .alias(name)
            .map(|_| Matched::Reference(name, reference))
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        let Matched::Reference(name, reference) = matched else {
            return Ok(MetadataType::Unresolved);
        };
        let program = recurse.parent().program;
        let Some(alias) = program.alias(name) else {
            return Ok(MetadataType::Unresolved);
        };
        let scope = shape::bind_type_params(recurse, &alias.type_params, &reference.type_args)?;
        let ctx = recurse
            .parent()
            .expansion(Node::Type(&alias.type_annotation), name, scope)?;
        recurse.run(ctx)
    }
}

/// Types inferred from initializers of unannotated declarations.
pub struct InitializerRule;

impl Rule for InitializerRule {
    fn name(&self) -> &'static str {
        "initializer"
    }

    fn detect<'a>(&self, ctx: &RuleContext<'a>) -> Option<Matched<'a>> {
        match ctx.node {
            Node::Initializer(expr) => Some(Matched::Expression(expr)),
            _ => None,
        }
    }

    fn emit<'a>(&self, matched: Matched<'a>, recurse: &mut Recurse<'_, 'a>) -> Result<MetadataType, AuthoringError> {
        match matched {
            Matched::Expression(expr) => shape::infer_initializer(recurse, expr),
            _ => Ok(MetadataType::Unresolved),
        }
    }
}
