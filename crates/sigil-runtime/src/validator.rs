//! Structural validators
//!
//! A [`Validator`] is built once from a [`MetadataType`] plus declaration
//! options and checks JSON values against it. Normal input problems become
//! [`ValidationIssue`]s in a [`ValidationResult`]; only an inconsistent
//! schema (unknown model, dropped store) is an `Err`.
//!
//! Model references validate through [`LazyModel`], which looks the target
//! model up only when a value is checked, so self-referential and mutually
//! referential models build without recursion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sigil_engine::{MetadataType, PrimitiveName};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::error::SchemaError;
use crate::options::OptionsExt;
use crate::schema::Schema;
use crate::store::MetadataStore;

/// ISO-8601 date or date-time
static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .unwrap_or_else(|_| unreachable!("ISO date pattern is valid"))
});

static BIGINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").unwrap_or_else(|_| unreachable!("bigint pattern is valid")));

// ============================================================================
// Results
// ============================================================================

/// Who is asking: internal code may touch internal attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// Missing value for a required attribute
    Required,
    RangeOverflow,
    RangeUnderflow,
    /// Key or position no schema declares
    Inexistent,
    /// Internal attribute touched from outside
    Forbidden,
    Format,
    Type,
    /// Author validator hook violation
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub path: Vec<String>,
    pub value: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub success: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            success: errors.is_empty(),
            errors,
        }
    }

    /// Append another result's issues
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.success = self.errors.is_empty();
    }

    /// Issues of one kind
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Value constraints from options or custom-type properties.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub integer: bool,
}

impl Constraints {
    /// Read `min`, `max`, `minLength`, `maxLength`, `pattern` and `integer`.
    pub fn from_options(options: &Map<String, Value>, declaration: &str) -> Result<Self, SchemaError> {
        let invalid = |option: &str, reason: String| SchemaError::InvalidOption {
            declaration: declaration.to_string(),
            option: option.to_string(),
            reason,
        };
        let length = |key: &str| -> Result<Option<usize>, SchemaError> {
            match options.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value
                    .as_u64()
                    .map(|n| Some(n as usize))
                    .ok_or_else(|| invalid(key, format!("expected a non-negative integer, got {}", value))),
            }
        };

        let pattern = match options.get("pattern") {
            None | Some(Value::Null) => None,
            Some(Value::String(source)) => Some(
                compile_pattern(source).map_err(|e| invalid("pattern", e.to_string()))?,
            ),
            Some(other) => return Err(invalid("pattern", format!("expected a string, got {}", other))),
        };

        Ok(Self {
            min: options.number("min"),
            max: options.number("max"),
            min_length: length("minLength")?,
            max_length: length("maxLength")?,
            pattern,
            integer: options.flag("integer"),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && !self.integer
    }

    /// Later constraints override earlier ones field by field.
    fn overlay(mut self, other: Constraints) -> Self {
        self.min = other.min.or(self.min);
        self.max = other.max.or(self.max);
        self.min_length = other.min_length.or(self.min_length);
        self.max_length = other.max_length.or(self.max_length);
        self.pattern = other.pattern.or(self.pattern);
        self.integer |= other.integer;
        self
    }

    fn check(&self, value: &Value, cx: &mut Check) {
        match value {
            Value::Number(n) => {
                let Some(n) = n.as_f64() else { return };
                if self.integer && n.fract() != 0.0 {
                    cx.issue(IssueKind::Type, value, "expected an integer".to_string());
                }
                if let Some(min) = self.min.filter(|min| n < *min) {
                    cx.issue(IssueKind::RangeUnderflow, value, format!("must be at least {}", min));
                }
                if let Some(max) = self.max.filter(|max| n > *max) {
                    cx.issue(IssueKind::RangeOverflow, value, format!("must be at most {}", max));
                }
            }
            Value::String(s) => {
                self.check_length(s.chars().count(), value, cx);
                if let Some(pattern) = self.pattern.as_ref().filter(|p| !p.is_match(s)) {
                    cx.issue(
                        IssueKind::Format,
                        value,
                        format!("does not match pattern {}", pattern.as_str()),
                    );
                }
            }
            Value::Array(items) => self.check_length(items.len(), value, cx),
            _ => {}
        }
    }

    fn check_length(&self, len: usize, value: &Value, cx: &mut Check) {
        if let Some(min) = self.min_length.filter(|min| len < *min) {
            cx.issue(IssueKind::RangeUnderflow, value, format!("length must be at least {}", min));
        }
        if let Some(max) = self.max_length.filter(|max| len > *max) {
            cx.issue(IssueKind::RangeOverflow, value, format!("length must be at most {}", max));
        }
    }
}

/// Compile a pattern, accepting `/source/flags` literal syntax.
fn compile_pattern(source: &str) -> Result<Regex, regex::Error> {
    if let Some(rest) = source.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let (body, flags) = (&rest[..end], &rest[end + 1..]);
            let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();
            if inline.is_empty() {
                return Regex::new(body);
            }
            return Regex::new(&format!("(?{}){}", inline, body));
        }
    }
    Regex::new(source)
}

// ============================================================================
// Validators
// ============================================================================

/// Named slot of an object or argument list.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub required: bool,
    /// Hidden from `Access::External`
    pub internal: bool,
    /// `null` is a valid value rather than an absent one
    pub admits_null: bool,
    pub validator: Arc<Validator>,
}

/// Deferred reference to a model's object validator.
#[derive(Clone)]
pub struct LazyModel {
    class: String,
    store: Weak<MetadataStore>,
}

impl LazyModel {
    pub fn new(class: &str, store: &Arc<MetadataStore>) -> Self {
        Self {
            class: class.to_string(),
            store: Arc::downgrade(store),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// The target model's validator, built on first use.
    pub fn resolve(&self) -> Result<Arc<Validator>, SchemaError> {
        let store = self.store.upgrade().ok_or(SchemaError::StoreDropped)?;
        let model = store
            .get_model_schema(&self.class)
            .ok_or_else(|| SchemaError::UnknownModel {
                name: self.class.clone(),
            })?;
        model.schema_type()
    }
}

impl std::fmt::Debug for LazyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LazyModel({})", self.class)
    }
}

#[derive(Debug, Clone)]
pub enum Validator {
    Any,
    Null,
    /// JSON has no `undefined`; only `null` passes
    Undefined,
    String,
    Number,
    Boolean,
    /// Integer numbers or decimal digit strings
    BigInt,
    /// ISO-8601 strings
    Date,
    Literal(Value),
    Model(LazyModel),
    Array(Box<Validator>),
    Tuple(Vec<Validator>),
    Optional(Box<Validator>),
    Union(Vec<Validator>),
    Intersection(Vec<Validator>),
    Object {
        fields: Vec<Field>,
        strict: bool,
    },
    /// Positional argument list
    Positional(Vec<Field>),
    Constrained {
        inner: Box<Validator>,
        constraints: Constraints,
    },
}

impl Validator {
    /// Build a validator for `ty`. `declaration` names the schema in errors.
    pub fn from_type(
        ty: &MetadataType,
        declaration: &str,
        store: &Arc<MetadataStore>,
    ) -> Result<Validator, SchemaError> {
        let strict = store.config().strict_objects;
        let build = |ty: &MetadataType| Validator::from_type(ty, declaration, store);

        Ok(match ty {
            MetadataType::Mixed => Validator::Any,
            MetadataType::Unresolved => {
                return Err(SchemaError::UnresolvedType {
                    declaration: declaration.to_string(),
                })
            }
            MetadataType::Null => Validator::Null,
            MetadataType::Undefined => Validator::Undefined,
            MetadataType::Primitive { name } => match name {
                PrimitiveName::String => Validator::String,
                PrimitiveName::Number => Validator::Number,
                PrimitiveName::Boolean => Validator::Boolean,
                PrimitiveName::BigInt => Validator::BigInt,
                PrimitiveName::Date => Validator::Date,
            },
            MetadataType::Literal { value, .. } => Validator::Literal(value.clone()),
            MetadataType::ModelRef { identifier } => Validator::Model(LazyModel::new(identifier, store)),
            MetadataType::Array { sub_type } => Validator::Array(Box::new(build(sub_type)?)),
            MetadataType::Tuple { sub_types } => {
                Validator::Tuple(sub_types.iter().map(build).collect::<Result<_, _>>()?)
            }
            MetadataType::Optional { sub_type } => Validator::Optional(Box::new(build(sub_type)?)),
            MetadataType::Union { sub_types } => {
                Validator::Union(sub_types.iter().map(build).collect::<Result<_, _>>()?)
            }
            MetadataType::Intersection { sub_types } => {
                // Object members merge so strictness sees every declared key
                let mut members = BTreeMap::new();
                let mut others = Vec::new();
                for sub_type in sub_types {
                    match sub_type {
                        MetadataType::Interface { members: m } => {
                            members.extend(m.iter().map(|(k, v)| (k.clone(), v.clone())))
                        }
                        other => others.push(build(other)?),
                    }
                }
                if !members.is_empty() {
                    others.insert(0, Self::object(&members, declaration, store, strict)?);
                }
                match others.len() {
                    1 => others.remove(0),
                    _ => Validator::Intersection(others),
                }
            }
            MetadataType::Interface { members } => Self::object(members, declaration, store, strict)?,
            MetadataType::Custom {
                properties,
                wrapped_type,
                ..
            } => {
                let inner = build(wrapped_type)?;
                inner.constrained(Constraints::from_options(properties, declaration)?)
            }
        })
    }

    fn object(
        members: &BTreeMap<String, sigil_engine::AttrMetadata>,
        declaration: &str,
        store: &Arc<MetadataStore>,
        strict: bool,
    ) -> Result<Validator, SchemaError> {
        let fields = members
            .values()
            .map(|member| {
                Ok(Field {
                    name: member.name.clone(),
                    required: member.is_required,
                    internal: member.is_internal,
                    admits_null: member.ty.admits_null(),
                    validator: Arc::new(Validator::from_type(&member.ty, declaration, store)?),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Validator::Object { fields, strict })
    }

    /// Wrap in `constraints` unless there are none. Nested constraint
    /// wrappers merge, the outer one winning.
    pub fn constrained(self, constraints: Constraints) -> Validator {
        if constraints.is_empty() {
            return self;
        }
        match self {
            Validator::Constrained {
                inner,
                constraints: existing,
            } => Validator::Constrained {
                inner,
                constraints: existing.overlay(constraints),
            },
            other => Validator::Constrained {
                inner: Box::new(other),
                constraints,
            },
        }
    }

    /// Check `value`; issue paths are relative to it.
    pub fn validate(&self, value: &Value, access: Access) -> Result<ValidationResult, SchemaError> {
        let mut cx = Check::new(access);
        self.check(value, &mut cx)?;
        Ok(ValidationResult::from_issues(cx.issues))
    }

    /// Accepts `null` as a complete value.
    fn accepts_null(&self) -> bool {
        match self {
            Validator::Any | Validator::Null | Validator::Undefined | Validator::Optional(_) => true,
            Validator::Union(members) => members.iter().any(Validator::accepts_null),
            Validator::Constrained { inner, .. } => inner.accepts_null(),
            _ => false,
        }
    }

    fn check(&self, value: &Value, cx: &mut Check) -> Result<(), SchemaError> {
        match self {
            Validator::Any => {}
            Validator::Null | Validator::Undefined => {
                if !value.is_null() {
                    cx.issue(IssueKind::Type, value, "expected null".to_string());
                }
            }
            Validator::String => cx.expect(value.is_string(), value, "a string"),
            Validator::Number => cx.expect(value.is_number(), value, "a number"),
            Validator::Boolean => cx.expect(value.is_boolean(), value, "a boolean"),
            Validator::BigInt => {
                let valid = value.is_i64()
                    || value.is_u64()
                    || value.as_str().is_some_and(|s| BIGINT.is_match(s));
                cx.expect(valid, value, "an integer");
            }
            Validator::Date => match value {
                Value::String(s) if ISO_DATE.is_match(s) => {}
                Value::String(_) => cx.issue(IssueKind::Format, value, "expected an ISO-8601 date".to_string()),
                _ => cx.issue(IssueKind::Type, value, "expected a date string".to_string()),
            },
            Validator::Literal(expected) => {
                if !literal_eq(expected, value) {
                    cx.issue(IssueKind::Type, value, format!("expected {}", expected));
                }
            }
            Validator::Model(lazy) => {
                if !value.is_object() {
                    cx.issue(IssueKind::Type, value, format!("expected a {} object", lazy.class()));
                } else {
                    lazy.resolve()?.check(value, cx)?;
                }
            }
            Validator::Array(item) => {
                let Some(items) = value.as_array() else {
                    cx.issue(IssueKind::Type, value, "expected an array".to_string());
                    return Ok(());
                };
                for (i, element) in items.iter().enumerate() {
                    cx.enter(i.to_string());
                    item.check(element, cx)?;
                    cx.leave();
                }
            }
            Validator::Tuple(slots) => {
                let Some(items) = value.as_array() else {
                    cx.issue(IssueKind::Type, value, "expected a tuple".to_string());
                    return Ok(());
                };
                for (i, slot) in slots.iter().enumerate() {
                    cx.enter(i.to_string());
                    match items.get(i) {
                        Some(element) => slot.check(element, cx)?,
                        None if slot.accepts_null() => {}
                        None => cx.issue(IssueKind::Required, &Value::Null, "missing tuple element".to_string()),
                    }
                    cx.leave();
                }
                for (i, extra) in items.iter().enumerate().skip(slots.len()) {
                    cx.enter(i.to_string());
                    cx.issue(IssueKind::Inexistent, extra, "unexpected tuple element".to_string());
                    cx.leave();
                }
            }
            Validator::Optional(inner) => {
                if !value.is_null() {
                    inner.check(value, cx)?;
                }
            }
            Validator::Union(members) => {
                for member in members {
                    let mut trial = cx.trial();
                    member.check(value, &mut trial)?;
                    if trial.issues.is_empty() {
                        return Ok(());
                    }
                }
                let expected: Vec<String> = members.iter().map(Validator::describe).collect();
                cx.issue(IssueKind::Type, value, format!("expected {}", expected.join(" | ")));
            }
            Validator::Intersection(members) => {
                for member in members {
                    member.check(value, cx)?;
                }
            }
            Validator::Object { fields, strict } => {
                let Some(map) = value.as_object() else {
                    cx.issue(IssueKind::Type, value, "expected an object".to_string());
                    return Ok(());
                };
                for field in fields {
                    field.check(map.get(&field.name), cx)?;
                }
                if *strict {
                    for (key, extra) in map {
                        if !fields.iter().any(|f| &f.name == key) {
                            cx.enter(key.clone());
                            cx.issue(IssueKind::Inexistent, extra, format!("unknown key `{}`", key));
                            cx.leave();
                        }
                    }
                }
            }
            Validator::Positional(fields) => {
                let Some(items) = value.as_array() else {
                    cx.issue(IssueKind::Type, value, "expected an argument list".to_string());
                    return Ok(());
                };
                for (i, field) in fields.iter().enumerate() {
                    field.check(items.get(i), cx)?;
                }
                for (i, extra) in items.iter().enumerate().skip(fields.len()) {
                    cx.enter(i.to_string());
                    cx.issue(IssueKind::Inexistent, extra, "unexpected argument".to_string());
                    cx.leave();
                }
            }
            Validator::Constrained { inner, constraints } => {
                let before = cx.issues.len();
                inner.check(value, cx)?;
                if cx.issues.len() == before {
                    constraints.check(value, cx);
                }
            }
        }
        Ok(())
    }

    /// Short name used in union mismatch messages.
    fn describe(&self) -> String {
        match self {
            Validator::Any => "any".to_string(),
            Validator::Null => "null".to_string(),
            Validator::Undefined => "undefined".to_string(),
            Validator::String => "string".to_string(),
            Validator::Number => "number".to_string(),
            Validator::Boolean => "boolean".to_string(),
            Validator::BigInt => "bigint".to_string(),
            Validator::Date => "date".to_string(),
            Validator::Literal(value) => value.to_string(),
            Validator::Model(lazy) => lazy.class().to_string(),
            Validator::Array(item) => format!("{}[]", item.describe()),
            Validator::Tuple(_) => "tuple".to_string(),
            Validator::Optional(inner) => format!("{}?", inner.describe()),
            Validator::Union(_) => "union".to_string(),
            Validator::Intersection(_) => "intersection".to_string(),
            Validator::Object { .. } => "object".to_string(),
            Validator::Positional(_) => "arguments".to_string(),
            Validator::Constrained { inner, .. } => inner.describe(),
        }
    }
}

impl Field {
    /// `value` is `None` when the key is absent.
    fn check(&self, value: Option<&Value>, cx: &mut Check) -> Result<(), SchemaError> {
        cx.enter(self.name.clone());
        let result = self.check_inner(value, cx);
        cx.leave();
        result
    }

    fn check_inner(&self, value: Option<&Value>, cx: &mut Check) -> Result<(), SchemaError> {
        if self.internal && cx.access == Access::External {
            if let Some(value) = value {
                cx.issue(IssueKind::Forbidden, value, format!("`{}` is internal", self.name));
            }
            return Ok(());
        }
        match value {
            None => {
                if self.required {
                    cx.issue(IssueKind::Required, &Value::Null, format!("`{}` is required", self.name));
                }
                Ok(())
            }
            Some(Value::Null) if !self.admits_null => {
                if self.required {
                    cx.issue(IssueKind::Required, &Value::Null, format!("`{}` is required", self.name));
                }
                Ok(())
            }
            Some(value) => self.validator.check(value, cx),
        }
    }
}

/// Validate a single field at path `[field.name]`.
pub fn validate_field(field: &Field, value: Option<&Value>, access: Access) -> Result<ValidationResult, SchemaError> {
    let mut cx = Check::new(access);
    field.check(value, &mut cx)?;
    Ok(ValidationResult::from_issues(cx.issues))
}

/// Numbers compare by value so `42` matches `42.0`.
fn literal_eq(expected: &Value, value: &Value) -> bool {
    match (expected, value) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => expected == value,
    }
}

// ============================================================================
// Check state
// ============================================================================

struct Check {
    access: Access,
    path: Vec<String>,
    issues: Vec<ValidationIssue>,
}

impl Check {
    fn new(access: Access) -> Self {
        Self {
            access,
            path: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Scratch state for trying one union member.
    fn trial(&self) -> Check {
        Check {
            access: self.access,
            path: self.path.clone(),
            issues: Vec::new(),
        }
    }

    fn enter(&mut self, segment: String) {
        self.path.push(segment);
    }

    fn leave(&mut self) {
        self.path.pop();
    }

    fn issue(&mut self, kind: IssueKind, value: &Value, message: String) {
        self.issues.push(ValidationIssue {
            kind,
            path: self.path.clone(),
            value: value.clone(),
            message,
        });
    }

    fn expect(&mut self, valid: bool, value: &Value, what: &str) {
        if !valid {
            self.issue(IssueKind::Type, value, format!("expected {}", what));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigil_engine::{AttrMetadata, LiteralKind};

    fn build(ty: &MetadataType) -> Validator {
        let store = MetadataStore::new();
        Validator::from_type(ty, "test", &store).unwrap()
    }

    fn member(name: &str, required: bool, internal: bool, ty: MetadataType) -> (String, AttrMetadata) {
        (
            name.to_string(),
            AttrMetadata {
                name: name.to_string(),
                is_required: required,
                is_read_only: false,
                is_internal: internal,
                is_lazy: false,
                ty,
            },
        )
    }

    fn kinds(result: &ValidationResult) -> Vec<IssueKind> {
        result.errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_literal_union() {
        let validator = build(&MetadataType::Union {
            sub_types: vec![
                MetadataType::literal(LiteralKind::String, "Test"),
                MetadataType::literal(LiteralKind::Number, 42),
            ],
        });
        for accepted in [json!("Test"), json!(42), json!(42.0)] {
            assert!(validator.validate(&accepted, Access::Internal).unwrap().success);
        }
        for rejected in [json!("Other"), json!(41), json!(null)] {
            let result = validator.validate(&rejected, Access::Internal).unwrap();
            assert_eq!(kinds(&result), vec![IssueKind::Type]);
        }
    }

    #[test]
    fn test_primitives() {
        let string = build(&MetadataType::primitive(PrimitiveName::String));
        assert!(string.validate(&json!("a"), Access::Internal).unwrap().success);
        assert!(!string.validate(&json!(1), Access::Internal).unwrap().success);

        let bigint = build(&MetadataType::primitive(PrimitiveName::BigInt));
        assert!(bigint.validate(&json!("-12345678901234567890"), Access::Internal).unwrap().success);
        assert!(bigint.validate(&json!(12), Access::Internal).unwrap().success);
        assert!(!bigint.validate(&json!(1.5), Access::Internal).unwrap().success);
    }

    #[test]
    fn test_dates() {
        let date = build(&MetadataType::primitive(PrimitiveName::Date));
        for valid in ["2024-01-31", "2024-01-31T10:20:30Z", "2024-01-31T10:20:30.123+02:00"] {
            assert!(date.validate(&json!(valid), Access::Internal).unwrap().success, "{}", valid);
        }
        let result = date.validate(&json!("31/01/2024"), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Format]);
        let result = date.validate(&json!(5), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Type]);
    }

    #[test]
    fn test_interface_fields_and_paths() {
        let members = BTreeMap::from([
            member("street", true, false, MetadataType::primitive(PrimitiveName::String)),
            member("zip", false, false, MetadataType::primitive(PrimitiveName::Number)),
        ]);
        let validator = build(&MetadataType::array(MetadataType::Interface { members }));

        let result = validator
            .validate(&json!([{"street": "Main"}, {"zip": "x", "city": "Oslo"}]), Access::Internal)
            .unwrap();
        assert_eq!(
            kinds(&result),
            vec![IssueKind::Required, IssueKind::Type, IssueKind::Inexistent]
        );
        assert_eq!(result.errors[0].path, vec!["1", "street"]);
        assert_eq!(result.errors[1].path, vec!["1", "zip"]);
        assert_eq!(result.errors[2].path, vec!["1", "city"]);
    }

    #[test]
    fn test_internal_fields_are_forbidden_externally() {
        let members = BTreeMap::from([
            member("name", true, false, MetadataType::primitive(PrimitiveName::String)),
            member("secret", true, true, MetadataType::primitive(PrimitiveName::String)),
        ]);
        let validator = build(&MetadataType::Interface { members });
        let value = json!({"name": "a", "secret": "s"});

        assert!(validator.validate(&value, Access::Internal).unwrap().success);
        let result = validator.validate(&value, Access::External).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Forbidden]);

        // Absent internal fields are fine from outside
        assert!(validator.validate(&json!({"name": "a"}), Access::External).unwrap().success);
    }

    #[test]
    fn test_tuple() {
        let validator = build(&MetadataType::Tuple {
            sub_types: vec![
                MetadataType::primitive(PrimitiveName::String),
                MetadataType::optional(MetadataType::primitive(PrimitiveName::Number)),
            ],
        });
        assert!(validator.validate(&json!(["a", 1]), Access::Internal).unwrap().success);
        assert!(validator.validate(&json!(["a"]), Access::Internal).unwrap().success);
        let result = validator.validate(&json!([]), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Required]);
        let result = validator.validate(&json!(["a", 1, 2]), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Inexistent]);
    }

    #[test]
    fn test_custom_properties_constrain() {
        let mut properties = Map::new();
        properties.insert("minLength".into(), json!(2));
        properties.insert("pattern".into(), json!("/^[a-z]+$/i"));
        let validator = build(&MetadataType::Custom {
            identifier: "Slug".into(),
            properties,
            wrapped_type: Box::new(MetadataType::primitive(PrimitiveName::String)),
        });
        assert!(validator.validate(&json!("AbC"), Access::Internal).unwrap().success);
        let result = validator.validate(&json!("a"), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::RangeUnderflow]);
        let result = validator.validate(&json!("a-b"), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Format]);
    }

    #[test]
    fn test_invalid_constraint_options() {
        let mut options = Map::new();
        options.insert("pattern".into(), json!("("));
        assert!(matches!(
            Constraints::from_options(&options, "User.name"),
            Err(SchemaError::InvalidOption { .. })
        ));
        let mut options = Map::new();
        options.insert("maxLength".into(), json!(-1));
        assert!(Constraints::from_options(&options, "User.name").is_err());
    }

    #[test]
    fn test_intersection_merges_objects() {
        let left = MetadataType::Interface {
            members: BTreeMap::from([member("a", true, false, MetadataType::Mixed)]),
        };
        let right = MetadataType::Interface {
            members: BTreeMap::from([member("b", true, false, MetadataType::Mixed)]),
        };
        let validator = build(&MetadataType::Intersection {
            sub_types: vec![left, right],
        });
        assert!(validator.validate(&json!({"a": 1, "b": 2}), Access::Internal).unwrap().success);
        let result = validator.validate(&json!({"a": 1}), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Required]);
    }

    #[test]
    fn test_unresolved_is_an_error() {
        let store = MetadataStore::new();
        assert!(matches!(
            Validator::from_type(&MetadataType::Unresolved, "User.x", &store),
            Err(SchemaError::UnresolvedType { .. })
        ));
    }

    #[test]
    fn test_unknown_model_errors_at_validation() {
        let store = MetadataStore::new();
        let validator = Validator::from_type(&MetadataType::model_ref("Ghost"), "User.x", &store).unwrap();
        assert!(matches!(
            validator.validate(&json!({}), Access::Internal),
            Err(SchemaError::UnknownModel { .. })
        ));
        // Non-objects fail before the model is needed
        let result = validator.validate(&json!(3), Access::Internal).unwrap();
        assert_eq!(kinds(&result), vec![IssueKind::Type]);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ValidationResult::from_issues(vec![ValidationIssue {
            kind: IssueKind::RangeOverflow,
            path: vec!["age".into()],
            value: json!(200),
            message: "must be at most 130".into(),
        }]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "success": false,
                "errors": [{
                    "kind": "rangeOverflow",
                    "path": ["age"],
                    "value": 200,
                    "message": "must be at most 130"
                }]
            })
        );
    }
}
