//! Persistence declarations
//!
//! Derives the column or relation an attribute maps to. Only the
//! declaration surface is produced here; executing it is the storage
//! engine's job.
//!
//! Precedence: `primary`, `isGenerated`, the date flags, `isVersion`, a
//! model-reference relation, then a plain column.

use serde::Serialize;
use serde_json::Value;
use sigil_engine::{MetadataType, PrimitiveName};
use std::fmt;

use crate::error::SchemaError;
use crate::options::OptionsExt;
use crate::schema::{AttributeSchema, Schema};
use crate::store::MetadataStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PersistenceDeclaration {
    Primary { generated: Option<GenerationStrategy> },
    Generated { strategy: GenerationStrategy },
    CreateDate,
    UpdateDate,
    DeleteDate,
    Version,
    Relation(RelationDeclaration),
    Column(ColumnDeclaration),
}

impl PersistenceDeclaration {
    pub fn relation(&self) -> Option<&RelationDeclaration> {
        match self {
            PersistenceDeclaration::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<&ColumnDeclaration> {
        match self {
            PersistenceDeclaration::Column(column) => Some(column),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationStrategy {
    Increment,
    Uuid,
    Custom(String),
}

impl GenerationStrategy {
    fn parse(name: &str) -> Self {
        match name {
            "increment" => GenerationStrategy::Increment,
            "uuid" => GenerationStrategy::Uuid,
            other => GenerationStrategy::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinality {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl Cardinality {
    pub fn label(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::ManyToMany => "many-to-many",
        }
    }

    fn from_sides(many_targets: bool, many_owners: bool) -> Self {
        match (many_targets, many_owners) {
            (false, false) => Cardinality::OneToOne,
            (false, true) => Cardinality::OneToMany,
            (true, false) => Cardinality::ManyToOne,
            (true, true) => Cardinality::ManyToMany,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDeclaration {
    /// Target model class
    pub target: String,
    pub cardinality: Cardinality,
    /// Attribute on the target pointing back, if any
    pub inverse: Option<String>,
    pub join_column: Option<String>,
    /// This side holds the foreign key or join table
    pub owner: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDeclaration {
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub index: bool,
    /// False for read-only attributes
    pub update: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum ColumnType {
    Text,
    Number,
    Integer,
    Boolean,
    BigInt,
    DateTime,
    Enum(Vec<Value>),
    SimpleArray,
    SimpleJson,
    Json,
}

/// Derive the declaration of `attribute`. Relation targets and inverse
/// sides are looked up by name, so every model must already be registered.
pub fn derive(store: &MetadataStore, attribute: &AttributeSchema) -> Result<PersistenceDeclaration, SchemaError> {
    let options = attribute.options();
    let ty = attribute.ty();

    let generated = match options.get("isGenerated") {
        Some(Value::Bool(true)) => Some(default_strategy(ty)),
        Some(Value::String(name)) => Some(GenerationStrategy::parse(name)),
        _ => None,
    };

    if options.flag("primary") {
        return Ok(PersistenceDeclaration::Primary { generated });
    }
    if let Some(strategy) = generated {
        return Ok(PersistenceDeclaration::Generated { strategy });
    }
    if options.flag("isCreationDate") {
        return Ok(PersistenceDeclaration::CreateDate);
    }
    if options.flag("isUpdateDate") {
        return Ok(PersistenceDeclaration::UpdateDate);
    }
    if options.flag("isDeletionDate") {
        return Ok(PersistenceDeclaration::DeleteDate);
    }
    if options.flag("isVersion") {
        return Ok(PersistenceDeclaration::Version);
    }

    if let Some(target) = relation_target(ty) {
        if let Some(relation) = derive_relation(store, attribute, &target, &options)? {
            return Ok(PersistenceDeclaration::Relation(relation));
        }
        tracing::warn!(
            attribute = %attribute.core().path(),
            target = %target.class,
            "array relation without an inverse attribute; stored as a json column"
        );
        return Ok(PersistenceDeclaration::Column(ColumnDeclaration {
            column_type: ColumnType::Json,
            ..column_flags(attribute, &options)
        }));
    }

    Ok(PersistenceDeclaration::Column(ColumnDeclaration {
        column_type: column_type(ty, options.flag("integer")),
        ..column_flags(attribute, &options)
    }))
}

fn default_strategy(ty: &MetadataType) -> GenerationStrategy {
    match ty.unwrapped() {
        MetadataType::Primitive {
            name: PrimitiveName::String,
        } => GenerationStrategy::Uuid,
        _ => GenerationStrategy::Increment,
    }
}

// ============================================================================
// Relations
// ============================================================================

struct Target {
    class: String,
    many: bool,
    nullable: bool,
}

/// Strip `null` and `undefined` members from a union.
fn non_null(ty: &MetadataType) -> (&MetadataType, bool) {
    let ty = ty.unwrapped();
    if let MetadataType::Union { sub_types } = ty {
        let rest: Vec<&MetadataType> = sub_types
            .iter()
            .filter(|t| !matches!(t, MetadataType::Null | MetadataType::Undefined))
            .collect();
        if rest.len() == 1 && rest.len() < sub_types.len() {
            return (rest[0].unwrapped(), true);
        }
    }
    (ty, false)
}

/// Model targeted by a scalar or array reference.
fn relation_target(ty: &MetadataType) -> Option<Target> {
    let (ty, nullable) = non_null(ty);
    match ty {
        MetadataType::ModelRef { identifier } => Some(Target {
            class: identifier.clone(),
            many: false,
            nullable,
        }),
        MetadataType::Array { sub_type } => match non_null(sub_type).0 {
            MetadataType::ModelRef { identifier } => Some(Target {
                class: identifier.clone(),
                many: true,
                nullable,
            }),
            _ => None,
        },
        _ => None,
    }
}

fn derive_relation(
    store: &MetadataStore,
    attribute: &AttributeSchema,
    target: &Target,
    options: &Value,
) -> Result<Option<RelationDeclaration>, SchemaError> {
    let owner_class = attribute.owner_class();
    let name = attribute.internal_name();
    let nullable = target.nullable || !attribute.is_required();
    let join_column = options.text("relationColumn").map(str::to_string);

    if join_column.is_some() && options.flag("isRelationOwner") && !target.many {
        return Ok(Some(RelationDeclaration {
            target: target.class.clone(),
            cardinality: Cardinality::OneToOne,
            inverse: find_inverse(store, attribute, target, options)?.map(|(name, _)| name),
            join_column,
            owner: true,
            nullable,
        }));
    }

    let Some((inverse, inverse_many)) = find_inverse(store, attribute, target, options)? else {
        if target.many {
            return Ok(None);
        }
        return Ok(Some(RelationDeclaration {
            target: target.class.clone(),
            cardinality: Cardinality::OneToMany,
            inverse: None,
            join_column,
            owner: true,
            nullable,
        }));
    };

    let cardinality = Cardinality::from_sides(target.many, inverse_many);
    let owner = match cardinality {
        Cardinality::ManyToOne => false,
        Cardinality::OneToMany => true,
        Cardinality::OneToOne | Cardinality::ManyToMany => {
            match options.get("isRelationOwner").and_then(Value::as_bool) {
                Some(flag) => flag,
                None => {
                    let other = store
                        .get_attribute_schema(&target.class, &inverse)
                        .is_some_and(|s| s.options().flag("isRelationOwner"));
                    !other && (owner_class, name) <= (target.class.as_str(), inverse.as_str())
                }
            }
        }
    };

    Ok(Some(RelationDeclaration {
        target: target.class.clone(),
        cardinality,
        inverse: Some(inverse),
        join_column,
        owner,
        nullable,
    }))
}

/// The target attribute referencing back to the owner class or one of its
/// ancestors, with whether it is array-typed.
fn find_inverse(
    store: &MetadataStore,
    attribute: &AttributeSchema,
    target: &Target,
    options: &Value,
) -> Result<Option<(String, bool)>, SchemaError> {
    let owner_class = attribute.owner_class();
    let Some(model) = store.get_model_schema(&target.class) else {
        return Err(SchemaError::UnknownModel {
            name: target.class.clone(),
        });
    };

    if let Some(name) = options.text("inverse") {
        let inverse = model.attribute_schema(name)?;
        let many = relation_target(inverse.ty()).is_some_and(|t| t.many);
        return Ok(Some((name.to_string(), many)));
    }

    let lineage = store.ancestors(owner_class);
    let mut candidates = Vec::new();
    for name in model.attribute_names()? {
        if target.class == owner_class && name == attribute.internal_name() {
            continue;
        }
        let schema = model.attribute_schema(&name)?;
        let Some(back) = relation_target(schema.ty()) else {
            continue;
        };
        if lineage.contains(&back.class) {
            candidates.push((name, back.many));
        }
    }

    if candidates.len() > 1 {
        tracing::warn!(
            attribute = %attribute.core().path(),
            target = %target.class,
            candidates = candidates.len(),
            "ambiguous inverse attribute; using the first"
        );
    }
    Ok(candidates.into_iter().next())
}

// ============================================================================
// Columns
// ============================================================================

fn column_flags(attribute: &AttributeSchema, options: &Value) -> ColumnDeclaration {
    let ty = attribute.ty();
    ColumnDeclaration {
        column_type: ColumnType::Json,
        nullable: !attribute.is_required()
            || ty.admits_null()
            || matches!(ty, MetadataType::Optional { .. }),
        unique: options.flag("unique"),
        index: options.flag("index"),
        update: !attribute.is_read_only(),
    }
}

fn column_type(ty: &MetadataType, integer: bool) -> ColumnType {
    let (ty, _) = non_null(ty);
    match ty {
        MetadataType::Interface { .. } => ColumnType::SimpleJson,
        MetadataType::Array { .. } | MetadataType::Tuple { .. } => ColumnType::SimpleArray,
        MetadataType::Primitive { name } => match name {
            PrimitiveName::String => ColumnType::Text,
            PrimitiveName::Number if integer => ColumnType::Integer,
            PrimitiveName::Number => ColumnType::Number,
            PrimitiveName::Boolean => ColumnType::Boolean,
            PrimitiveName::BigInt => ColumnType::BigInt,
            PrimitiveName::Date => ColumnType::DateTime,
        },
        MetadataType::Literal { value, .. } => ColumnType::Enum(vec![value.clone()]),
        MetadataType::Union { sub_types } => {
            let values: Option<Vec<Value>> = sub_types
                .iter()
                .filter(|t| !matches!(t, MetadataType::Null | MetadataType::Undefined))
                .map(|t| match t {
                    MetadataType::Literal { value, .. } => Some(value.clone()),
                    _ => None,
                })
                .collect();
            values.map(ColumnType::Enum).unwrap_or(ColumnType::Json)
        }
        _ => ColumnType::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigil_engine::LiteralKind;

    #[test]
    fn test_cardinality_from_sides() {
        assert_eq!(Cardinality::from_sides(true, false), Cardinality::ManyToOne);
        assert_eq!(Cardinality::from_sides(false, true), Cardinality::OneToMany);
        assert_eq!(Cardinality::from_sides(true, true), Cardinality::ManyToMany);
        assert_eq!(Cardinality::ManyToMany.to_string(), "many-to-many");
    }

    #[test]
    fn test_relation_target_shapes() {
        let scalar = relation_target(&MetadataType::model_ref("User")).unwrap();
        assert!(!scalar.many && !scalar.nullable);

        let nullable = relation_target(&MetadataType::Union {
            sub_types: vec![MetadataType::model_ref("User"), MetadataType::Null],
        })
        .unwrap();
        assert!(nullable.nullable);

        let many = relation_target(&MetadataType::array(MetadataType::model_ref("Post"))).unwrap();
        assert!(many.many);
        assert_eq!(many.class, "Post");

        assert!(relation_target(&MetadataType::array(MetadataType::primitive(PrimitiveName::String))).is_none());
    }

    #[test]
    fn test_column_types() {
        let string = MetadataType::primitive(PrimitiveName::String);
        let number = MetadataType::primitive(PrimitiveName::Number);
        assert_eq!(column_type(&string, false), ColumnType::Text);
        assert_eq!(column_type(&number, false), ColumnType::Number);
        assert_eq!(column_type(&number, true), ColumnType::Integer);
        assert_eq!(
            column_type(&MetadataType::primitive(PrimitiveName::Date), false),
            ColumnType::DateTime
        );
        assert_eq!(column_type(&MetadataType::array(string.clone()), false), ColumnType::SimpleArray);
        assert_eq!(
            column_type(
                &MetadataType::Union {
                    sub_types: vec![
                        MetadataType::literal(LiteralKind::String, "a"),
                        MetadataType::literal(LiteralKind::Number, 1),
                        MetadataType::Null,
                    ]
                },
                false
            ),
            ColumnType::Enum(vec![json!("a"), json!(1)])
        );
        assert_eq!(
            column_type(&MetadataType::Union { sub_types: vec![string, number] }, false),
            ColumnType::Json
        );
        assert_eq!(column_type(&MetadataType::Mixed, false), ColumnType::Json);
    }

    #[test]
    fn test_strategy_defaults() {
        assert_eq!(
            default_strategy(&MetadataType::primitive(PrimitiveName::String)),
            GenerationStrategy::Uuid
        );
        assert_eq!(
            default_strategy(&MetadataType::primitive(PrimitiveName::Number)),
            GenerationStrategy::Increment
        );
        assert_eq!(GenerationStrategy::parse("rowid"), GenerationStrategy::Custom("rowid".into()));
    }

    #[test]
    fn test_declaration_serializes_tagged() {
        let column = PersistenceDeclaration::Column(ColumnDeclaration {
            column_type: ColumnType::Enum(vec![json!("a")]),
            nullable: false,
            unique: true,
            index: false,
            update: true,
        });
        assert_eq!(
            serde_json::to_value(&column).unwrap(),
            json!({
                "kind": "column",
                "columnType": {"type": "enum", "values": ["a"]},
                "nullable": false,
                "unique": true,
                "index": false,
                "update": true
            })
        );
    }
}
