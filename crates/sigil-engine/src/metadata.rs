//! Metadata data model
//!
//! The classified shape of a declaration's type ([`MetadataType`]) and the
//! per-declaration records the emitter embeds into annotation calls. All
//! records are plain serde data: they serialize to the camelCase JSON
//! payload and parse back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of annotated declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    /// A model class
    Model,
    /// A model attribute (class field)
    Attribute,
    /// A parameter of an action method
    Argument,
    /// An action method
    Action,
}

impl DeclarationKind {
    /// All kinds, in dispatch-table order.
    pub const ALL: [DeclarationKind; 4] = [
        DeclarationKind::Model,
        DeclarationKind::Attribute,
        DeclarationKind::Argument,
        DeclarationKind::Action,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Model => "model",
            DeclarationKind::Attribute => "attribute",
            DeclarationKind::Argument => "argument",
            DeclarationKind::Action => "action",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builtin scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveName {
    String,
    Number,
    Boolean,
    BigInt,
    Date,
}

impl PrimitiveName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveName::String => "String",
            PrimitiveName::Number => "Number",
            PrimitiveName::Boolean => "Boolean",
            PrimitiveName::BigInt => "BigInt",
            PrimitiveName::Date => "Date",
        }
    }
}

/// Sub-kind of a literal type. `Number` literals are tagged so consumers
/// can treat unions of them as enum-like columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    BigInt,
}

/// Canonical shape of a classified type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetadataType {
    /// Anything (`any`)
    Mixed,
    /// Could not be classified; never valid in emitted metadata
    Unresolved,
    Null,
    Undefined,
    Primitive {
        name: PrimitiveName,
    },
    Literal {
        name: LiteralKind,
        value: Value,
    },
    /// Reference to another model class
    ModelRef {
        identifier: String,
    },
    Array {
        #[serde(rename = "subType")]
        sub_type: Box<MetadataType>,
    },
    Tuple {
        #[serde(rename = "subTypes")]
        sub_types: Vec<MetadataType>,
    },
    Optional {
        #[serde(rename = "subType")]
        sub_type: Box<MetadataType>,
    },
    Union {
        #[serde(rename = "subTypes")]
        sub_types: Vec<MetadataType>,
    },
    Intersection {
        #[serde(rename = "subTypes")]
        sub_types: Vec<MetadataType>,
    },
    /// Structural object shape; members carry their own flags
    Interface {
        members: BTreeMap<String, AttrMetadata>,
    },
    /// Documented custom type wrapping another type
    Custom {
        identifier: String,
        properties: Map<String, Value>,
        #[serde(rename = "wrappedType")]
        wrapped_type: Box<MetadataType>,
    },
}

impl MetadataType {
    pub fn primitive(name: PrimitiveName) -> Self {
        MetadataType::Primitive { name }
    }

    pub fn literal(name: LiteralKind, value: impl Into<Value>) -> Self {
        MetadataType::Literal {
            name,
            value: value.into(),
        }
    }

    pub fn model_ref(identifier: impl Into<String>) -> Self {
        MetadataType::ModelRef {
            identifier: identifier.into(),
        }
    }

    pub fn array(sub_type: MetadataType) -> Self {
        MetadataType::Array {
            sub_type: Box::new(sub_type),
        }
    }

    pub fn optional(sub_type: MetadataType) -> Self {
        MetadataType::Optional {
            sub_type: Box::new(sub_type),
        }
    }

    /// Tag name as it appears in the `kind` field.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetadataType::Mixed => "mixed",
            MetadataType::Unresolved => "unresolved",
            MetadataType::Null => "null",
            MetadataType::Undefined => "undefined",
            MetadataType::Primitive { .. } => "primitive",
            MetadataType::Literal { .. } => "literal",
            MetadataType::ModelRef { .. } => "modelRef",
            MetadataType::Array { .. } => "array",
            MetadataType::Tuple { .. } => "tuple",
            MetadataType::Optional { .. } => "optional",
            MetadataType::Union { .. } => "union",
            MetadataType::Intersection { .. } => "intersection",
            MetadataType::Interface { .. } => "interface",
            MetadataType::Custom { .. } => "custom",
        }
    }

    /// Immediate child types, including interface member types.
    pub fn children(&self) -> Vec<&MetadataType> {
        match self {
            MetadataType::Array { sub_type } | MetadataType::Optional { sub_type } => {
                vec![sub_type.as_ref()]
            }
            MetadataType::Tuple { sub_types }
            | MetadataType::Union { sub_types }
            | MetadataType::Intersection { sub_types } => sub_types.iter().collect(),
            MetadataType::Interface { members } => members.values().map(|m| &m.ty).collect(),
            MetadataType::Custom { wrapped_type, .. } => vec![wrapped_type.as_ref()],
            _ => Vec::new(),
        }
    }

    /// True if `Unresolved` appears anywhere in the tree.
    pub fn contains_unresolved(&self) -> bool {
        matches!(self, MetadataType::Unresolved)
            || self.children().into_iter().any(MetadataType::contains_unresolved)
    }

    /// Strip `Optional` and `Custom` wrappers.
    pub fn unwrapped(&self) -> &MetadataType {
        match self {
            MetadataType::Optional { sub_type } => sub_type.unwrapped(),
            MetadataType::Custom { wrapped_type, .. } => wrapped_type.unwrapped(),
            other => other,
        }
    }

    /// Whether `null` is an accepted value at the top level.
    pub fn admits_null(&self) -> bool {
        match self {
            MetadataType::Null | MetadataType::Mixed => true,
            MetadataType::Optional { sub_type } => sub_type.admits_null(),
            MetadataType::Custom { wrapped_type, .. } => wrapped_type.admits_null(),
            MetadataType::Union { sub_types } => sub_types.iter().any(MetadataType::admits_null),
            _ => false,
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[MetadataType], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            MetadataType::Mixed => f.write_str("mixed"),
            MetadataType::Unresolved => f.write_str("<unresolved>"),
            MetadataType::Null => f.write_str("null"),
            MetadataType::Undefined => f.write_str("undefined"),
            MetadataType::Primitive { name } => f.write_str(name.as_str()),
            MetadataType::Literal { value, .. } => write!(f, "{}", value),
            MetadataType::ModelRef { identifier } => write!(f, "&{}", identifier),
            MetadataType::Array { sub_type } => match sub_type.as_ref() {
                MetadataType::Union { .. } | MetadataType::Intersection { .. } => {
                    write!(f, "({})[]", sub_type)
                }
                _ => write!(f, "{}[]", sub_type),
            },
            MetadataType::Tuple { sub_types } => {
                f.write_str("[")?;
                join(f, sub_types, ", ")?;
                f.write_str("]")
            }
            MetadataType::Optional { sub_type } => write!(f, "{}?", sub_type),
            MetadataType::Union { sub_types } => join(f, sub_types, " | "),
            MetadataType::Intersection { sub_types } => join(f, sub_types, " & "),
            MetadataType::Interface { members } => {
                f.write_str("{ ")?;
                for (i, (name, member)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    let marker = if member.is_required { "" } else { "?" };
                    write!(f, "{}{}: {}", name, marker, member.ty)?;
                }
                f.write_str(" }")
            }
            MetadataType::Custom { identifier, wrapped_type, .. } => {
                write!(f, "{}<{}>", identifier, wrapped_type)
            }
        }
    }
}

/// Metadata of an attribute, argument or interface member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrMetadata {
    pub name: String,
    pub is_required: bool,
    pub is_read_only: bool,
    pub is_internal: bool,
    pub is_lazy: bool,
    #[serde(rename = "type")]
    pub ty: MetadataType,
}

/// Metadata of a model class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub class_name: String,
    pub collection_name: String,
    pub is_abstract: bool,
}

/// Metadata of an action method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub name: String,
    pub is_internal: bool,
    pub is_static: bool,
    pub is_async: bool,
}

/// Any emitted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    Model(ModelMetadata),
    Attribute(AttrMetadata),
    Action(ActionMetadata),
}

impl Metadata {
    /// Serialize to the compact JSON payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a payload previously produced by [`Metadata::to_json`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Declared name of the record.
    pub fn name(&self) -> &str {
        match self {
            Metadata::Model(m) => &m.class_name,
            Metadata::Attribute(a) => &a.name,
            Metadata::Action(a) => &a.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attr(name: &str, ty: MetadataType) -> AttrMetadata {
        AttrMetadata {
            name: name.to_string(),
            is_required: true,
            is_read_only: false,
            is_internal: false,
            is_lazy: false,
            ty,
        }
    }

    #[test]
    fn test_wire_format_is_kind_tagged_camel_case() {
        let ty = MetadataType::Union {
            sub_types: vec![
                MetadataType::literal(LiteralKind::String, "Test"),
                MetadataType::literal(LiteralKind::Number, 42),
            ],
        };
        assert_eq!(
            serde_json::to_value(&ty).unwrap(),
            json!({
                "kind": "union",
                "subTypes": [
                    {"kind": "literal", "name": "String", "value": "Test"},
                    {"kind": "literal", "name": "Number", "value": 42}
                ]
            })
        );

        let custom = MetadataType::Custom {
            identifier: "Range".into(),
            properties: Map::new(),
            wrapped_type: Box::new(MetadataType::model_ref("User")),
        };
        assert_eq!(
            serde_json::to_value(&custom).unwrap(),
            json!({
                "kind": "custom",
                "identifier": "Range",
                "properties": {},
                "wrappedType": {"kind": "modelRef", "identifier": "User"}
            })
        );
    }

    #[test]
    fn test_attr_metadata_field_names() {
        let meta = attr("name", MetadataType::primitive(PrimitiveName::String));
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"name":"name","isRequired":true,"isReadOnly":false,"isInternal":false,"isLazy":false,"type":{"kind":"primitive","name":"String"}}"#
        );
    }

    #[test]
    fn test_payload_kinds_are_distinguished() {
        let model = Metadata::from_json(
            r#"{"className":"User","collectionName":"users","isAbstract":false}"#,
        )
        .unwrap();
        assert!(matches!(model, Metadata::Model(_)));

        let action = Metadata::from_json(
            r#"{"name":"rename","isInternal":false,"isStatic":false,"isAsync":true}"#,
        )
        .unwrap();
        assert!(matches!(action, Metadata::Action(_)));

        let attribute = Metadata::Attribute(attr("x", MetadataType::Mixed));
        let json = attribute.to_json().unwrap();
        assert_eq!(Metadata::from_json(&json).unwrap(), attribute);
    }

    #[test]
    fn test_nested_interface_round_trip() {
        let mut members = BTreeMap::new();
        members.insert(
            "tags".to_string(),
            attr("tags", MetadataType::array(MetadataType::Mixed)),
        );
        members.insert(
            "owner".to_string(),
            attr("owner", MetadataType::optional(MetadataType::model_ref("User"))),
        );
        let ty = MetadataType::Interface { members };

        let json = serde_json::to_string(&ty).unwrap();
        let back: MetadataType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    #[test]
    fn test_contains_unresolved_looks_through_members() {
        let mut members = BTreeMap::new();
        members.insert("bad".to_string(), attr("bad", MetadataType::Unresolved));
        let ty = MetadataType::array(MetadataType::Interface { members });
        assert!(ty.contains_unresolved());
        assert!(!MetadataType::Mixed.contains_unresolved());
    }

    #[test]
    fn test_display() {
        let ty = MetadataType::array(MetadataType::Union {
            sub_types: vec![
                MetadataType::primitive(PrimitiveName::String),
                MetadataType::model_ref("User"),
            ],
        });
        assert_eq!(ty.to_string(), "(String | &User)[]");
    }
}
