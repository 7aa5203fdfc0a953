//! Documented custom types
//!
//! A type alias whose doc comment carries the custom-type tag becomes a
//! `Custom` node instead of being expanded:
//!
//! ```text
//! /**
//!  * @customType
//!  * @property min Min
//!  * @property max Max
//!  * @emits T
//!  */
//! type Ranged<T, Min extends number = 0, Max extends number = 100> = T;
//! ```
//!
//! `@property <name> <Param>` exposes a type argument as a property: literal
//! arguments contribute their value, anything else its serialized metadata.
//! `@emits <Param>` names the argument that is the wrapped type; without it
//! the alias body is classified. Wrapping another custom type merges its
//! properties underneath the outer ones.

use super::context::Node;
use super::shape::bind_type_params;
use super::symbols::Program;
use super::Recurse;
use crate::error::AuthoringError;
use crate::metadata::MetadataType;
use crate::parser::ast::{TypeAliasDecl, TypeReference};
use serde_json::Map;

/// Tags read from a custom type alias.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomTypeSpec {
    /// (property name, type parameter) pairs in tag order
    pub properties: Vec<(String, String)>,
    /// Type parameter holding the wrapped type
    pub emits: Option<String>,
}

impl CustomTypeSpec {
    /// Read and check the tags of `alias`.
    pub fn from_alias(name: &str, alias: &TypeAliasDecl, program: &Program) -> Result<Self, AuthoringError> {
        let invalid = |reason: String| AuthoringError::InvalidCustomType {
            name: name.to_string(),
            reason,
        };
        let params: Vec<&str> = alias
            .type_params
            .iter()
            .map(|p| program.resolve(p.name.name))
            .collect();
        let check_param = |param: &str| {
            if params.contains(&param) {
                Ok(param.to_string())
            } else {
                Err(invalid(format!("`{}` is not a type parameter", param)))
            }
        };

        let mut spec = CustomTypeSpec::default();
        let Some(doc) = &alias.doc else {
            return Ok(spec);
        };

        for tag in doc.tags_named("property") {
            let mut words = tag.text.split_whitespace();
            let (Some(property), Some(param)) = (words.next(), words.next()) else {
                return Err(invalid(format!(
                    "`@property {}` needs a property name and a type parameter",
                    tag.text
                )));
            };
            spec.properties.push((property.to_string(), check_param(param)?));
        }

        for tag in doc.tags_named("emits") {
            if spec.emits.is_some() {
                return Err(invalid("more than one `@emits` tag".to_string()));
            }
            let Some(param) = tag.text.split_whitespace().next() else {
                return Err(invalid("`@emits` needs a type parameter".to_string()));
            };
            spec.emits = Some(check_param(param)?);
        }

        Ok(spec)
    }
}

/// Classify a reference to the custom type alias `name`.
pub fn emit_custom<'a>(
    recurse: &mut Recurse<'_, 'a>,
    name: &'a str,
    reference: &'a TypeReference,
) -> Result<MetadataType, AuthoringError> {
    let program = recurse.parent().program;
    let Some(alias) = program.alias(name) else {
        return Ok(MetadataType::Unresolved);
    };
    let spec = CustomTypeSpec::from_alias(name, alias, program)?;
    let scope = bind_type_params(recurse, &alias.type_params, &reference.type_args)?;

    let mut properties = Map::new();
    for (property, param) in &spec.properties {
        let value = match scope.get(param) {
            // Missing argument without a default
            None | Some(MetadataType::Unresolved) => continue,
            Some(MetadataType::Literal { value, .. }) => value.clone(),
            Some(other) => serde_json::to_value(other).map_err(|e| AuthoringError::InvalidCustomType {
                name: name.to_string(),
                reason: e.to_string(),
            })?,
        };
        properties.insert(property.clone(), value);
    }

    let wrapped = match &spec.emits {
        Some(param) => match scope.get(param).cloned().unwrap_or(MetadataType::Unresolved) {
            MetadataType::Custom {
                properties: inner,
                wrapped_type,
                ..
            } => {
                let mut merged = inner;
                merged.extend(properties);
                properties = merged;
                *wrapped_type
            }
            other => other,
        },
        None => {
            let ctx = recurse
                .parent()
                .expansion(Node::Type(&alias.type_annotation), name, scope)?;
            recurse.run(ctx)?
        }
    };

    Ok(MetadataType::Custom {
        identifier: name.to_string(),
        properties,
        wrapped_type: Box::new(wrapped),
    })
}
