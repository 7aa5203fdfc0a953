use parking_lot::RwLock;
use serde_json::Value;
use sigil_engine::{ActionMetadata, DeclarationKind};
use std::sync::Arc;

use super::{ArgumentSchema, Schema, SchemaCore};
use crate::error::SchemaError;
use crate::store::MetadataStore;
use crate::validator::{Access, ValidationResult, Validator};

/// Schema of an action method and its arguments.
pub struct ActionSchema {
    core: SchemaCore,
    metadata: ActionMetadata,
    arguments: RwLock<Vec<Arc<ArgumentSchema>>>,
}

impl ActionSchema {
    pub fn new(
        store: &Arc<MetadataStore>,
        owner: &str,
        metadata: ActionMetadata,
        declared: Value,
        merged: Value,
    ) -> Self {
        let core = SchemaCore::new(store, &metadata.name, Some(owner), declared, merged);
        Self {
            core,
            metadata,
            arguments: RwLock::new(Vec::new()),
        }
    }

    pub fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    pub fn is_static(&self) -> bool {
        self.metadata.is_static
    }

    pub fn is_async(&self) -> bool {
        self.metadata.is_async
    }

    pub fn is_internal(&self) -> bool {
        self.metadata.is_internal
    }

    /// Add or replace an argument; arguments stay ordered by position.
    pub fn add_argument(&self, argument: Arc<ArgumentSchema>) {
        let mut arguments = self.arguments.write();
        arguments.retain(|a| a.internal_name() != argument.internal_name());
        arguments.push(argument);
        arguments.sort_by_key(|a| a.index());
        drop(arguments);
        self.core.invalidate();
    }

    pub fn arguments(&self) -> Vec<Arc<ArgumentSchema>> {
        self.arguments.read().clone()
    }

    /// Validate positional call arguments.
    pub fn validate_args(&self, args: &[Value], access: Access) -> Result<ValidationResult, SchemaError> {
        self.validate(&Value::Array(args.to_vec()), access)
    }
}

impl Schema for ActionSchema {
    fn core(&self) -> &SchemaCore {
        &self.core
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Action
    }

    fn build_validator(&self) -> Result<Validator, SchemaError> {
        let fields = self
            .arguments()
            .iter()
            .map(|argument| argument.field())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Validator::Positional(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueKind;
    use serde_json::json;
    use sigil_engine::{AttrMetadata, MetadataType, PrimitiveName};

    fn argument(store: &Arc<MetadataStore>, name: &str, index: usize, required: bool) -> Arc<ArgumentSchema> {
        let metadata = AttrMetadata {
            name: name.into(),
            is_required: required,
            is_read_only: false,
            is_internal: false,
            is_lazy: false,
            ty: MetadataType::primitive(PrimitiveName::String),
        };
        Arc::new(ArgumentSchema::new(store, "User.rename", metadata, index, json!({}), json!({})))
    }

    fn action(store: &Arc<MetadataStore>) -> ActionSchema {
        let metadata = ActionMetadata {
            name: "rename".into(),
            is_internal: false,
            is_static: false,
            is_async: true,
        };
        ActionSchema::new(store, "User", metadata, json!({}), json!({}))
    }

    #[test]
    fn test_arguments_ordered_by_position() {
        let store = MetadataStore::new();
        let rename = action(&store);
        rename.add_argument(argument(&store, "reason", 1, false));
        rename.add_argument(argument(&store, "name", 0, true));
        rename.add_argument(argument(&store, "reason", 1, false));

        let names: Vec<String> = rename
            .arguments()
            .iter()
            .map(|a| a.internal_name().to_string())
            .collect();
        assert_eq!(names, vec!["name", "reason"]);
        assert!(rename.is_async());
    }

    #[test]
    fn test_validate_args() {
        let store = MetadataStore::new();
        let rename = action(&store);
        rename.add_argument(argument(&store, "name", 0, true));
        rename.add_argument(argument(&store, "reason", 1, false));

        assert!(rename.validate_args(&[json!("Ada")], Access::Internal).unwrap().success);

        let result = rename.validate_args(&[], Access::Internal).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, IssueKind::Required);
        assert_eq!(result.errors[0].path, vec!["name"]);

        let result = rename
            .validate_args(&[json!(1), json!("x"), json!(true)], Access::Internal)
            .unwrap();
        let kinds: Vec<IssueKind> = result.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![IssueKind::Type, IssueKind::Inexistent]);
        assert_eq!(result.errors[1].path, vec!["2"]);
    }
}
