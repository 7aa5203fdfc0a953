use parking_lot::RwLock;
use serde_json::Value;
use sigil_engine::{DeclarationKind, ModelMetadata};
use std::sync::Arc;

use super::{ActionSchema, AttributeSchema, Schema, SchemaCore};
use crate::error::SchemaError;
use crate::options::OptionsExt;
use crate::persistence::PersistenceDeclaration;
use crate::store::MetadataStore;
use crate::validator::Validator;

/// Schema of a model class.
pub struct ModelSchema {
    core: SchemaCore,
    metadata: ModelMetadata,
    parent: Option<String>,
    attributes: RwLock<Vec<String>>,
    actions: RwLock<Vec<String>>,
}

impl ModelSchema {
    pub fn new(
        store: &Arc<MetadataStore>,
        metadata: ModelMetadata,
        parent: Option<String>,
        declared: Value,
        merged: Value,
    ) -> Self {
        let core = SchemaCore::new(store, &metadata.class_name, None, declared, merged);
        Self {
            core,
            metadata,
            parent,
            attributes: RwLock::new(Vec::new()),
            actions: RwLock::new(Vec::new()),
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn class_name(&self) -> &str {
        &self.metadata.class_name
    }

    /// `collectionName` option, else the emitted default.
    pub fn collection_name(&self) -> String {
        self.core
            .options()
            .text("collectionName")
            .map(str::to_string)
            .unwrap_or_else(|| self.metadata.collection_name.clone())
    }

    pub fn is_abstract(&self) -> bool {
        self.metadata.is_abstract
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub fn add_attribute(&self, name: &str) {
        let mut attributes = self.attributes.write();
        if !attributes.iter().any(|a| a == name) {
            attributes.push(name.to_string());
        }
        drop(attributes);
        self.core.invalidate();
    }

    pub fn add_action(&self, name: &str) {
        let mut actions = self.actions.write();
        if !actions.iter().any(|a| a == name) {
            actions.push(name.to_string());
        }
    }

    /// Attributes declared on this class itself
    pub fn own_attribute_names(&self) -> Vec<String> {
        self.attributes.read().clone()
    }

    /// Attributes of this class and its ancestors, root first. A child
    /// redeclaration keeps the position of the parent's declaration.
    pub fn attribute_names(&self) -> Result<Vec<String>, SchemaError> {
        self.inherited(DeclarationKind::Attribute)
    }

    pub fn action_names(&self) -> Result<Vec<String>, SchemaError> {
        self.inherited(DeclarationKind::Action)
    }

    fn inherited(&self, kind: DeclarationKind) -> Result<Vec<String>, SchemaError> {
        let store = self.core.store()?;
        let mut names: Vec<String> = Vec::new();
        for class in store.ancestors(self.class_name()).iter().rev() {
            for name in store.member_names(kind, class) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    pub fn attribute_schema(&self, name: &str) -> Result<Arc<AttributeSchema>, SchemaError> {
        self.core
            .store()?
            .get_attribute_schema(self.class_name(), name)
            .ok_or_else(|| SchemaError::MissingAttribute {
                owner: self.class_name().to_string(),
                name: name.to_string(),
            })
    }

    pub fn action_schema(&self, name: &str) -> Result<Option<Arc<ActionSchema>>, SchemaError> {
        Ok(self.core.store()?.get_action_schema(self.class_name(), name))
    }

    /// Persistence declaration of every attribute, in attribute order.
    pub fn persistence(&self) -> Result<Vec<(String, PersistenceDeclaration)>, SchemaError> {
        self.attribute_names()?
            .into_iter()
            .map(|name| {
                let declaration = self.attribute_schema(&name)?.persistence()?;
                Ok((name, declaration))
            })
            .collect()
    }
}

impl Schema for ModelSchema {
    fn core(&self) -> &SchemaCore {
        &self.core
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Model
    }

    fn build_validator(&self) -> Result<Validator, SchemaError> {
        let store = self.core.store()?;
        let fields = self
            .attribute_names()?
            .iter()
            .map(|name| self.attribute_schema(name)?.field())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Validator::Object {
            fields,
            strict: store.config().strict_objects,
        })
    }
}
