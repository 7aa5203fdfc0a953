use serde_json::Value;
use sigil_engine::{AttrMetadata, DeclarationKind, MetadataType};
use std::sync::Arc;

use super::{Schema, SchemaCore};
use crate::error::SchemaError;
use crate::store::MetadataStore;
use crate::validator::{validate_field, Access, Constraints, Field, ValidationResult, Validator};

/// Schema of one action argument. The owner is `Class.action`.
pub struct ArgumentSchema {
    core: SchemaCore,
    metadata: AttrMetadata,
    /// Position in the method's parameter list
    index: usize,
}

impl ArgumentSchema {
    pub fn new(
        store: &Arc<MetadataStore>,
        owner: &str,
        metadata: AttrMetadata,
        index: usize,
        declared: Value,
        merged: Value,
    ) -> Self {
        let core = SchemaCore::new(store, &metadata.name, Some(owner), declared, merged);
        Self { core, metadata, index }
    }

    pub fn metadata(&self) -> &AttrMetadata {
        &self.metadata
    }

    pub fn ty(&self) -> &MetadataType {
        &self.metadata.ty
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_required(&self) -> bool {
        self.metadata.is_required
    }

    pub fn field(&self) -> Result<Field, SchemaError> {
        Ok(Field {
            name: self.metadata.name.clone(),
            required: self.metadata.is_required,
            internal: self.metadata.is_internal,
            admits_null: self.metadata.ty.admits_null(),
            validator: self.schema_type()?,
        })
    }
}

impl Schema for ArgumentSchema {
    fn core(&self) -> &SchemaCore {
        &self.core
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Argument
    }

    fn build_validator(&self) -> Result<Validator, SchemaError> {
        let store = self.core.store()?;
        let path = self.core.path();
        let base = Validator::from_type(&self.metadata.ty, &path, &store)?;
        let constraints = match self.core.options() {
            Value::Object(map) => Constraints::from_options(&map, &path)?,
            _ => Constraints::default(),
        };
        Ok(base.constrained(constraints))
    }

    fn validate(&self, value: &Value, access: Access) -> Result<ValidationResult, SchemaError> {
        validate_field(&self.field()?, Some(value), access)
    }
}
