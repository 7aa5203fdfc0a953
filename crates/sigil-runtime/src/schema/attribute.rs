use parking_lot::RwLock;
use serde_json::{Map, Value};
use sigil_engine::{AttrMetadata, DeclarationKind, MetadataType};
use std::sync::Arc;

use super::{Schema, SchemaCore};
use crate::attribute::Change;
use crate::error::SchemaError;
use crate::persistence::PersistenceDeclaration;
use crate::store::MetadataStore;
use crate::validator::{validate_field, Access, Constraints, Field, ValidationResult, Validator};

/// Author validator: `Err` carries the violation message.
pub type ValidatorHook = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Author transform applied to every assigned value.
pub type SetterHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Listener for one kind of change entry.
pub type ChangeHook = Arc<dyn Fn(&Change) + Send + Sync>;

/// Hooks an attribute dispatches to while being set.
#[derive(Clone, Default)]
pub struct Hooks {
    pub validator: Option<ValidatorHook>,
    pub setter: Option<SetterHook>,
    pub on_change: Vec<ChangeHook>,
    pub on_add: Vec<ChangeHook>,
    pub on_remove: Vec<ChangeHook>,
}

/// Schema of a model attribute.
pub struct AttributeSchema {
    core: SchemaCore,
    metadata: AttrMetadata,
    hooks: RwLock<Hooks>,
    persistence: RwLock<Option<PersistenceDeclaration>>,
}

impl AttributeSchema {
    pub fn new(
        store: &Arc<MetadataStore>,
        owner: &str,
        metadata: AttrMetadata,
        declared: Value,
        merged: Value,
    ) -> Self {
        let core = SchemaCore::new(store, &metadata.name, Some(owner), declared, merged);
        Self {
            core,
            metadata,
            hooks: RwLock::new(Hooks::default()),
            persistence: RwLock::new(None),
        }
    }

    pub fn metadata(&self) -> &AttrMetadata {
        &self.metadata
    }

    pub fn ty(&self) -> &MetadataType {
        &self.metadata.ty
    }

    /// Class declaring this attribute
    pub fn owner_class(&self) -> &str {
        self.core.owner().unwrap_or_default()
    }

    pub fn is_required(&self) -> bool {
        self.metadata.is_required
    }

    pub fn is_read_only(&self) -> bool {
        self.metadata.is_read_only
    }

    pub fn is_internal(&self) -> bool {
        self.metadata.is_internal
    }

    pub fn is_lazy(&self) -> bool {
        self.metadata.is_lazy
    }

    /// `default` option (literal field initializer)
    pub fn default_value(&self) -> Option<Value> {
        self.core.options().get("default").cloned()
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    pub fn set_validator<F>(&self, hook: F)
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.write().validator = Some(Arc::new(hook));
    }

    pub fn set_setter<F>(&self, hook: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hooks.write().setter = Some(Arc::new(hook));
    }

    pub fn on_change<F>(&self, hook: F)
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.hooks.write().on_change.push(Arc::new(hook));
    }

    pub fn on_add<F>(&self, hook: F)
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.hooks.write().on_add.push(Arc::new(hook));
    }

    pub fn on_remove<F>(&self, hook: F)
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.hooks.write().on_remove.push(Arc::new(hook));
    }

    /// Snapshot of the hooks; dispatch never holds the lock.
    pub fn hooks(&self) -> Hooks {
        self.hooks.read().clone()
    }

    // ========================================================================
    // Validation and persistence
    // ========================================================================

    /// This attribute as a field of its model's object validator
    pub fn field(&self) -> Result<Field, SchemaError> {
        Ok(Field {
            name: self.metadata.name.clone(),
            required: self.metadata.is_required,
            internal: self.metadata.is_internal,
            admits_null: self.metadata.ty.admits_null(),
            validator: self.schema_type()?,
        })
    }

    /// Derived in phase two.
    pub fn persistence(&self) -> Result<PersistenceDeclaration, SchemaError> {
        self.persistence
            .read()
            .clone()
            .ok_or_else(|| SchemaError::NotConstructed {
                name: self.core.path(),
            })
    }

    pub fn set_persistence(&self, declaration: PersistenceDeclaration) {
        *self.persistence.write() = Some(declaration);
    }
}

impl Schema for AttributeSchema {
    fn core(&self) -> &SchemaCore {
        &self.core
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Attribute
    }

    fn build_validator(&self) -> Result<Validator, SchemaError> {
        let store = self.core.store()?;
        let path = self.core.path();
        let base = Validator::from_type(&self.metadata.ty, &path, &store)?;
        let options = match self.core.options() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let constraints = Constraints::from_options(&options, &path)?;
        Ok(base.constrained(constraints))
    }

    /// Changing options also drops the validators of the owning model and
    /// of every model that inherits from it.
    fn update_options(&self, patch: &Value) {
        self.core.update_options(patch);
        if let Ok(store) = self.core.store() {
            for class in store.descendants(self.owner_class()) {
                if let Some(model) = store.get_model_schema(&class) {
                    model.core().invalidate();
                }
            }
        }
    }

    /// Validates the attribute value alone, at path `[name]`.
    fn validate(&self, value: &Value, access: Access) -> Result<ValidationResult, SchemaError> {
        validate_field(&self.field()?, Some(value), access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueKind;
    use serde_json::json;
    use sigil_engine::PrimitiveName;

    fn schema(store: &Arc<MetadataStore>, required: bool, options: Value) -> AttributeSchema {
        let metadata = AttrMetadata {
            name: "age".into(),
            is_required: required,
            is_read_only: false,
            is_internal: false,
            is_lazy: false,
            ty: MetadataType::primitive(PrimitiveName::Number),
        };
        AttributeSchema::new(store, "User", metadata, options.clone(), options)
    }

    #[test]
    fn test_validate_with_option_constraints() {
        let store = MetadataStore::new();
        let age = schema(&store, true, json!({"min": 0, "max": 130, "integer": true}));

        assert!(age.validate(&json!(30), Access::Internal).unwrap().success);

        let result = age.validate(&json!(-1), Access::Internal).unwrap();
        assert_eq!(result.errors[0].kind, IssueKind::RangeUnderflow);
        assert_eq!(result.errors[0].path, vec!["age"]);

        let result = age.validate(&json!(200), Access::Internal).unwrap();
        assert_eq!(result.errors[0].kind, IssueKind::RangeOverflow);

        let result = age.validate(&json!(1.5), Access::Internal).unwrap();
        assert_eq!(result.errors[0].kind, IssueKind::Type);

        let result = age.validate(&Value::Null, Access::Internal).unwrap();
        assert_eq!(result.errors[0].kind, IssueKind::Required);
    }

    #[test]
    fn test_optional_accepts_null() {
        let store = MetadataStore::new();
        let age = schema(&store, false, json!({}));
        assert!(age.validate(&Value::Null, Access::Internal).unwrap().success);
        assert_eq!(age.default_value(), None);
    }

    #[test]
    fn test_update_options_rebuilds_validator() {
        let store = MetadataStore::new();
        let age = schema(&store, true, json!({}));
        assert!(age.validate(&json!(500), Access::Internal).unwrap().success);

        age.update_options(&json!({"max": 130}));
        let result = age.validate(&json!(500), Access::Internal).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_hooks_are_snapshotted() {
        let store = MetadataStore::new();
        let age = schema(&store, true, json!({"default": 18}));
        age.set_validator(|v| if v.as_f64() < Some(0.0) { Err("negative".into()) } else { Ok(()) });
        age.on_change(|_| {});
        age.on_change(|_| {});

        let hooks = age.hooks();
        assert!(hooks.validator.is_some());
        assert!(hooks.setter.is_none());
        assert_eq!(hooks.on_change.len(), 2);
        assert_eq!(age.default_value(), Some(json!(18)));
    }

    #[test]
    fn test_persistence_before_construction() {
        let store = MetadataStore::new();
        let age = schema(&store, true, json!({}));
        assert!(matches!(
            age.persistence(),
            Err(SchemaError::NotConstructed { .. })
        ));
    }
}
