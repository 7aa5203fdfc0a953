//! Schema hierarchy
//!
//! Runtime objects built from emitted metadata: [`ModelSchema`],
//! [`AttributeSchema`], [`ArgumentSchema`] and [`ActionSchema`]. Each shares
//! a [`SchemaCore`] holding names, merged options, the construction flag and
//! the lazily built validator.
//!
//! Schemas are built in two phases. Loading registers shells with their
//! merged options; [`MetadataStore::construct`] then resolves references by
//! name and marks every shell constructed.

mod action;
mod argument;
mod attribute;
mod model;

pub use action::ActionSchema;
pub use argument::ArgumentSchema;
pub use attribute::{AttributeSchema, ChangeHook, Hooks, SetterHook, ValidatorHook};
pub use model::ModelSchema;

use parking_lot::RwLock;
use serde_json::Value;
use sigil_engine::{DeclarationKind, MetadataType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::SchemaError;
use crate::options::{deep_merge, OptionsExt};
use crate::store::MetadataStore;
use crate::validator::{Access, ValidationResult, Validator};

/// State shared by every schema kind.
pub struct SchemaCore {
    /// Declared identifier
    internal_name: String,
    /// Owning class, or `Class.action` for arguments; `None` for models
    owner: Option<String>,
    /// Options exactly as declared on this declaration
    declared: Value,
    /// Options folded over the owner chain
    options: RwLock<Value>,
    constructed: AtomicBool,
    validator: RwLock<Option<Arc<Validator>>>,
    store: Weak<MetadataStore>,
}

impl SchemaCore {
    pub fn new(
        store: &Arc<MetadataStore>,
        internal_name: &str,
        owner: Option<&str>,
        declared: Value,
        merged: Value,
    ) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            owner: owner.map(str::to_string),
            declared,
            options: RwLock::new(merged),
            constructed: AtomicBool::new(false),
            validator: RwLock::new(None),
            store: Arc::downgrade(store),
        }
    }

    /// External name: the current `name` option, else the declared name.
    pub fn name(&self) -> String {
        self.options
            .read()
            .text("name")
            .unwrap_or(&self.internal_name)
            .to_string()
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn declared_options(&self) -> &Value {
        &self.declared
    }

    pub fn options(&self) -> Value {
        self.options.read().clone()
    }

    /// Merge `patch` into the options. A validator built from the old
    /// options is dropped and rebuilt on next use.
    pub fn update_options(&self, patch: &Value) {
        deep_merge(&mut self.options.write(), patch);
        self.invalidate();
    }

    pub fn invalidate(&self) {
        *self.validator.write() = None;
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed.load(Ordering::Acquire)
    }

    pub fn mark_constructed(&self) {
        self.constructed.store(true, Ordering::Release);
    }

    /// Resolves immediately: constructed or not.
    pub fn await_construction(&self) -> Result<(), SchemaError> {
        if self.is_constructed() {
            Ok(())
        } else {
            Err(SchemaError::NotConstructed {
                name: self.path(),
            })
        }
    }

    pub fn store(&self) -> Result<Arc<MetadataStore>, SchemaError> {
        self.store.upgrade().ok_or(SchemaError::StoreDropped)
    }

    pub fn store_handle(&self) -> Weak<MetadataStore> {
        self.store.clone()
    }

    /// `Owner.name`, or the name alone for models.
    pub fn path(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.internal_name),
            None => self.internal_name.clone(),
        }
    }

    /// The cached validator, building it with `build` on first use.
    pub fn cached_validator<F>(&self, build: F) -> Result<Arc<Validator>, SchemaError>
    where
        F: FnOnce() -> Result<Validator, SchemaError>,
    {
        if let Some(validator) = self.validator.read().as_ref() {
            return Ok(validator.clone());
        }
        let built = Arc::new(build()?);
        let mut slot = self.validator.write();
        Ok(slot.get_or_insert(built).clone())
    }
}

/// Behaviour shared by every schema kind.
pub trait Schema: Send + Sync {
    fn core(&self) -> &SchemaCore;

    fn kind(&self) -> DeclarationKind;

    /// Build the structural validator; called once per options version.
    fn build_validator(&self) -> Result<Validator, SchemaError>;

    fn name(&self) -> String {
        self.core().name()
    }

    fn internal_name(&self) -> &str {
        self.core().internal_name()
    }

    fn owner(&self) -> Option<&str> {
        self.core().owner()
    }

    fn options(&self) -> Value {
        self.core().options()
    }

    fn update_options(&self, patch: &Value) {
        self.core().update_options(patch)
    }

    fn is_constructed(&self) -> bool {
        self.core().is_constructed()
    }

    fn await_construction(&self) -> Result<(), SchemaError> {
        self.core().await_construction()
    }

    /// The validator, built lazily and cached.
    fn schema_type(&self) -> Result<Arc<Validator>, SchemaError> {
        self.core().cached_validator(|| self.build_validator())
    }

    fn validate(&self, value: &Value, access: Access) -> Result<ValidationResult, SchemaError> {
        self.schema_type()?.validate(value, access)
    }
}

/// A registered schema of any kind.
#[derive(Clone)]
pub enum AnySchema {
    Model(Arc<ModelSchema>),
    Attribute(Arc<AttributeSchema>),
    Argument(Arc<ArgumentSchema>),
    Action(Arc<ActionSchema>),
}

impl AnySchema {
    pub fn kind(&self) -> DeclarationKind {
        self.as_schema().kind()
    }

    pub fn as_schema(&self) -> &dyn Schema {
        match self {
            AnySchema::Model(s) => &**s,
            AnySchema::Attribute(s) => &**s,
            AnySchema::Argument(s) => &**s,
            AnySchema::Action(s) => &**s,
        }
    }
}

impl std::fmt::Debug for AnySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.as_schema().core().path())
    }
}

/// Identifiers of every model referenced in `ty`, in first-seen order.
pub fn model_refs(ty: &MetadataType) -> Vec<String> {
    fn walk(ty: &MetadataType, out: &mut Vec<String>) {
        if let MetadataType::ModelRef { identifier } = ty {
            if !out.contains(identifier) {
                out.push(identifier.clone());
            }
        }
        for child in ty.children() {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(ty, &mut out);
    out
}
