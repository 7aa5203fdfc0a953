//! Live model instances
//!
//! A [`Model`] owns one [`Attribute`] per attribute of its class (inherited
//! ones included) and routes reads and writes through them. Attributes are
//! also registered in the [`MetadataStore`] against the instance, and drop
//! out of it when the instance is dropped.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use sigil_engine::DeclarationKind;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::attribute::{Attribute, Change};
use crate::collaborators::{Reactivity, Repository, Request, RequestTarget, SaveOptions, Transport};
use crate::error::RuntimeError;
use crate::schema::{ModelSchema, Schema};
use crate::store::{InstanceOwner, MetadataStore};
use crate::validator::{Access, IssueKind, ValidationIssue, ValidationResult};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state of a model instance.
pub struct ModelInner {
    id: u64,
    schema: Arc<ModelSchema>,
    store: Arc<MetadataStore>,
    attributes: Vec<(String, Arc<Mutex<Attribute>>)>,
    reactivity: Option<Arc<dyn Reactivity>>,
}

/// Handle to a live model instance. Clones share the instance.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Build an instance of `schema` with its attributes initialized from
    /// `values`. Missing values fall back to the `default` option, then
    /// `null`.
    pub(crate) fn create(
        store: &Arc<MetadataStore>,
        schema: Arc<ModelSchema>,
        mut values: Map<String, Value>,
        reactivity: Option<Arc<dyn Reactivity>>,
    ) -> Result<Model, RuntimeError> {
        let attribute_schemas = schema
            .attribute_names()?
            .iter()
            .map(|name| schema.attribute_schema(name))
            .collect::<Result<Vec<_>, _>>()?;
        let diff_limit = store.config().diff_matrix_limit;

        let inner = Arc::new_cyclic(|weak| ModelInner {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            schema,
            store: store.clone(),
            attributes: attribute_schemas
                .into_iter()
                .map(|attribute| {
                    let name = attribute.internal_name().to_string();
                    (name, Arc::new(Mutex::new(Attribute::new(attribute, weak.clone(), diff_limit))))
                })
                .collect(),
            reactivity,
        });

        let owner = InstanceOwner::object(&inner);
        for (name, attribute) in &inner.attributes {
            let mut attribute_guard = attribute.lock();
            let value = values
                .remove(name)
                .or_else(|| attribute_guard.schema().default_value())
                .unwrap_or(Value::Null);
            attribute_guard.initialize(value);
            drop(attribute_guard);
            store.set_instance(DeclarationKind::Attribute, &owner, name, attribute.clone());
        }

        tracing::debug!(
            model = %inner.schema.class_name(),
            id = inner.id,
            attributes = inner.attributes.len(),
            "instantiated model"
        );

        let model = Model { inner };
        Ok(match model.inner.reactivity.clone() {
            Some(reactivity) => reactivity.add_reactivity(model),
            None => model,
        })
    }

    pub(crate) fn from_inner(inner: Arc<ModelInner>) -> Model {
        Model { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn class_name(&self) -> &str {
        self.inner.schema.class_name()
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.inner.schema
    }

    /// Both handles point at the same instance
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.inner.attributes.iter().map(|(name, _)| name.clone()).collect()
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// The live attribute, looked up through the store
    pub fn attribute(&self, name: &str) -> Result<Arc<Mutex<Attribute>>, RuntimeError> {
        let owner = InstanceOwner::object(&self.inner);
        self.inner
            .store
            .get_instance::<Mutex<Attribute>>(DeclarationKind::Attribute, &owner, name)
            .or_else(|| {
                self.inner
                    .attributes
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, attribute)| attribute.clone())
            })
            .ok_or_else(|| RuntimeError::UnknownAttribute {
                model: self.class_name().to_string(),
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        Ok(self.attribute(name)?.lock().get().clone())
    }

    /// Assign through the attribute's hooks; returns the logged entries.
    pub fn set(&self, name: &str, value: Value) -> Result<Vec<Change>, RuntimeError> {
        let attribute = self.attribute(name)?;
        let changes = attribute.lock().set(value);
        if let Some(reactivity) = &self.inner.reactivity {
            reactivity.notify(self, name, &changes);
        }
        Ok(changes)
    }

    /// Re-apply the current value so observers update; logs nothing.
    pub fn refresh(&self, name: &str) -> Result<(), RuntimeError> {
        self.attribute(name)?.lock().refresh();
        if let Some(reactivity) = &self.inner.reactivity {
            reactivity.notify(self, name, &[]);
        }
        Ok(())
    }

    /// Attribute values keyed by declared name.
    pub fn to_object(&self) -> Value {
        self.object(Access::Internal)
    }

    /// External access leaves internal attributes out.
    fn object(&self, access: Access) -> Value {
        let mut map = Map::new();
        for (name, attribute) in &self.inner.attributes {
            let attribute = attribute.lock();
            if access == Access::External && attribute.schema().is_internal() {
                continue;
            }
            map.insert(name.clone(), attribute.get().clone());
        }
        Value::Object(map)
    }

    /// Structural validation of every attribute plus hook violations.
    pub fn validate(&self, access: Access) -> Result<ValidationResult, RuntimeError> {
        let mut result = self.inner.schema.validate(&self.object(access), access)?;
        for (name, attribute) in &self.inner.attributes {
            let attribute = attribute.lock();
            if let Some(message) = attribute.violation() {
                result.merge(ValidationResult::from_issues(vec![ValidationIssue {
                    kind: IssueKind::Unknown,
                    path: vec![name.clone()],
                    value: attribute.get().clone(),
                    message: message.to_string(),
                }]));
            }
        }
        Ok(result)
    }

    // ========================================================================
    // Change logs
    // ========================================================================

    /// Non-empty change logs keyed by attribute name.
    pub fn changes(&self) -> BTreeMap<String, Vec<Change>> {
        self.inner
            .attributes
            .iter()
            .filter_map(|(name, attribute)| {
                let changes = attribute.lock().get_changes().to_vec();
                (!changes.is_empty()).then(|| (name.clone(), changes))
            })
            .collect()
    }

    pub fn remove_changes(&self) {
        for (_, attribute) in &self.inner.attributes {
            attribute.lock().remove_changes();
        }
    }

    pub fn undo_changes(&self) -> Result<(), RuntimeError> {
        for (_, attribute) in &self.inner.attributes {
            attribute.lock().undo_changes()?;
        }
        Ok(())
    }

    /// Apply logs from a peer, keyed by attribute name.
    pub fn apply_changes(&self, changes: &BTreeMap<String, Vec<Change>>) -> Result<(), RuntimeError> {
        for (name, log) in changes {
            self.attribute(name)?.lock().apply_changes(log)?;
        }
        Ok(())
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Hand the instance to `repository`.
    pub fn save(&self, repository: &dyn Repository, options: SaveOptions) -> Result<(), RuntimeError> {
        if options.validate {
            let result = self.validate(Access::Internal)?;
            if !result.success {
                return Err(RuntimeError::Validation(result));
            }
        }
        repository.save(self, &options).map_err(RuntimeError::Collaborator)?;
        if options.clear_changes {
            self.remove_changes();
        }
        Ok(())
    }

    /// Invoke an action remotely after validating its arguments.
    pub fn call(&self, action: &str, args: Vec<Value>, transport: &dyn Transport) -> Result<Value, RuntimeError> {
        let schema = self
            .inner
            .schema
            .action_schema(action)?
            .ok_or_else(|| RuntimeError::UnknownAction {
                model: self.class_name().to_string(),
                name: action.to_string(),
            })?;

        let result = schema.validate_args(&args, Access::External)?;
        if !result.success {
            return Err(RuntimeError::Validation(result));
        }

        let request = Request {
            collection: self.inner.schema.collection_name(),
            instance: (!schema.is_static()).then_some(self.id()),
            target: RequestTarget::Action(schema.name()),
            payload: Value::Array(args),
        };
        transport.dispatch(request).map_err(RuntimeError::Collaborator)
    }

    /// Load a lazy attribute from the remote peer and assign it.
    pub fn fetch(&self, name: &str, transport: &dyn Transport) -> Result<Vec<Change>, RuntimeError> {
        let attribute = self.attribute(name)?;
        let external = attribute.lock().schema().name();
        let request = Request {
            collection: self.inner.schema.collection_name(),
            instance: Some(self.id()),
            target: RequestTarget::Attribute(external),
            payload: Value::Null,
        };
        let value = transport.dispatch(request).map_err(RuntimeError::Collaborator)?;
        self.set(name, value)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("class", &self.class_name())
            .field("id", &self.inner.id)
            .finish()
    }
}
