//! Metadata Store
//!
//! Registry of schema objects and live instance objects:
//! - Schemas are keyed by (kind, owner, name). A redeclaration appends to
//!   the list at its key, so the newest entry wins while earlier ones stay
//!   reachable for option folding.
//! - Owners form a class hierarchy (`register_class`); lookups walk from
//!   the requested owner to its root ancestor.
//! - Instances are keyed by (kind, owner, name) where the owner is either a
//!   class name or a live object held by `Weak`. Entries of dead objects are
//!   pruned on every write and by [`MetadataStore::prune`].
//!
//! A store is an explicit object owned by an application context. All
//! registration is expected to finish before the first model instance is
//! constructed; this is not enforced.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use sigil_engine::DeclarationKind;
use std::any::Any;
use std::sync::{Arc, Weak};

use crate::config::RuntimeConfig;
use crate::error::SchemaError;
use crate::options::{deep_merge, empty};
use crate::persistence;
use crate::schema::{
    model_refs, ActionSchema, AnySchema, ArgumentSchema, AttributeSchema, ModelSchema, Schema,
};

/// Identity of an instance-scoped entry's owner.
type ObjectId = usize;

/// Owner of an instance entry.
#[derive(Clone)]
pub enum InstanceOwner {
    /// Class-level data
    Class(String),
    /// A live object; entries go away with it
    Object {
        id: ObjectId,
        handle: Weak<dyn Any + Send + Sync>,
    },
}

impl InstanceOwner {
    /// Owner tracking `object` without keeping it alive.
    pub fn object<T: Any + Send + Sync>(object: &Arc<T>) -> Self {
        let id = Arc::as_ptr(object) as *const () as ObjectId;
        let erased: Arc<dyn Any + Send + Sync> = object.clone();
        InstanceOwner::Object {
            id,
            handle: Arc::downgrade(&erased),
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            InstanceOwner::Class(_) => true,
            InstanceOwner::Object { handle, .. } => handle.strong_count() > 0,
        }
    }

    fn key(&self) -> OwnerKey {
        match self {
            InstanceOwner::Class(name) => OwnerKey::Class(name.clone()),
            InstanceOwner::Object { id, .. } => OwnerKey::Object(*id),
        }
    }
}

impl std::fmt::Debug for InstanceOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceOwner::Class(name) => write!(f, "Class({})", name),
            InstanceOwner::Object { id, .. } => write!(f, "Object({:#x})", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OwnerKey {
    Class(String),
    Object(ObjectId),
}

type SchemaKey = (String, String);
type InstanceKey = (DeclarationKind, OwnerKey, String);

#[derive(Default)]
struct StoreInner {
    /// kind -> (owner, name) -> declarations, oldest first
    schemas: FxHashMap<DeclarationKind, FxHashMap<SchemaKey, Vec<AnySchema>>>,
    /// Every registered schema in registration order
    order: Vec<AnySchema>,
    /// class -> parent class
    classes: FxHashMap<String, Option<String>>,
    instances: FxHashMap<InstanceKey, Arc<dyn Any + Send + Sync>>,
    /// Live owners of object-scoped instances
    owners: FxHashMap<ObjectId, Weak<dyn Any + Send + Sync>>,
}

/// Schema and instance registry
pub struct MetadataStore {
    config: RuntimeConfig,
    inner: RwLock<StoreInner>,
}

impl MetadataStore {
    /// Create an empty store with default runtime settings
    pub fn new() -> Arc<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create an empty store
    pub fn with_config(config: RuntimeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            inner: RwLock::new(StoreInner::default()),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ========================================================================
    // Class hierarchy
    // ========================================================================

    /// Record that `name` extends `parent`
    pub fn register_class(&self, name: &str, parent: Option<&str>) {
        self.inner
            .write()
            .classes
            .insert(name.to_string(), parent.map(str::to_string));
    }

    /// Direct parent of a registered class
    pub fn parent_of(&self, class: &str) -> Option<String> {
        self.inner.read().classes.get(class).cloned().flatten()
    }

    /// `class` followed by its ancestors, nearest first
    pub fn ancestors(&self, class: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut chain = vec![class.to_string()];
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut current = class;
        while let Some(Some(parent)) = inner.classes.get(current) {
            if !seen.insert(parent.as_str()) || parent == class {
                break;
            }
            chain.push(parent.clone());
            current = parent.as_str();
        }
        chain
    }

    /// `class` and every registered class that extends it, directly or not
    pub fn descendants(&self, class: &str) -> Vec<String> {
        let names: Vec<String> = self.inner.read().classes.keys().cloned().collect();
        let mut found = vec![class.to_string()];
        found.extend(
            names
                .into_iter()
                .filter(|name| name != class && self.ancestors(name).iter().any(|a| a == class)),
        );
        found
    }

    /// Owner keys to search for `owner`, nearest first. Argument owners
    /// (`Class.action`) walk the hierarchy of their class.
    fn owner_chain(&self, owner: &str) -> Vec<String> {
        match owner.split_once('.') {
            Some((class, member)) => self
                .ancestors(class)
                .into_iter()
                .map(|c| format!("{}.{}", c, member))
                .collect(),
            None => self.ancestors(owner),
        }
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// Register a schema under (kind, owner, internal name)
    pub fn set_schema(&self, schema: AnySchema) {
        let kind = schema.kind();
        let key = schema_key(&schema);
        tracing::debug!(kind = %kind, owner = %key.0, name = %key.1, "registered schema");

        let mut inner = self.inner.write();
        inner
            .schemas
            .entry(kind)
            .or_default()
            .entry(key)
            .or_default()
            .push(schema.clone());
        inner.order.push(schema);
    }

    /// Newest schema for `name` on the nearest class in `owner`'s chain
    /// that declares it
    pub fn get_schema(&self, kind: DeclarationKind, owner: &str, name: &str) -> Option<AnySchema> {
        let chain = self.owner_chain(owner);
        let inner = self.inner.read();
        let by_key = inner.schemas.get(&kind)?;
        chain
            .into_iter()
            .find_map(|owner| by_key.get(&(owner, name.to_string()))?.last().cloned())
    }

    /// Every declaration registered at exactly (kind, owner, name), oldest first
    pub fn schema_history(&self, kind: DeclarationKind, owner: &str, name: &str) -> Vec<AnySchema> {
        self.inner
            .read()
            .schemas
            .get(&kind)
            .and_then(|by_key| by_key.get(&(owner.to_string(), name.to_string())))
            .cloned()
            .unwrap_or_default()
    }

    /// Fold declared options along `owner`'s chain, root ancestor first and
    /// oldest declaration first, then `options` on top
    pub fn construct_schema_params(
        &self,
        kind: DeclarationKind,
        owner: &str,
        name: &str,
        options: &Value,
    ) -> Value {
        let mut merged = empty();
        for owner in self.owner_chain(owner).iter().rev() {
            for schema in self.schema_history(kind, owner, name) {
                deep_merge(&mut merged, schema.as_schema().core().declared_options());
            }
        }
        deep_merge(&mut merged, options);
        merged
    }

    /// Names declared directly on `owner` for `kind`, in registration order
    pub fn member_names(&self, kind: DeclarationKind, owner: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut names: Vec<String> = Vec::new();
        for schema in inner.order.iter().filter(|s| s.kind() == kind) {
            let (schema_owner, name) = schema_key(schema);
            if schema_owner == owner && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// All registered schemas in registration order
    pub fn schemas(&self) -> Vec<AnySchema> {
        self.inner.read().order.clone()
    }

    pub fn get_model_schema(&self, class: &str) -> Option<Arc<ModelSchema>> {
        match self.get_schema(DeclarationKind::Model, class, class)? {
            AnySchema::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn get_attribute_schema(&self, class: &str, name: &str) -> Option<Arc<AttributeSchema>> {
        match self.get_schema(DeclarationKind::Attribute, class, name)? {
            AnySchema::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    pub fn get_action_schema(&self, class: &str, name: &str) -> Option<Arc<ActionSchema>> {
        match self.get_schema(DeclarationKind::Action, class, name)? {
            AnySchema::Action(action) => Some(action),
            _ => None,
        }
    }

    /// `owner` is `Class.action`
    pub fn get_argument_schema(&self, owner: &str, name: &str) -> Option<Arc<ArgumentSchema>> {
        match self.get_schema(DeclarationKind::Argument, owner, name)? {
            AnySchema::Argument(argument) => Some(argument),
            _ => None,
        }
    }

    /// Registered model schemas, newest per class, in registration order
    pub fn models(&self) -> Vec<Arc<ModelSchema>> {
        let mut seen = FxHashSet::default();
        self.schemas()
            .into_iter()
            .rev()
            .filter_map(|schema| match schema {
                AnySchema::Model(model) if seen.insert(model.class_name().to_string()) => Some(model),
                _ => None,
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    // ========================================================================
    // Construction (phase two)
    // ========================================================================

    /// Resolve every registered shell: check model references, derive
    /// persistence declarations and mark the schemas constructed.
    /// Returns the number of schemas constructed.
    pub fn construct(&self) -> Result<usize, SchemaError> {
        let schemas = self.schemas();

        for schema in &schemas {
            let AnySchema::Attribute(attribute) = schema else {
                continue;
            };
            for identifier in model_refs(attribute.ty()) {
                if self.get_model_schema(&identifier).is_none() {
                    return Err(SchemaError::UnknownModel { name: identifier });
                }
            }
        }

        for schema in &schemas {
            let AnySchema::Attribute(attribute) = schema else {
                continue;
            };
            let owner = attribute.owner_class();
            if self.get_model_schema(owner).is_some() {
                let declaration = persistence::derive(self, attribute)?;
                attribute.set_persistence(declaration);
            }
        }

        for schema in &schemas {
            schema.as_schema().core().mark_constructed();
        }

        tracing::info!(schemas = schemas.len(), models = self.models().len(), "constructed schemas");
        Ok(schemas.len())
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Attach `value` to (kind, owner, name)
    pub fn set_instance(
        &self,
        kind: DeclarationKind,
        owner: &InstanceOwner,
        name: &str,
        value: Arc<dyn Any + Send + Sync>,
    ) {
        let mut inner = self.inner.write();
        Self::prune_locked(&mut inner);
        if let InstanceOwner::Object { id, handle } = owner {
            if handle.strong_count() == 0 {
                return;
            }
            inner.owners.insert(*id, handle.clone());
        }
        inner.instances.insert((kind, owner.key(), name.to_string()), value);
    }

    /// Value attached to (kind, owner, name), if the owner is alive and the
    /// value has type `T`
    pub fn get_instance<T: Any + Send + Sync>(
        &self,
        kind: DeclarationKind,
        owner: &InstanceOwner,
        name: &str,
    ) -> Option<Arc<T>> {
        let inner = self.inner.read();
        if let InstanceOwner::Object { id, handle } = owner {
            let live = inner.owners.get(id)?;
            if live.strong_count() == 0 || !Weak::ptr_eq(live, handle) {
                return None;
            }
        }
        let value = inner
            .instances
            .get(&(kind, owner.key(), name.to_string()))?
            .clone();
        value.downcast::<T>().ok()
    }

    /// Drop every entry of `owner`
    pub fn remove_instances(&self, owner: &InstanceOwner) -> usize {
        let key = owner.key();
        let mut inner = self.inner.write();
        if let OwnerKey::Object(id) = &key {
            inner.owners.remove(id);
        }
        let before = inner.instances.len();
        inner.instances.retain(|(_, k, _), _| *k != key);
        before - inner.instances.len()
    }

    /// Drop entries of collected owners; returns the number removed
    pub fn prune(&self) -> usize {
        Self::prune_locked(&mut self.inner.write())
    }

    fn prune_locked(inner: &mut StoreInner) -> usize {
        let dead: FxHashSet<ObjectId> = inner
            .owners
            .iter()
            .filter(|(_, handle)| handle.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        if dead.is_empty() {
            return 0;
        }
        inner.owners.retain(|id, _| !dead.contains(id));
        let before = inner.instances.len();
        inner
            .instances
            .retain(|(_, owner, _), _| !matches!(owner, OwnerKey::Object(id) if dead.contains(id)));
        before - inner.instances.len()
    }

    /// Number of live instance entries
    pub fn instance_count(&self) -> usize {
        let inner = self.inner.read();
        inner
            .instances
            .keys()
            .filter(|(_, owner, _)| match owner {
                OwnerKey::Class(_) => true,
                OwnerKey::Object(id) => inner.owners.get(id).is_some_and(|h| h.strong_count() > 0),
            })
            .count()
    }

    /// Forget every schema, class and instance
    pub fn reset(&self) {
        *self.inner.write() = StoreInner::default();
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MetadataStore")
            .field("schemas", &inner.order.len())
            .field("classes", &inner.classes.len())
            .field("instances", &inner.instances.len())
            .finish()
    }
}

/// (owner, internal name) of a schema. Models are keyed by their own class.
fn schema_key(schema: &AnySchema) -> SchemaKey {
    let core = schema.as_schema().core();
    let name = core.internal_name().to_string();
    let owner = core.owner().map(str::to_string).unwrap_or_else(|| name.clone());
    (owner, name)
}
