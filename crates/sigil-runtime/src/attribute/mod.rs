//! Live attributes and their change logs
//!
//! An [`Attribute`] wraps one attribute value of one model instance. Every
//! write is diffed against the previous value and recorded as positional
//! [`Change`] entries, which can be shipped to a peer, replayed with
//! [`Attribute::apply_changes`] or reverted with [`Attribute::undo_changes`].

mod array;
mod change;
mod diff;

pub use change::{apply_all, Change, ChangeKind};
pub use diff::diff;

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{ChangeError, SchemaError};
use crate::model::{Model, ModelInner};
use crate::schema::{AttributeSchema, Hooks, Schema};
use crate::validator::{Access, IssueKind, ValidationIssue, ValidationResult};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeState {
    Uninitialized,
    Active,
}

/// One attribute of one live model instance.
pub struct Attribute {
    id: usize,
    name: String,
    owner: Weak<ModelInner>,
    schema: Arc<AttributeSchema>,
    value: Value,
    state: AttributeState,
    changes: Vec<Change>,
    /// Set while a refresh re-applies the current value
    refreshing: bool,
    /// Last message from the author validator hook
    violation: Option<String>,
    diff_limit: usize,
}

impl Attribute {
    pub fn new(schema: Arc<AttributeSchema>, owner: Weak<ModelInner>, diff_limit: usize) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: schema.internal_name().to_string(),
            owner,
            schema,
            value: Value::Null,
            state: AttributeState::Uninitialized,
            changes: Vec::new(),
            refreshing: false,
            violation: None,
            diff_limit,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<AttributeSchema> {
        &self.schema
    }

    pub fn state(&self) -> AttributeState {
        self.state
    }

    /// Owning model instance, while it is alive
    pub fn owner(&self) -> Option<Model> {
        self.owner.upgrade().map(Model::from_inner)
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn violation(&self) -> Option<&str> {
        self.violation.as_deref()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Assign the starting value and log it as `init`.
    pub fn initialize(&mut self, value: Value) {
        let hooks = self.schema.hooks();
        self.check_hook(&hooks, &value);
        let value = match &hooks.setter {
            Some(setter) => setter(value),
            None => value,
        };
        self.value = value.clone();
        self.state = AttributeState::Active;
        let entry = Change::init(value);
        tracing::trace!(attribute = %self.name, id = self.id, "init");
        self.changes.push(entry);
    }

    /// Assign `value`, returning the entries it logged.
    ///
    /// A violation reported by the validator hook does not block the write;
    /// it surfaces through [`Attribute::validate`].
    pub fn set(&mut self, value: Value) -> Vec<Change> {
        if self.refreshing {
            self.value = value;
            return Vec::new();
        }
        if self.state == AttributeState::Uninitialized {
            self.initialize(value);
            return self.changes.clone();
        }

        let hooks = self.schema.hooks();
        self.check_hook(&hooks, &value);
        let value = match &hooks.setter {
            Some(setter) => setter(value),
            None => value,
        };

        let entries = diff(&self.value, &value, self.diff_limit);
        self.value = value;
        self.record(&hooks, &entries);
        entries
    }

    /// Re-apply the current value without logging or hooks, so observers
    /// see a write.
    pub fn refresh(&mut self) {
        self.refreshing = true;
        let current = self.value.clone();
        self.set(current);
        self.refreshing = false;
    }

    fn check_hook(&mut self, hooks: &Hooks, value: &Value) {
        if let Some(validator) = &hooks.validator {
            self.violation = validator(value).err();
        }
    }

    /// Dispatch hooks for `entries` and append them to the log.
    fn record(&mut self, hooks: &Hooks, entries: &[Change]) {
        for entry in entries {
            let listeners = match entry.kind {
                ChangeKind::Change => &hooks.on_change,
                ChangeKind::Add => &hooks.on_add,
                ChangeKind::Remove => &hooks.on_remove,
                ChangeKind::Init => continue,
            };
            for listener in listeners {
                listener(entry);
            }
            tracing::trace!(
                attribute = %self.name,
                id = self.id,
                kind = ?entry.kind,
                path = %entry.path_string(),
                "change"
            );
        }
        self.changes.extend_from_slice(entries);
    }

    // ========================================================================
    // Change log
    // ========================================================================

    pub fn get_changes(&self) -> &[Change] {
        &self.changes
    }

    /// Clear the log, `init` included. The value is untouched.
    pub fn remove_changes(&mut self) {
        self.changes.clear();
    }

    /// Revert every logged entry, newest first. Only `init` entries remain.
    pub fn undo_changes(&mut self) -> Result<(), ChangeError> {
        let mut value = self.value.clone();
        for entry in self.changes.iter().rev() {
            if let Some(inverse) = entry.inverse() {
                inverse.apply(&mut value)?;
            }
        }
        self.value = value;
        self.changes.retain(|entry| entry.kind == ChangeKind::Init);
        Ok(())
    }

    /// Apply a log received from a peer onto the current value. `init`
    /// entries are skipped; nothing is logged and no hooks run. On error the
    /// value is left unchanged.
    pub fn apply_changes(&mut self, changes: &[Change]) -> Result<(), ChangeError> {
        let mut value = self.value.clone();
        for entry in changes.iter().filter(|c| c.kind != ChangeKind::Init) {
            entry.apply(&mut value)?;
        }
        self.value = value;
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Structural validation of the current value plus any hook violation.
    pub fn validate(&self, access: Access) -> Result<ValidationResult, SchemaError> {
        let mut result = self.schema.validate(&self.value, access)?;
        if let Some(message) = &self.violation {
            result.merge(ValidationResult::from_issues(vec![ValidationIssue {
                kind: IssueKind::Unknown,
                path: vec![self.name.clone()],
                value: self.value.clone(),
                message: message.clone(),
            }]));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("value", &self.value)
            .field("changes", &self.changes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MetadataStore;
    use serde_json::json;
    use sigil_engine::{AttrMetadata, MetadataType, PrimitiveName};
    use std::sync::Mutex;

    fn attribute(ty: MetadataType) -> (Arc<MetadataStore>, Attribute) {
        let store = MetadataStore::new();
        let metadata = AttrMetadata {
            name: "value".into(),
            is_required: true,
            is_read_only: false,
            is_internal: false,
            is_lazy: false,
            ty,
        };
        let schema = Arc::new(AttributeSchema::new(&store, "Item", metadata, json!({}), json!({})));
        let attribute = Attribute::new(schema, Weak::new(), 10_000);
        (store, attribute)
    }

    #[test]
    fn test_initialize_logs_init() {
        let (_store, mut attr) = attribute(MetadataType::primitive(PrimitiveName::String));
        assert_eq!(attr.state(), AttributeState::Uninitialized);
        attr.initialize(json!("a"));
        assert_eq!(attr.state(), AttributeState::Active);
        assert_eq!(attr.get_changes(), &[Change::init(json!("a"))]);
        assert!(attr.owner().is_none());
    }

    #[test]
    fn test_set_logs_diff_and_runs_hooks() {
        let (_store, mut attr) = attribute(MetadataType::primitive(PrimitiveName::String));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        attr.schema().on_change(move |c| sink.lock().unwrap().push(c.value.clone()));
        attr.schema().set_setter(|v| match v {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        });

        attr.initialize(json!("a"));
        let logged = attr.set(json!("  b "));
        assert_eq!(logged, vec![Change::change(Vec::new(), json!("b"), json!("a"))]);
        assert_eq!(attr.get(), &json!("b"));
        assert_eq!(*seen.lock().unwrap(), vec![json!("b")]);

        // Same value: nothing logged
        assert!(attr.set(json!("b")).is_empty());
        assert_eq!(attr.get_changes().len(), 2);
    }

    #[test]
    fn test_validator_hook_does_not_block() {
        let (_store, mut attr) = attribute(MetadataType::primitive(PrimitiveName::Number));
        attr.schema()
            .set_validator(|v| if v.as_f64() < Some(0.0) { Err("negative".into()) } else { Ok(()) });
        attr.initialize(json!(1));
        attr.set(json!(-5));
        assert_eq!(attr.get(), &json!(-5));
        assert_eq!(attr.violation(), Some("negative"));

        let result = attr.validate(Access::Internal).unwrap();
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, IssueKind::Unknown);

        attr.set(json!(3));
        assert!(attr.validate(Access::Internal).unwrap().success);
    }

    #[test]
    fn test_refresh_bypasses_log_and_hooks() {
        let (_store, mut attr) = attribute(MetadataType::primitive(PrimitiveName::Number));
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        attr.schema().set_setter(move |v| {
            *counter.lock().unwrap() += 1;
            v
        });
        attr.initialize(json!(1));
        attr.refresh();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(attr.get_changes().len(), 1);
        assert_eq!(attr.get(), &json!(1));
    }

    #[test]
    fn test_undo_and_remove_changes() {
        let (_store, mut attr) = attribute(MetadataType::array(MetadataType::Mixed));
        attr.initialize(json!([1, 2]));
        attr.set(json!([1, 2, 3]));
        attr.set(json!([{"a": 1}]));
        attr.undo_changes().unwrap();
        assert_eq!(attr.get(), &json!([1, 2]));
        assert_eq!(attr.get_changes(), &[Change::init(json!([1, 2]))]);

        attr.set(json!([5]));
        attr.remove_changes();
        assert!(attr.get_changes().is_empty());
        assert_eq!(attr.get(), &json!([5]));
    }

    #[test]
    fn test_apply_changes_does_not_log() {
        let (_store, mut attr) = attribute(MetadataType::array(MetadataType::Mixed));
        attr.initialize(json!([1]));
        let remote = vec![
            Change::init(json!(["ignored"])),
            Change::add(vec!["1".into()], json!(2)),
            Change::change(vec!["0".into()], json!(0), json!(1)),
        ];
        attr.apply_changes(&remote).unwrap();
        assert_eq!(attr.get(), &json!([0, 2]));
        assert_eq!(attr.get_changes().len(), 1);

        let bad = vec![Change::remove(vec!["9".into()], json!(0))];
        assert!(attr.apply_changes(&bad).is_err());
        assert_eq!(attr.get(), &json!([0, 2]));
    }
}
