//! Live model instances and their collaborators

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use sigil_runtime::{
    Access, AppContext, Change, CollaboratorError, IssueKind, Model, Reactivity, Repository, Request, RequestTarget,
    RuntimeError, SaveOptions, Transport,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const SOURCE: &str = r#"
@Model({ collectionName: "tasks" })
class Task {
    @Attr() title: string;
    @Attr({ default: 1, min: 0 }) priority: number;
    @Attr() tags: string[] = [];
    @Attr() private owner?: string;
    @Attr() notes?: string;

    @Action()
    assign(@Arg() user: string) {}

    @Action()
    static purge(@Arg() days: number) {}
}
"#;

fn context() -> AppContext {
    let context = AppContext::default();
    context.load_sources([("task.ts", SOURCE)]).unwrap();
    context
}

fn values(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected an object, got {}", other),
    }
}

#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<Request>>,
    reply: Value,
}

impl Transport for RecordingTransport {
    fn dispatch(&self, request: Request) -> Result<Value, CollaboratorError> {
        self.requests.lock().push(request);
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
struct RecordingRepository {
    saved: Mutex<Vec<Value>>,
}

impl Repository for RecordingRepository {
    fn save(&self, model: &Model, _options: &SaveOptions) -> Result<(), CollaboratorError> {
        self.saved.lock().push(model.to_object());
        Ok(())
    }
}

struct FailingRepository;

impl Repository for FailingRepository {
    fn save(&self, _model: &Model, _options: &SaveOptions) -> Result<(), CollaboratorError> {
        Err("disk full".into())
    }
}

#[derive(Default)]
struct RecordingReactivity {
    wrapped: Mutex<usize>,
    notified: Mutex<Vec<(String, usize)>>,
}

impl Reactivity for RecordingReactivity {
    fn add_reactivity(&self, model: Model) -> Model {
        *self.wrapped.lock() += 1;
        model
    }

    fn notify(&self, _model: &Model, attribute: &str, changes: &[Change]) {
        self.notified.lock().push((attribute.to_string(), changes.len()));
    }
}

// ============================================================================
// Instantiation
// ============================================================================

#[test]
fn test_instantiate_applies_defaults() {
    let context = context();
    let task = context
        .instantiate("Task", values(json!({"title": "write"})))
        .unwrap();

    assert_eq!(task.class_name(), "Task");
    assert_eq!(
        task.to_object(),
        json!({"title": "write", "priority": 1, "tags": [], "owner": null, "notes": null})
    );
    assert!(task.validate(Access::Internal).unwrap().success);

    // Every attribute starts with an init entry
    let changes = task.changes();
    assert_eq!(changes.len(), 5);
    assert_eq!(changes["title"], vec![Change::init(json!("write"))]);
}

#[test]
fn test_instantiate_rejects_unknown_keys() {
    let context = context();
    let result = context.instantiate("Task", values(json!({"title": "a", "color": "red"})));
    match result {
        Err(RuntimeError::UnknownAttribute { model, name }) => {
            assert_eq!(model, "Task");
            assert_eq!(name, "color");
        }
        other => panic!("Expected UnknownAttribute, got {:?}", other),
    }
}

#[test]
fn test_attributes_registered_per_instance() {
    let context = context();
    let store = context.store().clone();
    let first = context.instantiate("Task", Map::new()).unwrap();
    let second = context.instantiate("Task", Map::new()).unwrap();
    assert_eq!(store.instance_count(), 10);

    first.set("title", json!("one")).unwrap();
    assert_eq!(second.get("title").unwrap(), Value::Null);
    assert!(!first.ptr_eq(&second));
    assert!(first.ptr_eq(&first.clone()));

    let attribute = first.attribute("title").unwrap();
    let owner = attribute.lock().owner().unwrap();
    assert!(owner.ptr_eq(&first));

    drop(attribute);
    drop(owner);
    drop(first);
    store.prune();
    assert_eq!(store.instance_count(), 5);
}

// ============================================================================
// Writes and change logs
// ============================================================================

#[test]
fn test_set_and_undo() {
    let context = context();
    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();

    let logged = task.set("tags", json!(["x", "y"])).unwrap();
    assert_eq!(logged.len(), 2);
    task.set("title", json!("b")).unwrap();
    assert_eq!(task.changes()["title"].len(), 2);

    task.undo_changes().unwrap();
    assert_eq!(task.get("title").unwrap(), json!("a"));
    assert_eq!(task.get("tags").unwrap(), json!([]));

    assert!(matches!(
        task.set("missing", json!(1)),
        Err(RuntimeError::UnknownAttribute { .. })
    ));
}

#[test]
fn test_changes_replay_on_a_peer() {
    let context = context();
    let local = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();
    let remote = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();

    local.set("tags", json!(["x"])).unwrap();
    local.attribute("tags").unwrap().lock().push(vec![json!("y")]).unwrap();
    local.set("priority", json!(3)).unwrap();

    let log: BTreeMap<String, Vec<Change>> = local.changes();
    remote.apply_changes(&log).unwrap();
    assert_eq!(remote.to_object(), local.to_object());

    // Replay does not log on the receiving side
    assert_eq!(remote.changes()["tags"].len(), 1);
}

#[test]
fn test_validation_reports_constraints_and_hooks() {
    let context = context();
    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();
    task.set("priority", json!(-1)).unwrap();

    let result = task.validate(Access::Internal).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, IssueKind::RangeUnderflow);

    let schema = task.attribute("title").unwrap().lock().schema().clone();
    schema.set_validator(|value| match value.as_str() {
        Some(s) if s.len() > 3 => Err("too long".to_string()),
        _ => Ok(()),
    });
    task.set("title", json!("longer")).unwrap();
    let result = task.validate(Access::Internal).unwrap();
    assert_eq!(result.of_kind(IssueKind::Unknown).count(), 1);
}

#[test]
fn test_external_validation_omits_internal_attributes() {
    let context = context();
    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();
    task.set("owner", json!("root")).unwrap();
    assert!(task.validate(Access::External).unwrap().success);
    assert!(task.validate(Access::Internal).unwrap().success);
}

// ============================================================================
// Collaborators
// ============================================================================

#[test]
fn test_save_validates_then_clears_changes() {
    let context = context();
    let repository = RecordingRepository::default();

    let invalid = context.instantiate("Task", Map::new()).unwrap();
    assert!(matches!(
        invalid.save(&repository, SaveOptions::default()),
        Err(RuntimeError::Validation(_))
    ));
    assert!(repository.saved.lock().is_empty());

    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();
    task.save(&repository, SaveOptions::default()).unwrap();
    assert_eq!(repository.saved.lock().len(), 1);
    assert!(task.changes().is_empty());

    let kept = SaveOptions {
        validate: false,
        clear_changes: false,
    };
    invalid.save(&repository, kept).unwrap();
    assert!(!invalid.changes().is_empty());

    assert!(matches!(
        task.save(&FailingRepository, SaveOptions::default()),
        Err(RuntimeError::Collaborator(_))
    ));
}

#[test]
fn test_call_dispatches_validated_arguments() {
    let context = context();
    let transport = RecordingTransport {
        reply: json!("ok"),
        ..RecordingTransport::default()
    };
    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();

    assert_eq!(task.call("assign", vec![json!("ada")], &transport).unwrap(), json!("ok"));
    assert!(matches!(
        task.call("assign", vec![json!(1)], &transport),
        Err(RuntimeError::Validation(_))
    ));
    assert!(matches!(
        task.call("archive", vec![], &transport),
        Err(RuntimeError::UnknownAction { .. })
    ));
    task.call("purge", vec![json!(30)], &transport).unwrap();

    let requests = transport.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].collection, "tasks");
    assert_eq!(requests[0].instance, Some(task.id()));
    assert_eq!(requests[0].target, RequestTarget::Action("assign".to_string()));
    assert_eq!(requests[0].payload, json!(["ada"]));
    assert_eq!(requests[1].instance, None);
}

#[test]
fn test_fetch_assigns_remote_value() {
    let context = context();
    let transport = RecordingTransport {
        reply: json!("remote notes"),
        ..RecordingTransport::default()
    };
    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();

    let logged = task.fetch("notes", &transport).unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(task.get("notes").unwrap(), json!("remote notes"));
    assert_eq!(
        transport.requests.lock()[0].target,
        RequestTarget::Attribute("notes".to_string())
    );
}

#[test]
fn test_reactivity_wraps_and_observes() {
    let reactivity = Arc::new(RecordingReactivity::default());
    let context = AppContext::default().with_reactivity(reactivity.clone());
    context.load_sources([("task.ts", SOURCE)]).unwrap();

    let task = context.instantiate("Task", values(json!({"title": "a"}))).unwrap();
    assert_eq!(*reactivity.wrapped.lock(), 1);

    task.set("title", json!("b")).unwrap();
    task.refresh("title").unwrap();
    assert_eq!(
        *reactivity.notified.lock(),
        vec![("title".to_string(), 1), ("title".to_string(), 0)]
    );
}
