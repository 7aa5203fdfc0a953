//! Schema construction, validation and persistence over loaded sources

use serde_json::{json, Map, Value};
use sigil_engine::EngineConfig;
use sigil_runtime::{
    Access, AppContext, Cardinality, ColumnType, GenerationStrategy, IssueKind, PersistenceDeclaration, RuntimeError,
    Schema, SchemaError, SigilConfig,
};

fn context(source: &str) -> AppContext {
    let context = AppContext::default();
    context.load_sources([("models.ts", source)]).unwrap();
    context
}

fn paths(result: &sigil_runtime::ValidationResult, kind: IssueKind) -> Vec<Vec<String>> {
    result.of_kind(kind).map(|issue| issue.path.clone()).collect()
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_literal_union_attribute() {
    let context = context(
        r#"
@Model()
class Tagged {
    @Attr() label: "Test" | 42;
}
"#,
    );
    let model = context.store().get_model_schema("Tagged").unwrap();

    assert!(model.validate(&json!({"label": "Test"}), Access::Internal).unwrap().success);
    assert!(model.validate(&json!({"label": 42}), Access::Internal).unwrap().success);

    let result = model.validate(&json!({"label": "Other"}), Access::Internal).unwrap();
    assert_eq!(paths(&result, IssueKind::Type), vec![vec!["label".to_string()]]);
}

#[test]
fn test_required_and_optional_attributes() {
    let context = context(
        r#"
@Model()
class Member {
    @Attr() name: string;
    @Attr() nickname?: string;
    @Attr() title: string | undefined;
}
"#,
    );
    let model = context.store().get_model_schema("Member").unwrap();

    let result = model.validate(&json!({}), Access::Internal).unwrap();
    assert!(!result.success);
    assert_eq!(paths(&result, IssueKind::Required), vec![vec!["name".to_string()]]);

    let result = model
        .validate(&json!({"name": "Ada", "nickname": null}), Access::Internal)
        .unwrap();
    assert!(result.success);

    let result = model.validate(&json!({"name": "Ada", "extra": 1}), Access::Internal).unwrap();
    assert_eq!(paths(&result, IssueKind::Inexistent), vec![vec!["extra".to_string()]]);
}

#[test]
fn test_inherited_options_merge() {
    let context = context(
        r#"
@Model()
class Parent {
    @Attr({ min: 0, index: true }) age: number;
}

@Model()
class Child extends Parent {
    @Attr({ max: 10 }) age: number;
}
"#,
    );
    let store = context.store();
    let child = store.get_attribute_schema("Child", "age").unwrap();
    assert_eq!(child.options(), json!({"min": 0, "index": true, "max": 10}));
    assert_eq!(child.core().declared_options(), &json!({"max": 10}));

    let model = store.get_model_schema("Child").unwrap();
    assert_eq!(model.attribute_names().unwrap(), vec!["age"]);

    let low = model.validate(&json!({"age": -1}), Access::Internal).unwrap();
    assert_eq!(paths(&low, IssueKind::RangeUnderflow), vec![vec!["age".to_string()]]);
    let high = model.validate(&json!({"age": 11}), Access::Internal).unwrap();
    assert_eq!(paths(&high, IssueKind::RangeOverflow), vec![vec!["age".to_string()]]);

    // The parent keeps its own constraints
    let parent = store.get_model_schema("Parent").unwrap();
    assert!(parent.validate(&json!({"age": 11}), Access::Internal).unwrap().success);

    let column = child.persistence().unwrap();
    assert!(column.column().is_some_and(|c| c.index));
}

#[test]
fn test_update_options_invalidates_validator() {
    let context = context(
        r#"
@Model()
class Counter {
    @Attr() count: number;
}
"#,
    );
    let store = context.store();
    let model = store.get_model_schema("Counter").unwrap();
    let attribute = store.get_attribute_schema("Counter", "count").unwrap();

    assert!(model.validate(&json!({"count": 100}), Access::Internal).unwrap().success);
    attribute.update_options(&json!({"max": 10}));

    let result = model.validate(&json!({"count": 100}), Access::Internal).unwrap();
    assert_eq!(result.errors[0].kind, IssueKind::RangeOverflow);
}

#[test]
fn test_update_options_reaches_inheriting_models() {
    let context = context(
        r#"
@Model()
class Parent {
    @Attr() age: number;
}

@Model()
class Child extends Parent {
    @Attr() nickname?: string;
}
"#,
    );
    let store = context.store();
    let parent = store.get_model_schema("Parent").unwrap();
    let child = store.get_model_schema("Child").unwrap();
    let value = json!({"age": 500});

    assert!(parent.validate(&value, Access::Internal).unwrap().success);
    assert!(child.validate(&value, Access::Internal).unwrap().success);

    let age = store.get_attribute_schema("Parent", "age").unwrap();
    age.update_options(&json!({"max": 10}));

    let parent_result = parent.validate(&value, Access::Internal).unwrap();
    let child_result = child.validate(&value, Access::Internal).unwrap();
    assert_eq!(paths(&parent_result, IssueKind::RangeOverflow), vec![vec!["age".to_string()]]);
    assert_eq!(paths(&child_result, IssueKind::RangeOverflow), vec![vec!["age".to_string()]]);
}

#[test]
fn test_internal_attribute_is_forbidden_externally() {
    let context = context(
        r#"
@Model()
class Account {
    @Attr() name: string;
    @Attr() private secret: string;
}
"#,
    );
    let model = context.store().get_model_schema("Account").unwrap();
    let value = json!({"name": "a", "secret": "s"});

    assert!(model.validate(&value, Access::Internal).unwrap().success);
    let result = model.validate(&value, Access::External).unwrap();
    assert_eq!(paths(&result, IssueKind::Forbidden), vec![vec!["secret".to_string()]]);

    // Absent internal attributes are not required externally
    assert!(model.validate(&json!({"name": "a"}), Access::External).unwrap().success);
}

#[test]
fn test_self_referencing_model() {
    let context = context(
        r#"
@Model()
class Category {
    @Attr() name: string;
    @Attr() parent?: Category;
    @Attr() children: Category[];
}
"#,
    );
    let store = context.store();
    let model = store.get_model_schema("Category").unwrap();

    let tree = json!({"name": "a", "children": [{"name": "b", "children": []}]});
    assert!(model.validate(&tree, Access::Internal).unwrap().success);

    let broken = json!({"name": "a", "children": [{"children": []}]});
    let result = model.validate(&broken, Access::Internal).unwrap();
    assert_eq!(
        paths(&result, IssueKind::Required),
        vec![vec!["children".to_string(), "0".to_string(), "name".to_string()]]
    );

    let children = store.get_attribute_schema("Category", "children").unwrap().persistence().unwrap();
    let relation = children.relation().unwrap();
    assert_eq!(relation.cardinality, Cardinality::ManyToOne);
    assert_eq!(relation.inverse.as_deref(), Some("parent"));

    let parent = store.get_attribute_schema("Category", "parent").unwrap().persistence().unwrap();
    let relation = parent.relation().unwrap();
    assert_eq!(relation.cardinality, Cardinality::OneToMany);
    assert_eq!(relation.inverse.as_deref(), Some("children"));
    assert!(relation.owner);
    assert!(relation.nullable);
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_action_arguments() {
    let context = context(
        r#"
@Model()
class Document {
    @Attr() title: string;

    @Action()
    rename(@Arg() name: string, @Arg() reason?: string) {}
}
"#,
    );
    let action = context.store().get_action_schema("Document", "rename").unwrap();
    assert_eq!(action.arguments().len(), 2);

    let missing = action.validate_args(&[], Access::External).unwrap();
    assert_eq!(paths(&missing, IssueKind::Required), vec![vec!["name".to_string()]]);

    assert!(action.validate_args(&[json!("a")], Access::External).unwrap().success);
    assert!(action.validate_args(&[json!("a"), json!("b")], Access::External).unwrap().success);

    let wrong = action.validate_args(&[json!(1)], Access::External).unwrap();
    assert_eq!(paths(&wrong, IssueKind::Type), vec![vec!["name".to_string()]]);

    let extra = action
        .validate_args(&[json!("a"), json!("b"), json!("c")], Access::External)
        .unwrap();
    assert_eq!(paths(&extra, IssueKind::Inexistent), vec![vec!["2".to_string()]]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_column_declarations() {
    let context = context(
        r#"
@Model()
class Ticket {
    @Attr({ primary: true, isGenerated: true }) id: number;
    @Attr({ isGenerated: "uuid" }) reference: string;
    @Attr({ isCreationDate: true }) createdAt: Date;
    @Attr({ isVersion: true }) revision: number;
    @Attr({ unique: true, integer: true }) count: number;
    @Attr() status: "open" | "closed";
    @Attr() readonly code: string;
    @Attr() note?: string;
    @Attr() address: { street: string };
    @Attr() labels: string[];
}
"#,
    );
    let model = context.store().get_model_schema("Ticket").unwrap();
    let declarations: Map<String, Value> = model
        .persistence()
        .unwrap()
        .into_iter()
        .map(|(name, declaration)| (name, serde_json::to_value(declaration).unwrap()))
        .collect();
    let get = |name: &str| model.attribute_schema(name).unwrap().persistence().unwrap();

    assert_eq!(declarations.len(), 10);
    assert_eq!(
        get("id"),
        PersistenceDeclaration::Primary {
            generated: Some(GenerationStrategy::Increment)
        }
    );
    assert_eq!(
        get("reference"),
        PersistenceDeclaration::Generated {
            strategy: GenerationStrategy::Uuid
        }
    );
    assert_eq!(get("createdAt"), PersistenceDeclaration::CreateDate);
    assert_eq!(get("revision"), PersistenceDeclaration::Version);

    let count = get("count");
    let count = count.column().unwrap();
    assert_eq!(count.column_type, ColumnType::Integer);
    assert!(count.unique);
    assert!(!count.nullable);

    assert_eq!(
        get("status").column().unwrap().column_type,
        ColumnType::Enum(vec![json!("open"), json!("closed")])
    );
    assert!(!get("code").column().unwrap().update);
    let note = get("note");
    assert!(note.column().unwrap().nullable);
    assert_eq!(note.column().unwrap().column_type, ColumnType::Text);
    assert_eq!(get("address").column().unwrap().column_type, ColumnType::SimpleJson);
    assert_eq!(get("labels").column().unwrap().column_type, ColumnType::SimpleArray);

    assert_eq!(declarations["createdAt"], json!({"kind": "createDate"}));
    assert_eq!(declarations["count"]["columnType"], json!({"type": "integer"}));
}

const LIBRARY: &str = r#"
@Model()
class Author {
    @Attr() posts: Post[];
    @Attr() tags: Tag[];
    @Attr({ relationColumn: "profile_id", isRelationOwner: true }) profile: Profile;
    @Attr() drafts: Draft[];
}

@Model()
class Post {
    @Attr() author: Author;
}

@Model()
class Tag {
    @Attr() authors: Author[];
}

@Model()
class Profile {
    @Attr() bio: string;
}

@Model()
class Draft {
    @Attr() text: string;
}
"#;

#[test]
fn test_relation_cardinality() {
    let context = context(LIBRARY);
    let store = context.store();
    let relation = |class: &str, name: &str| {
        store
            .get_attribute_schema(class, name)
            .unwrap()
            .persistence()
            .unwrap()
            .relation()
            .cloned()
            .unwrap_or_else(|| panic!("Expected a relation on {}.{}", class, name))
    };

    let posts = relation("Author", "posts");
    assert_eq!(posts.cardinality, Cardinality::ManyToOne);
    assert_eq!(posts.inverse.as_deref(), Some("author"));
    assert!(!posts.owner);

    let author = relation("Post", "author");
    assert_eq!(author.cardinality, Cardinality::OneToMany);
    assert_eq!(author.inverse.as_deref(), Some("posts"));
    assert!(author.owner);

    let tags = relation("Author", "tags");
    let authors = relation("Tag", "authors");
    assert_eq!(tags.cardinality, Cardinality::ManyToMany);
    assert_eq!(authors.cardinality, Cardinality::ManyToMany);
    assert!(tags.owner != authors.owner);

    let profile = relation("Author", "profile");
    assert_eq!(profile.cardinality, Cardinality::OneToOne);
    assert_eq!(profile.join_column.as_deref(), Some("profile_id"));
    assert!(profile.owner);
    assert_eq!(profile.inverse, None);
}

#[test]
fn test_array_reference_without_inverse_is_json() {
    let context = context(LIBRARY);
    let drafts = context
        .store()
        .get_attribute_schema("Author", "drafts")
        .unwrap()
        .persistence()
        .unwrap();
    assert_eq!(drafts.column().unwrap().column_type, ColumnType::Json);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_unknown_model_reference_fails_construction() {
    let config = SigilConfig {
        engine: EngineConfig::default().with_known_models(["Customer"]),
        ..SigilConfig::default()
    };
    let context = AppContext::new(config);
    let result = context.load_sources([(
        "order.ts",
        r#"
@Model()
class Order {
    @Attr() buyer: Customer;
}
"#,
    )]);
    match result {
        Err(RuntimeError::Schema(SchemaError::UnknownModel { name })) => assert_eq!(name, "Customer"),
        other => panic!("Expected UnknownModel, got {:?}", other),
    }
}

#[test]
fn test_schemas_wait_for_construction() {
    let context = AppContext::default();
    context
        .loader()
        .load_source("note.ts", "@Model() class Note { @Attr() text: string; }")
        .unwrap();

    let model = context.store().get_model_schema("Note").unwrap();
    assert!(matches!(model.await_construction(), Err(SchemaError::NotConstructed { .. })));
    assert!(matches!(
        context.instantiate("Note", Map::new()),
        Err(RuntimeError::Schema(SchemaError::NotConstructed { .. }))
    ));

    context.loader().finish().unwrap();
    assert!(model.await_construction().is_ok());
    assert!(context.instantiate("Note", Map::new()).is_ok());
}

#[test]
fn test_abstract_models_are_not_instantiated() {
    let context = context(
        r#"
@Model()
abstract class Entity {
    @Attr() id: number;
}

@Model()
class User extends Entity {
    @Attr() name: string;
}
"#,
    );
    assert!(matches!(
        context.instantiate("Entity", Map::new()),
        Err(RuntimeError::AbstractModel(name)) if name == "Entity"
    ));

    let user = context.instantiate("User", Map::new()).unwrap();
    assert_eq!(user.attribute_names(), vec!["id", "name"]);
    assert!(matches!(
        context.instantiate("Missing", Map::new()),
        Err(RuntimeError::UnknownModel(_))
    ));
}
