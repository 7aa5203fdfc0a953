//! Classifier scenarios through the public API.

use sigil_engine::ast::{ClassMember, FieldDecl};
use sigil_engine::{
    AuthoringError, Classifier, DeclarationKind, EngineConfig, LiteralKind, MetadataType,
    PrimitiveName, Program, Target,
};

fn field<'p>(program: &'p Program, class: &str, name: &str) -> &'p FieldDecl {
    program
        .class(class)
        .unwrap_or_else(|| panic!("Expected class {}", class))
        .members
        .iter()
        .find_map(|m| match m {
            ClassMember::Field(f) if f.name.text(program.interner()).as_deref() == Some(name) => Some(f),
            _ => None,
        })
        .unwrap_or_else(|| panic!("Expected field {}.{}", class, name))
}

fn classify(source: &str, class: &str, name: &str) -> Result<MetadataType, AuthoringError> {
    let config = EngineConfig::default();
    let program = Program::parse("models.ts", source, &config).unwrap();
    let classifier = Classifier::new(&program, &config);
    let path = format!("{}.{}", class, name);
    let target = Target::new(DeclarationKind::Attribute, &path).owned_by(class);
    classifier.classify_field(field(&program, class, name), &target)
}

fn primitive(name: PrimitiveName) -> MetadataType {
    MetadataType::primitive(name)
}

// ============================================================================
// Models
// ============================================================================

#[test]
fn test_mutually_referencing_models() {
    let source = r#"
@Model() class Author { @Attr() books: Book[]; }
@Model() class Book { @Attr() author: Author; }
"#;
    assert_eq!(
        classify(source, "Author", "books").unwrap(),
        MetadataType::array(MetadataType::model_ref("Book"))
    );
    assert_eq!(
        classify(source, "Book", "author").unwrap(),
        MetadataType::model_ref("Author")
    );
}

#[test]
fn test_subclass_of_model_is_model() {
    let source = r#"
@Model() abstract class Entity {}
class Post extends Entity {}
class Holder { value: Post | undefined; }
"#;
    assert_eq!(
        classify(source, "Holder", "value").unwrap(),
        MetadataType::optional(MetadataType::model_ref("Post"))
    );
}

#[test]
fn test_qualified_model_reference_uses_last_segment() {
    let source = r#"
@Model() class User {}
class Holder { value: models.User; }
"#;
    assert_eq!(
        classify(source, "Holder", "value").unwrap(),
        MetadataType::model_ref("User")
    );
}

// ============================================================================
// Shapes
// ============================================================================

#[test]
fn test_nested_interface_member_flags() {
    let source = r#"
interface Address {
    street: string;
    /** @internal */
    geo?: [number, number];
    readonly zip: string | undefined;
}
class Holder { value: { home: Address; tags: ReadonlyArray<string> }; }
"#;
    let MetadataType::Interface { members } = classify(source, "Holder", "value").unwrap() else {
        panic!("Expected interface");
    };
    assert_eq!(
        members["tags"].ty,
        MetadataType::array(primitive(PrimitiveName::String))
    );
    let MetadataType::Interface { members: address } = &members["home"].ty else {
        panic!("Expected nested interface");
    };
    assert!(address["street"].is_required);
    assert!(address["geo"].is_internal);
    assert!(!address["geo"].is_required);
    assert!(address["zip"].is_read_only);
    assert!(!address["zip"].is_required);
}

#[test]
fn test_intersection() {
    let source = r#"
interface Named { name: string }
class Holder { value: Named & { age: number }; }
"#;
    let MetadataType::Intersection { sub_types } = classify(source, "Holder", "value").unwrap() else {
        panic!("Expected intersection");
    };
    assert_eq!(sub_types.len(), 2);
    assert!(sub_types
        .iter()
        .all(|t| matches!(t, MetadataType::Interface { .. })));
}

#[test]
fn test_generic_plain_class() {
    let source = r#"
class Wrapper<T> { inner: T; count = 0; }
class Holder { value: Wrapper<boolean>; }
"#;
    let MetadataType::Interface { members } = classify(source, "Holder", "value").unwrap() else {
        panic!("Expected interface");
    };
    assert_eq!(members["inner"].ty, primitive(PrimitiveName::Boolean));
    assert_eq!(members["count"].ty, primitive(PrimitiveName::Number));
    assert!(!members["count"].is_required);
}

#[test]
fn test_recursive_interface_is_circular() {
    let source = r#"
interface Tree { children: Tree[] }
class Holder { value: Tree; }
"#;
    let err = classify(source, "Holder", "value").unwrap_err();
    assert_eq!(err, AuthoringError::CircularAlias { alias: "Tree".into() });
}

// ============================================================================
// Literals and unions
// ============================================================================

#[test]
fn test_literal_union_from_alias() {
    let source = r#"
type Answer = "Test" | 42;
class Holder { value: Answer; }
"#;
    assert_eq!(
        classify(source, "Holder", "value").unwrap(),
        MetadataType::Union {
            sub_types: vec![
                MetadataType::literal(LiteralKind::String, "Test"),
                MetadataType::literal(LiteralKind::Number, 42),
            ]
        }
    );
}

#[test]
fn test_negative_and_bigint_literals() {
    let source = r#"class Holder { value: -1 | 10n; }"#;
    assert_eq!(
        classify(source, "Holder", "value").unwrap(),
        MetadataType::Union {
            sub_types: vec![
                MetadataType::literal(LiteralKind::Number, -1),
                MetadataType::literal(LiteralKind::BigInt, "10"),
            ]
        }
    );
}

#[test]
fn test_integer_literal_wider_than_i64() {
    let source = r#"class Holder { value: 99999999999999999999; }"#;
    match classify(source, "Holder", "value").unwrap() {
        MetadataType::Literal { name, value } => {
            assert_eq!(name, LiteralKind::Number);
            assert_eq!(value.as_f64(), Some(1e20));
        }
        other => panic!("Expected number literal, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_union_in_array() {
    let source = r#"class Holder { value: (string | null)[]; }"#;
    assert_eq!(
        classify(source, "Holder", "value").unwrap(),
        MetadataType::array(MetadataType::Union {
            sub_types: vec![primitive(PrimitiveName::String), MetadataType::Null]
        })
    );
}

#[test]
fn test_keyof_is_unresolved() {
    let source = r#"class Holder { value: keyof Holder; }"#;
    assert_eq!(classify(source, "Holder", "value").unwrap(), MetadataType::Unresolved);
}

#[test]
fn test_unannotated_field_without_initializer_is_mixed() {
    let source = r#"class Holder { value; }"#;
    assert_eq!(classify(source, "Holder", "value").unwrap(), MetadataType::Mixed);
}
