//! Tests for member modifiers (visibility, static, readonly, async)

use sigil_engine::parser::ast::{ClassDecl, ClassMember, Modifiers, Module, Statement, Visibility};
use sigil_engine::parser::{Interner, Parser};
use sigil_engine::{emit_source, DeclarationKind, EngineConfig, Metadata};

fn parse(source: &str) -> (Module, Interner) {
    let parser = Parser::new(source).unwrap();
    parser.parse().unwrap()
}

fn class(module: &Module) -> &ClassDecl {
    match &module.statements[0] {
        Statement::Class(decl) => decl,
        other => panic!("Expected class declaration, got {:?}", other),
    }
}

fn member_modifiers(source: &str) -> Vec<Modifiers> {
    let (module, _) = parse(source);
    class(&module)
        .members
        .iter()
        .map(|member| match member {
            ClassMember::Field(field) => field.modifiers,
            ClassMember::Method(method) => method.modifiers,
            ClassMember::Accessor(accessor) => accessor.modifiers,
            other => panic!("Expected field, method or accessor, got {:?}", other),
        })
        .collect()
}

// ============================================================================
// Field Visibility Tests
// ============================================================================

#[test]
fn test_parse_field_visibility() {
    let modifiers = member_modifiers(
        "class Foo { private a: number; protected b: string; public c: number; d: number; }",
    );
    let visibility: Vec<Visibility> = modifiers.iter().map(|m| m.visibility).collect();
    assert_eq!(
        visibility,
        vec![
            Visibility::Private,
            Visibility::Protected,
            Visibility::Public,
            Visibility::Public
        ]
    );
    assert!(modifiers[0].is_hidden());
    assert!(modifiers[1].is_hidden());
    assert!(!modifiers[3].is_hidden());
}

#[test]
fn test_parse_hash_private_field() {
    let (module, interner) = parse("class Foo { #secret: string; }");
    match &class(&module).members[0] {
        ClassMember::Field(field) => {
            assert_eq!(field.modifiers.visibility, Visibility::Private);
            assert_eq!(field.name.text(&interner).as_deref(), Some("#secret"));
        }
        other => panic!("Expected field member, got {:?}", other),
    }
}

// ============================================================================
// Method Visibility Tests
// ============================================================================

#[test]
fn test_parse_method_visibility() {
    let modifiers = member_modifiers(
        "class Foo { private calculate(): number { return 42; } protected process(): void {} greet() {} }",
    );
    assert_eq!(modifiers[0].visibility, Visibility::Private);
    assert_eq!(modifiers[1].visibility, Visibility::Protected);
    assert_eq!(modifiers[2].visibility, Visibility::Public);
}

// ============================================================================
// Combined Modifiers Tests
// ============================================================================

#[test]
fn test_parse_combined_modifiers() {
    let modifiers = member_modifiers(
        r#"
class Service {
    private static readonly instance: Service;
    protected static async create(): Promise<Service> { return new Service(); }
    declare public label: string;
}
"#,
    );
    assert_eq!(modifiers[0].visibility, Visibility::Private);
    assert!(modifiers[0].is_static && modifiers[0].is_readonly);
    assert!(modifiers[1].is_static && modifiers[1].is_async);
    assert!(modifiers[2].is_declare);
    assert_eq!(modifiers[2].visibility, Visibility::Public);
}

// ============================================================================
// Emitted Visibility
// ============================================================================

#[test]
fn test_hidden_members_emit_internal() {
    let source = r#"
@Model()
class Account {
    @Attr() name: string;
    @Attr() private token: string;
    @Attr() protected balance: number;
    /** @internal */
    @Attr() notes: string;

    @Action()
    private audit() {}
}
"#;
    let (_, units) = emit_source("account.ts", source, &EngineConfig::default()).unwrap();
    let internal: Vec<(String, bool)> = units
        .iter()
        .filter_map(|unit| match (&unit.kind, &unit.metadata) {
            (DeclarationKind::Attribute, Metadata::Attribute(attr)) => Some((attr.name.clone(), attr.is_internal)),
            (DeclarationKind::Action, Metadata::Action(action)) => Some((action.name.clone(), action.is_internal)),
            _ => None,
        })
        .collect();
    assert_eq!(
        internal,
        vec![
            ("name".to_string(), false),
            ("token".to_string(), true),
            ("balance".to_string(), true),
            ("notes".to_string(), true),
            ("audit".to_string(), true),
        ]
    );
}
