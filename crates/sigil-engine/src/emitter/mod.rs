//! Metadata emitter
//!
//! Walks the decorated declarations of a [`Program`] in source order,
//! classifies their types and produces one metadata record per declaration.
//! Each record is then embedded as a trailing single-quoted JSON string
//! argument of the declaration's own decorator call, so the running program
//! can read its schema back from the annotation alone.
//!
//! ```text
//! @Attr() name?: string;
//! // becomes
//! @Attr('{"name":"name","isRequired":false,...}') name?: string;
//! ```

pub mod inflect;

use crate::classifier::shape::{field_metadata, has_internal_tag, is_lazy_annotation, is_optional_type};
use crate::classifier::{Classifier, Program, SourceFile, Target};
use crate::config::EngineConfig;
use crate::error::{AuthoringError, EmitError};
use crate::metadata::{ActionMetadata, AttrMetadata, DeclarationKind, Metadata, MetadataType, ModelMetadata};
use crate::parser::ast::*;
use crate::parser::Span;

// ============================================================================
// Output
// ============================================================================

/// A text replacement in a source file. Insertions have `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn insert(at: usize, text: String) -> Self {
        Self {
            start: at,
            end: at,
            text,
        }
    }

    pub fn replace(start: usize, end: usize, text: String) -> Self {
        Self { start, end, text }
    }
}

/// One emitted declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedUnit {
    pub kind: DeclarationKind,
    /// File the declaration lives in
    pub file: String,
    /// Owning class (`User`), or class and action for arguments (`User.rename`)
    pub owner: Option<String>,
    pub name: String,
    pub metadata: Metadata,
    /// Compact JSON of `metadata`
    pub payload: String,
    pub decorator_span: Span,
    /// Edit embedding the payload into the decorator call
    pub edit: Edit,
}

impl EmittedUnit {
    /// `Owner.name`, or just the name for models.
    pub fn path(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.clone(),
        }
    }
}

// ============================================================================
// Declarations and dispatch
// ============================================================================

/// A decorated declaration found in the program.
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Model {
        class: &'a ClassDecl,
    },
    Attribute {
        owner: &'a str,
        field: &'a FieldDecl,
        source: &'a str,
    },
    Action {
        owner: &'a str,
        method: &'a MethodDecl,
    },
    Argument {
        owner: &'a str,
        method: &'a MethodDecl,
        param: &'a Parameter,
        source: &'a str,
    },
}

impl Declaration<'_> {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Model { .. } => DeclarationKind::Model,
            Declaration::Attribute { .. } => DeclarationKind::Attribute,
            Declaration::Action { .. } => DeclarationKind::Action,
            Declaration::Argument { .. } => DeclarationKind::Argument,
        }
    }
}

type EmitFn = for<'e> fn(&Emitter<'e>, &Declaration<'e>) -> Result<Metadata, AuthoringError>;

/// Emit function per declaration kind.
const DISPATCH: [(DeclarationKind, EmitFn); 4] = [
    (DeclarationKind::Model, emit_model),
    (DeclarationKind::Attribute, emit_attribute),
    (DeclarationKind::Argument, emit_argument),
    (DeclarationKind::Action, emit_action),
];

fn mismatch(declaration: &Declaration<'_>) -> AuthoringError {
    AuthoringError::InvalidDeclaration {
        declaration: declaration.kind().to_string(),
        reason: "declaration does not match its emit function".to_string(),
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Produces metadata records and decorator edits for a program.
pub struct Emitter<'a> {
    classifier: Classifier<'a>,
}

impl<'a> Emitter<'a> {
    pub fn new(program: &'a Program, config: &'a EngineConfig) -> Self {
        Self {
            classifier: Classifier::new(program, config),
        }
    }

    /// Use a pre-built classifier (for custom rule lists).
    pub fn with_classifier(classifier: Classifier<'a>) -> Self {
        Self { classifier }
    }

    fn program(&self) -> &'a Program {
        self.classifier.program()
    }

    fn config(&self) -> &'a EngineConfig {
        self.classifier.config()
    }

    /// Metadata for a single declaration, through the dispatch table.
    pub fn emit(&self, declaration: &Declaration<'a>) -> Result<Metadata, AuthoringError> {
        let kind = declaration.kind();
        let (_, emit) = DISPATCH
            .iter()
            .find(|(k, _)| *k == kind)
            .ok_or_else(|| mismatch(declaration))?;
        emit(self, declaration)
    }

    /// Emit every decorated declaration, in source order.
    pub fn emit_program(&self) -> Result<Vec<EmittedUnit>, EmitError> {
        let program = self.program();
        let config = self.config();
        let mut units = Vec::new();

        for (file, class) in program.classes_in_order() {
            let owner = program.resolve(class.name.name);

            if let Some(decorator) = find_decorator(&class.decorators, &config.model_decorator, program) {
                let declaration = Declaration::Model { class };
                units.push(self.unit(file, None, owner, decorator, &declaration)?);
            }

            for member in &class.members {
                match member {
                    ClassMember::Field(field) => {
                        let Some(decorator) =
                            find_decorator(&field.decorators, &config.attribute_decorator, program)
                        else {
                            continue;
                        };
                        let name = member_name(&field.name, owner, program)?;
                        let declaration = Declaration::Attribute {
                            owner,
                            field,
                            source: &file.source,
                        };
                        units.push(self.unit(file, Some(owner.to_string()), &name, decorator, &declaration)?);
                    }
                    ClassMember::Method(method) => {
                        let name = member_name(&method.name, owner, program)?;
                        if let Some(decorator) =
                            find_decorator(&method.decorators, &config.action_decorator, program)
                        {
                            let declaration = Declaration::Action { owner, method };
                            units.push(self.unit(file, Some(owner.to_string()), &name, decorator, &declaration)?);
                        }
                        self.emit_arguments(file, owner, &name, method, &mut units)?;
                    }
                    ClassMember::Accessor(accessor) => {
                        if find_decorator(&accessor.decorators, &config.attribute_decorator, program).is_some() {
                            return Err(AuthoringError::InvalidDeclaration {
                                declaration: format!("{}.{}", owner, member_name(&accessor.name, owner, program)?),
                                reason: "attributes must be fields, not accessors".to_string(),
                            }
                            .into());
                        }
                    }
                    ClassMember::Constructor(_) | ClassMember::Other(_) => {}
                }
            }
        }

        Ok(units)
    }

    fn emit_arguments(
        &self,
        file: &'a SourceFile,
        owner: &'a str,
        action: &str,
        method: &'a MethodDecl,
        units: &mut Vec<EmittedUnit>,
    ) -> Result<(), EmitError> {
        let program = self.program();
        let config = self.config();
        let action_path = format!("{}.{}", owner, action);

        for param in &method.params {
            let Some(decorator) = find_decorator(&param.decorators, &config.argument_decorator, program) else {
                continue;
            };
            let Some(id) = param.name.identifier() else {
                return Err(AuthoringError::InvalidDeclaration {
                    declaration: action_path,
                    reason: "destructured parameters cannot be arguments".to_string(),
                }
                .into());
            };
            let name = program.resolve(id.name);
            let declaration = Declaration::Argument {
                owner,
                method,
                param,
                source: &file.source,
            };
            units.push(self.unit(file, Some(action_path.clone()), name, decorator, &declaration)?);
        }
        Ok(())
    }

    fn unit(
        &self,
        file: &SourceFile,
        owner: Option<String>,
        name: &str,
        decorator: &Decorator,
        declaration: &Declaration<'a>,
    ) -> Result<EmittedUnit, EmitError> {
        let metadata = self.emit(declaration)?;
        let payload = metadata.to_json()?;
        let edit = payload_edit(decorator, &file.source, self.program(), &payload);
        tracing::debug!(
            kind = %declaration.kind(),
            file = %file.name,
            owner = owner.as_deref().unwrap_or(""),
            name,
            "emitted metadata"
        );
        Ok(EmittedUnit {
            kind: declaration.kind(),
            file: file.name.clone(),
            owner,
            name: name.to_string(),
            metadata,
            payload,
            decorator_span: decorator.span,
            edit,
        })
    }

    /// Rewritten text of every file in the program.
    pub fn rewrite(&self, units: &[EmittedUnit]) -> Vec<(String, String)> {
        self.program()
            .files()
            .iter()
            .map(|file| {
                let edits: Vec<&Edit> = units
                    .iter()
                    .filter(|unit| unit.file == file.name)
                    .map(|unit| &unit.edit)
                    .collect();
                (file.name.clone(), apply_edits(&file.source, edits))
            })
            .collect()
    }

    fn target<'t>(&self, kind: DeclarationKind, path: &'t str, owner: &'t str) -> Target<'t> {
        Target::new(kind, path).owned_by(owner)
    }
}

/// Parse, emit and rewrite a single source.
pub fn emit_source(
    name: &str,
    source: &str,
    config: &EngineConfig,
) -> Result<(String, Vec<EmittedUnit>), EmitError> {
    let program = Program::parse(name, source, config)?;
    let emitter = Emitter::new(&program, config);
    let units = emitter.emit_program()?;
    let edits = units.iter().map(|unit| &unit.edit).collect();
    Ok((apply_edits(source, edits), units))
}

/// Apply non-overlapping edits; later offsets first so earlier ones stay valid.
pub fn apply_edits(source: &str, mut edits: Vec<&Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut out = source.to_string();
    for edit in edits {
        if edit.start <= edit.end && edit.end <= out.len() {
            out.replace_range(edit.start..edit.end, &edit.text);
        }
    }
    out
}

// ============================================================================
// Emit functions
// ============================================================================

fn emit_model<'e>(emitter: &Emitter<'e>, declaration: &Declaration<'e>) -> Result<Metadata, AuthoringError> {
    let Declaration::Model { class } = declaration else {
        return Err(mismatch(declaration));
    };
    let class_name = emitter.program().resolve(class.name.name);
    Ok(Metadata::Model(ModelMetadata {
        class_name: class_name.to_string(),
        collection_name: inflect::collection_name(class_name),
        is_abstract: class.is_abstract,
    }))
}

fn emit_attribute<'e>(emitter: &Emitter<'e>, declaration: &Declaration<'e>) -> Result<Metadata, AuthoringError> {
    let Declaration::Attribute { owner, field, source } = *declaration else {
        return Err(mismatch(declaration));
    };
    let program = emitter.program();
    let name = member_name(&field.name, owner, program)?;
    let path = format!("{}.{}", owner, name);
    if field.modifiers.is_static {
        return Err(AuthoringError::InvalidDeclaration {
            declaration: path,
            reason: "static fields cannot be attributes".to_string(),
        });
    }

    let target = emitter.target(DeclarationKind::Attribute, &path, owner);
    let ty = emitter.classifier.classify_field(field, &target)?;
    let type_text = field
        .type_annotation
        .as_ref()
        .map(|ty| ty.span)
        .or_else(|| field.initializer.as_ref().map(|init| *init.span()));
    check_resolved(&ty, &target, type_text, source)?;

    Ok(Metadata::Attribute(field_metadata(name, field, ty, program, emitter.config())))
}

fn emit_argument<'e>(emitter: &Emitter<'e>, declaration: &Declaration<'e>) -> Result<Metadata, AuthoringError> {
    let Declaration::Argument {
        owner,
        method,
        param,
        source,
    } = *declaration
    else {
        return Err(mismatch(declaration));
    };
    let program = emitter.program();
    let action = member_name(&method.name, owner, program)?;
    let Some(id) = param.name.identifier() else {
        return Err(AuthoringError::InvalidDeclaration {
            declaration: format!("{}.{}", owner, action),
            reason: "destructured parameters cannot be arguments".to_string(),
        });
    };
    let name = program.resolve(id.name).to_string();
    let path = format!("{}.{}.{}", owner, action, name);
    let target = emitter.target(DeclarationKind::Argument, &path, owner);

    let ty = match (&param.type_annotation, &param.default) {
        (Some(annotation), _) => emitter.classifier.classify_type(annotation, &target)?,
        (None, Some(default)) => emitter.classifier.classify_initializer(default, &target)?,
        (None, None) => MetadataType::Mixed,
    };
    let type_text = param
        .type_annotation
        .as_ref()
        .map(|ty| ty.span)
        .or_else(|| param.default.as_ref().map(|init| *init.span()));
    check_resolved(&ty, &target, type_text, source)?;

    Ok(Metadata::Attribute(AttrMetadata {
        is_required: !param.optional && param.default.is_none() && !param.is_rest && !is_optional_type(&ty),
        is_read_only: param.modifiers.is_readonly,
        is_internal: param.modifiers.is_hidden(),
        is_lazy: param
            .type_annotation
            .as_ref()
            .is_some_and(|ty| is_lazy_annotation(ty, program, emitter.config())),
        name,
        ty,
    }))
}

fn emit_action<'e>(emitter: &Emitter<'e>, declaration: &Declaration<'e>) -> Result<Metadata, AuthoringError> {
    let Declaration::Action { owner, method } = *declaration else {
        return Err(mismatch(declaration));
    };
    let program = emitter.program();
    let name = member_name(&method.name, owner, program)?;
    let returns_promise = method.return_type.as_ref().is_some_and(|ty| match &ty.unparenthesized().ty {
        Type::Reference(reference) => reference
            .base()
            .is_some_and(|id| program.resolve(id.name) == "Promise"),
        _ => false,
    });

    Ok(Metadata::Action(ActionMetadata {
        name,
        is_internal: method.modifiers.is_hidden() || has_internal_tag(method.doc.as_ref()),
        is_static: method.modifiers.is_static,
        is_async: method.modifiers.is_async || returns_promise,
    }))
}

/// `Unresolved` anywhere in an emitted type is an authoring error.
fn check_resolved(
    ty: &MetadataType,
    target: &Target<'_>,
    type_span: Option<Span>,
    source: &str,
) -> Result<(), AuthoringError> {
    if !ty.contains_unresolved() {
        return Ok(());
    }
    let type_text = type_span
        .and_then(|span| source.get(span.start..span.end))
        .map(str::to_string)
        .unwrap_or_else(|| ty.to_string());
    Err(AuthoringError::UnresolvedType {
        kind: target.kind,
        declaration: target.declaration.to_string(),
        type_text,
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn find_decorator<'d>(decorators: &'d [Decorator], name: &str, program: &Program) -> Option<&'d Decorator> {
    decorators
        .iter()
        .find(|d| d.name().is_some_and(|id| program.resolve(id.name) == name))
}

fn member_name(name: &PropertyName, owner: &str, program: &Program) -> Result<String, AuthoringError> {
    name.text(program.interner())
        .ok_or_else(|| AuthoringError::InvalidDeclaration {
            declaration: format!("{}.[computed]", owner),
            reason: "computed member names cannot carry metadata".to_string(),
        })
}

/// Single-quoted string literal holding `payload`.
fn quote(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 2);
    out.push('\'');
    for c in payload.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Edit that puts `payload` last in the decorator's argument list,
/// replacing a previously embedded payload.
fn payload_edit(decorator: &Decorator, source: &str, program: &Program, payload: &str) -> Edit {
    let literal = quote(payload);
    let Expression::Call(call) = &decorator.expression else {
        return Edit::insert(decorator.expression.span().end, format!("({})", literal));
    };

    if let Some(Expression::StringLiteral(last)) = call.arguments.last() {
        if Metadata::from_json(program.resolve(last.value)).is_ok() {
            return Edit::replace(last.span.start, last.span.end, literal);
        }
    }

    // The call span ends just after its closing paren
    let close = call.span.end.saturating_sub(1);
    let text = match call.arguments.last() {
        None => literal,
        Some(last) => {
            let between = source.get(last.span().end..close).unwrap_or("");
            if between.contains(',') {
                format!(" {}", literal)
            } else {
                format!(", {}", literal)
            }
        }
    };
    Edit::insert(close, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PrimitiveName;

    const SOURCE: &str = r#"
@Model()
export class User {
    @Attr() name: string;
    @Attr({ primary: true }) id!: number;
    @Attr() nickname?: string;
    @Attr() tags = ["a"];
    @Attr() private secret: string | undefined;
    @Attr() friends: Lazy<User[]>;
    untracked: number;

    @Action()
    async rename(@Arg() name: string, @Arg() reason?: string) {}
}
"#;

    fn emit(source: &str) -> Result<(String, Vec<EmittedUnit>), EmitError> {
        emit_source("user.ts", source, &EngineConfig::default())
    }

    fn attr(unit: &EmittedUnit) -> &AttrMetadata {
        match &unit.metadata {
            Metadata::Attribute(attr) => attr,
            other => panic!("Expected attribute metadata, got {:?}", other),
        }
    }

    #[test]
    fn test_units_in_source_order() {
        let (_, units) = emit(SOURCE).unwrap();
        let summary: Vec<(DeclarationKind, String)> = units.iter().map(|u| (u.kind, u.path())).collect();
        assert_eq!(
            summary,
            vec![
                (DeclarationKind::Model, "User".to_string()),
                (DeclarationKind::Attribute, "User.name".to_string()),
                (DeclarationKind::Attribute, "User.id".to_string()),
                (DeclarationKind::Attribute, "User.nickname".to_string()),
                (DeclarationKind::Attribute, "User.tags".to_string()),
                (DeclarationKind::Attribute, "User.secret".to_string()),
                (DeclarationKind::Attribute, "User.friends".to_string()),
                (DeclarationKind::Action, "User.rename".to_string()),
                (DeclarationKind::Argument, "User.rename.name".to_string()),
                (DeclarationKind::Argument, "User.rename.reason".to_string()),
            ]
        );
    }

    #[test]
    fn test_declaration_flags() {
        let (_, units) = emit(SOURCE).unwrap();
        let Metadata::Model(model) = &units[0].metadata else {
            panic!("Expected model metadata");
        };
        assert_eq!(model.collection_name, "users");
        assert!(!model.is_abstract);

        assert!(attr(&units[1]).is_required);
        assert!(!attr(&units[3]).is_required);
        // Initialized fields are not required
        assert!(!attr(&units[4]).is_required);
        assert_eq!(
            attr(&units[4]).ty,
            MetadataType::array(MetadataType::primitive(PrimitiveName::String))
        );

        let secret = attr(&units[5]);
        assert!(secret.is_internal);
        assert!(!secret.is_required);

        let friends = attr(&units[6]);
        assert!(friends.is_lazy);
        assert_eq!(friends.ty, MetadataType::array(MetadataType::model_ref("User")));

        let Metadata::Action(action) = &units[7].metadata else {
            panic!("Expected action metadata");
        };
        assert!(action.is_async);
        assert!(attr(&units[8]).is_required);
        assert!(!attr(&units[9]).is_required);
    }

    #[test]
    fn test_rewrite_appends_payload() {
        let (rewritten, units) = emit("@Model class Post { @Attr({ index: true },) title: string; }").unwrap();
        assert!(rewritten.starts_with(&format!("@Model('{}')", units[0].payload)));
        assert!(rewritten.contains(&format!("@Attr({{ index: true }}, '{}')", units[1].payload)));

        let (rewritten, units) = emit("@Model() class Post { @Attr({ index: true }) title: string; }").unwrap();
        assert!(rewritten.starts_with(&format!("@Model('{}')", units[0].payload)));
        assert!(rewritten.contains(&format!("@Attr({{ index: true }}, '{}')", units[1].payload)));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let (once, _) = emit(SOURCE).unwrap();
        let (twice, _) = emit(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let (rewritten, units) = emit(r#"@Model() class Q { @Attr() mood: "it's"; }"#).unwrap();
        assert!(units[1].payload.contains("it's"));
        assert!(rewritten.contains(r"it\'s"));
        let (again, _) = emit(&rewritten).unwrap();
        assert_eq!(again, rewritten);
    }

    #[test]
    fn test_unresolved_type_is_an_error() {
        let err = emit("@Model() class A { @Attr() other: Missing; }").unwrap_err();
        match err {
            EmitError::Authoring(AuthoringError::UnresolvedType {
                kind,
                declaration,
                type_text,
            }) => {
                assert_eq!(kind, DeclarationKind::Attribute);
                assert_eq!(declaration, "A.other");
                assert_eq!(type_text, "Missing");
            }
            other => panic!("Expected UnresolvedType, got {:?}", other),
        }
    }

    #[test]
    fn test_abstract_model_and_internal_action() {
        let (_, units) = emit(
            r#"
@Model()
export abstract class Entity {
    /** @internal */
    @Action() static touch(): Promise<void> {}
}
"#,
        )
        .unwrap();
        let Metadata::Model(model) = &units[0].metadata else {
            panic!("Expected model metadata");
        };
        assert!(model.is_abstract);
        assert_eq!(model.collection_name, "entities");
        let Metadata::Action(action) = &units[1].metadata else {
            panic!("Expected action metadata");
        };
        assert!(action.is_internal && action.is_static && action.is_async);
    }

    #[test]
    fn test_destructured_argument_is_rejected() {
        let err = emit("@Model() class A { @Action() go(@Arg() { x }: P) {} }").unwrap_err();
        assert!(matches!(
            err,
            EmitError::Authoring(AuthoringError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn test_dispatch_covers_every_kind() {
        for kind in DeclarationKind::ALL {
            assert!(DISPATCH.iter().any(|(k, _)| *k == kind));
        }
    }
}
