//! Type classification engine
//!
//! Turns written type expressions (and, for unannotated fields, initializer
//! expressions) into [`MetadataType`] trees. Classification is a recursive
//! descent over an ordered list of [`Rule`]s; the first rule whose `detect`
//! matches a node emits its metadata, calling back into the classifier for
//! child nodes through [`Recurse`].
//!
//! # Example
//!
//! ```ignore
//! use sigil_engine::classifier::{Classifier, Program, Target};
//! use sigil_engine::{DeclarationKind, EngineConfig};
//!
//! let config = EngineConfig::default();
//! let program = Program::parse("user.ts", "type Tag = string | undefined;", &config)?;
//! let alias = program.alias("Tag").unwrap();
//! let classifier = Classifier::new(&program, &config);
//! let ty = classifier.classify_type(
//!     &alias.type_annotation,
//!     &Target::new(DeclarationKind::Attribute, "Tag"),
//! )?;
//! assert_eq!(ty.to_string(), "string?");
//! ```

mod context;
pub mod custom;
mod rules;
pub mod shape;
mod symbols;

pub use context::{Node, Position, Recurse, RuleContext, Scope};
pub use rules::{default_rules, Matched, Rule};
pub use symbols::{Program, SourceFile};

use crate::config::EngineConfig;
use crate::error::AuthoringError;
use crate::metadata::{DeclarationKind, MetadataType};
use crate::parser::ast::{Expression, FieldDecl, TypeAnnotation};
use std::rc::Rc;

/// The declaration a classification is for.
#[derive(Debug, Clone, Copy)]
pub struct Target<'t> {
    pub kind: DeclarationKind,
    /// Dotted path used in error messages (`User.address`)
    pub declaration: &'t str,
    /// Enclosing class, which `this` refers to
    pub owner: Option<&'t str>,
}

impl<'t> Target<'t> {
    pub fn new(kind: DeclarationKind, declaration: &'t str) -> Self {
        Self {
            kind,
            declaration,
            owner: None,
        }
    }

    pub fn owned_by(mut self, owner: &'t str) -> Self {
        self.owner = Some(owner);
        self
    }

    fn position(&self) -> Position {
        match self.kind {
            DeclarationKind::Attribute => Position::ClassAttribute,
            DeclarationKind::Argument => Position::CallArgument,
            DeclarationKind::Model | DeclarationKind::Action => Position::Nested,
        }
    }
}

/// Rule-driven classifier over a [`Program`].
pub struct Classifier<'a> {
    program: &'a Program,
    config: &'a EngineConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl<'a> Classifier<'a> {
    /// Classifier with the default rule list.
    pub fn new(program: &'a Program, config: &'a EngineConfig) -> Self {
        Self::with_rules(program, config, default_rules())
    }

    /// Classifier with a custom rule list, evaluated in order.
    pub fn with_rules(program: &'a Program, config: &'a EngineConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            program,
            config,
            rules,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Classify a written type.
    pub fn classify_type(&self, ty: &'a TypeAnnotation, target: &Target<'_>) -> Result<MetadataType, AuthoringError> {
        self.classify(Node::Type(ty), target)
    }

    /// Infer a type from an initializer.
    pub fn classify_initializer(
        &self,
        expr: &'a Expression,
        target: &Target<'_>,
    ) -> Result<MetadataType, AuthoringError> {
        self.classify(Node::Initializer(expr), target)
    }

    /// Classify a class field: its annotation, else its initializer, else `Mixed`.
    pub fn classify_field(&self, field: &'a FieldDecl, target: &Target<'_>) -> Result<MetadataType, AuthoringError> {
        match (&field.type_annotation, &field.initializer) {
            (Some(ty), _) => self.classify_type(ty, target),
            (None, Some(initializer)) => self.classify_initializer(initializer, target),
            (None, None) => Ok(MetadataType::Mixed),
        }
    }

    /// Classify any node from a fresh root context.
    pub fn classify(&self, node: Node<'a>, target: &Target<'_>) -> Result<MetadataType, AuthoringError> {
        let ctx = RuleContext {
            node,
            kind: target.kind,
            position: target.position(),
            declaration: Rc::from(target.declaration),
            owner: target.owner.map(Rc::from),
            scope: Rc::default(),
            expanding: Rc::default(),
            depth: 0,
            program: self.program,
            config: self.config,
        };
        self.run(&ctx)
    }

    /// First matching rule wins; no match is `Unresolved`.
    pub(crate) fn run(&self, ctx: &RuleContext<'a>) -> Result<MetadataType, AuthoringError> {
        for rule in &self.rules {
            let Some(matched) = rule.detect(ctx) else {
                continue;
            };
            tracing::trace!(
                rule = rule.name(),
                declaration = %ctx.declaration,
                depth = ctx.depth,
                "rule matched"
            );
            let mut recurse = Recurse::new(self, ctx);
            return rule.emit(matched, &mut recurse);
        }
        Ok(MetadataType::Unresolved)
    }
}
