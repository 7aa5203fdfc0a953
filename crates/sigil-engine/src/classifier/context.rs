//! Classification context and the recursion continuation handed to rules.

use super::symbols::Program;
use super::Classifier;
use crate::config::EngineConfig;
use crate::error::AuthoringError;
use crate::metadata::{DeclarationKind, MetadataType};
use crate::parser::ast::{Expression, TypeAnnotation};
use crate::parser::Symbol;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// The node a rule looks at.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    /// A written type expression
    Type(&'a TypeAnnotation),
    /// Union members left after another rule removed some of them
    Union(Vec<&'a TypeAnnotation>),
    /// An initializer, for declarations without a type annotation
    Initializer(&'a Expression),
}

/// Where the classified node sits in its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The declared type of a class attribute
    ClassAttribute,
    /// The declared type of an action argument
    CallArgument,
    /// The type of a member of an object shape
    InterfaceMember,
    /// Any other child (array element, union member, type argument)
    Nested,
}

/// Type parameter bindings in scope, already classified.
pub type Scope = FxHashMap<String, MetadataType>;

/// Everything a rule needs to decide whether and how it applies.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub node: Node<'a>,
    pub kind: DeclarationKind,
    pub position: Position,
    /// Dotted path of the declaration, for error messages
    pub declaration: Rc<str>,
    /// Enclosing class, which `this` refers to
    pub owner: Option<Rc<str>>,
    pub scope: Rc<Scope>,
    /// Aliases and interfaces currently being expanded
    pub expanding: Rc<Vec<String>>,
    pub depth: usize,
    pub program: &'a Program,
    pub config: &'a EngineConfig,
}

impl<'a> RuleContext<'a> {
    pub fn resolve(&self, sym: Symbol) -> &'a str {
        self.program.resolve(sym)
    }

    /// Binding of a type parameter name, if one is in scope.
    pub fn binding(&self, name: &str) -> Option<&MetadataType> {
        self.scope.get(name)
    }

    /// Derive the context for a child node.
    pub fn child(&self, node: Node<'a>, position: Position) -> Self {
        Self {
            node,
            position,
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// Derive the context for a child node whose path gains a segment.
    pub fn member(&self, node: Node<'a>, name: &str) -> Self {
        let mut ctx = self.child(node, Position::InterfaceMember);
        ctx.declaration = format!("{}.{}", self.declaration, name).into();
        ctx
    }

    /// Derive the context for the body of an alias or interface `name`,
    /// with `scope` replacing the current bindings.
    pub fn expansion(&self, node: Node<'a>, name: &str, scope: Scope) -> Result<Self, AuthoringError> {
        if self.expanding.iter().any(|n| n == name) {
            return Err(AuthoringError::CircularAlias {
                alias: name.to_string(),
            });
        }
        let mut expanding = (*self.expanding).clone();
        expanding.push(name.to_string());

        let mut ctx = self.child(node, self.position);
        ctx.scope = Rc::new(scope);
        ctx.expanding = Rc::new(expanding);
        Ok(ctx)
    }
}

/// Continuation that classifies child nodes on behalf of a rule.
///
/// Rules decide which children to visit; `Recurse` enforces the depth
/// limit and runs the full rule list on each child.
pub struct Recurse<'c, 'a> {
    classifier: &'c Classifier<'a>,
    parent: &'c RuleContext<'a>,
}

impl<'c, 'a> Recurse<'c, 'a> {
    pub(super) fn new(classifier: &'c Classifier<'a>, parent: &'c RuleContext<'a>) -> Self {
        Self { classifier, parent }
    }

    /// A continuation rooted at another context (an alias or shape body).
    pub fn with_parent<'d>(&self, parent: &'d RuleContext<'a>) -> Recurse<'d, 'a>
    where
        'c: 'd,
    {
        Recurse {
            classifier: self.classifier,
            parent,
        }
    }

    /// The context of the node being emitted.
    pub fn parent(&self) -> &RuleContext<'a> {
        self.parent
    }

    /// Classify a child node.
    pub fn classify(&mut self, node: Node<'a>, position: Position) -> Result<MetadataType, AuthoringError> {
        self.run(self.parent.child(node, position))
    }

    /// Classify a child written type.
    pub fn classify_type(&mut self, ty: &'a TypeAnnotation) -> Result<MetadataType, AuthoringError> {
        self.classify(Node::Type(ty), Position::Nested)
    }

    /// Classify in an explicitly derived context.
    pub fn run(&mut self, ctx: RuleContext<'a>) -> Result<MetadataType, AuthoringError> {
        if ctx.depth > ctx.config.max_depth {
            return Err(AuthoringError::DepthExceeded {
                declaration: ctx.declaration.to_string(),
                max_depth: ctx.config.max_depth,
            });
        }
        self.classifier.run(&ctx)
    }
}
