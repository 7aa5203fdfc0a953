//! Program symbol table
//!
//! A [`Program`] owns one or more parsed declaration sources sharing a
//! single interner, and indexes their classes, interfaces and type aliases
//! by name so the classifier can resolve references across files.

use crate::config::EngineConfig;
use crate::error::EmitError;
use crate::parser::ast::*;
use crate::parser::{Interner, Parser, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};

/// A parsed source file.
#[derive(Debug)]
pub struct SourceFile {
    /// Display name (usually the path)
    pub name: String,
    /// Original source text
    pub source: String,
    /// Parsed module
    pub module: Module,
}

/// Position of a declaration: file index and statement index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeclRef {
    file: usize,
    statement: usize,
}

/// Parsed sources plus name-indexed declarations.
#[derive(Debug)]
pub struct Program {
    files: Vec<SourceFile>,
    interner: Interner,
    classes: FxHashMap<String, DeclRef>,
    interfaces: FxHashMap<String, Vec<DeclRef>>,
    aliases: FxHashMap<String, DeclRef>,
    /// Import local name -> imported name
    imports: FxHashMap<String, String>,
    models: FxHashSet<String>,
}

impl Program {
    /// Parse a single source.
    pub fn parse(name: &str, source: &str, config: &EngineConfig) -> Result<Self, EmitError> {
        Self::parse_all([(name.to_string(), source.to_string())], config)
    }

    /// Parse several sources into one program. Later declarations of the
    /// same class or alias name shadow earlier ones.
    pub fn parse_all<I>(sources: I, config: &EngineConfig) -> Result<Self, EmitError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut interner = Interner::with_capacity(256);
        let mut files = Vec::new();

        for (name, source) in sources {
            let parser = Parser::with_interner(&source, interner)?;
            let (module, next) = parser.parse()?;
            interner = next;
            tracing::debug!(file = %name, statements = module.len(), "parsed declaration source");
            files.push(SourceFile {
                name,
                source,
                module,
            });
        }

        let mut program = Self {
            files,
            interner,
            classes: FxHashMap::default(),
            interfaces: FxHashMap::default(),
            aliases: FxHashMap::default(),
            imports: FxHashMap::default(),
            models: FxHashSet::default(),
        };
        program.index();
        program.mark_models(config);
        Ok(program)
    }

    fn index(&mut self) {
        for (file_index, file) in self.files.iter().enumerate() {
            for (statement, stmt) in file.module.statements.iter().enumerate() {
                let decl = DeclRef {
                    file: file_index,
                    statement,
                };
                match stmt {
                    Statement::Class(class) => {
                        let name = self.interner.resolve(class.name.name).to_string();
                        if self.classes.insert(name.clone(), decl).is_some() {
                            tracing::warn!(class = %name, "class declared more than once; last declaration wins");
                        }
                    }
                    Statement::Interface(iface) => {
                        let name = self.interner.resolve(iface.name.name).to_string();
                        self.interfaces.entry(name).or_default().push(decl);
                    }
                    Statement::TypeAlias(alias) => {
                        let name = self.interner.resolve(alias.name.name).to_string();
                        self.aliases.insert(name, decl);
                    }
                    Statement::Import(import) => {
                        for specifier in &import.specifiers {
                            let local = self.interner.resolve(specifier.local().name);
                            let imported = self.interner.resolve(specifier.imported().name);
                            if local != imported {
                                self.imports.insert(local.to_string(), imported.to_string());
                            }
                        }
                    }
                    Statement::Other(_) => {}
                }
            }
        }
    }

    /// A class is a model if it carries the model decorator, extends a
    /// model, or is listed in `known_models`.
    fn mark_models(&mut self, config: &EngineConfig) {
        self.models.extend(config.known_models.iter().cloned());

        let mut parents: FxHashMap<String, Option<String>> = FxHashMap::default();
        let mut decorated = Vec::new();
        for (name, decl) in &self.classes {
            let Some(class) = self.class_at(*decl) else {
                continue;
            };
            if class
                .decorators
                .iter()
                .filter_map(Decorator::name)
                .any(|id| self.interner.resolve(id.name) == config.model_decorator)
            {
                decorated.push(name.clone());
            }
            parents.insert(name.clone(), self.base_class_name(class));
        }
        self.models.extend(decorated);

        // Propagate through extends chains until nothing changes
        let mut changed = true;
        while changed {
            changed = false;
            for (name, parent) in &parents {
                if self.models.contains(name) {
                    continue;
                }
                if parent.as_ref().is_some_and(|p| self.models.contains(p)) {
                    self.models.insert(name.clone());
                    changed = true;
                }
            }
        }
    }

    fn class_at(&self, decl: DeclRef) -> Option<&ClassDecl> {
        match self.files.get(decl.file)?.module.statements.get(decl.statement)? {
            Statement::Class(class) => Some(class),
            _ => None,
        }
    }

    fn interface_at(&self, decl: DeclRef) -> Option<&InterfaceDecl> {
        match self.files.get(decl.file)?.module.statements.get(decl.statement)? {
            Statement::Interface(iface) => Some(iface),
            _ => None,
        }
    }

    fn alias_at(&self, decl: DeclRef) -> Option<&TypeAliasDecl> {
        match self.files.get(decl.file)?.module.statements.get(decl.statement)? {
            Statement::TypeAlias(alias) => Some(alias),
            _ => None,
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Name a local identifier refers to, following import renames.
    pub fn canonical_name<'a>(&'a self, local: &'a str) -> &'a str {
        self.imports.get(local).map(String::as_str).unwrap_or(local)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        let decl = self.classes.get(self.canonical_name(name))?;
        self.class_at(*decl)
    }

    /// All declarations of an interface (declaration merging).
    pub fn interfaces(&self, name: &str) -> Vec<&InterfaceDecl> {
        self.interfaces
            .get(self.canonical_name(name))
            .map(|decls| decls.iter().filter_map(|d| self.interface_at(*d)).collect())
            .unwrap_or_default()
    }

    pub fn alias(&self, name: &str) -> Option<&TypeAliasDecl> {
        let decl = self.aliases.get(self.canonical_name(name))?;
        self.alias_at(*decl)
    }

    pub fn is_model(&self, name: &str) -> bool {
        self.models.contains(self.canonical_name(name))
    }

    /// Name of the class a class extends, if any.
    pub fn base_class_name(&self, class: &ClassDecl) -> Option<String> {
        match &class.extends.as_ref()?.ty {
            Type::Reference(reference) => reference
                .base()
                .map(|id| self.canonical_name(self.resolve(id.name)).to_string()),
            _ => None,
        }
    }

    /// Classes in source order, paired with their file.
    pub fn classes_in_order(&self) -> impl Iterator<Item = (&SourceFile, &ClassDecl)> {
        self.files.iter().flat_map(|file| {
            file.module.statements.iter().filter_map(move |stmt| match stmt {
                Statement::Class(class) => Some((file, class)),
                _ => None,
            })
        })
    }
}
