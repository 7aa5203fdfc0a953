//! Loading emitted declarations into the store.
//!
//! The loader reads a source whose annotation calls already carry their
//! metadata payload, plays the part of each annotation executing at class
//! definition time, and registers the resulting schema shells. Nothing is
//! resolved across declarations until [`Loader::finish`].

use serde_json::{Map, Value};
use sigil_engine::ast::{ClassDecl, ClassMember, Decorator, Expression, ObjectProperty, UnaryOperator};
use sigil_engine::classifier::shape::number_value;
use sigil_engine::{emit_source, DeclarationKind, EngineConfig, Metadata, Program};
use std::path::Path;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::options::empty;
use crate::schema::{ActionSchema, AnySchema, ArgumentSchema, AttributeSchema, ModelSchema};
use crate::store::MetadataStore;

/// Registers schema shells from emitted sources.
pub struct Loader {
    store: Arc<MetadataStore>,
    config: EngineConfig,
}

impl Loader {
    pub fn new(store: Arc<MetadataStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    /// Emit metadata into `source`, then load the rewritten text. Returns
    /// the rewritten source. Already emitted payloads are replaced, so
    /// emitted sources load unchanged.
    pub fn load_source(&self, name: &str, source: &str) -> Result<String, RuntimeError> {
        let (rewritten, units) = emit_source(name, source, &self.config)?;
        tracing::debug!(file = name, units = units.len(), "emitted source");
        self.load_emitted(name, &rewritten)?;
        Ok(rewritten)
    }

    pub fn load_file(&self, path: &Path) -> Result<String, RuntimeError> {
        let source = std::fs::read_to_string(path)?;
        self.load_source(&path.display().to_string(), &source)
    }

    /// Register every annotated declaration of an emitted source. Returns
    /// the number of schemas registered.
    pub fn load_emitted(&self, name: &str, source: &str) -> Result<usize, RuntimeError> {
        let program = Program::parse(name, source, &self.config)?;
        let mut registered = 0;
        for (_, class) in program.classes_in_order() {
            registered += self.load_class(&program, class)?;
        }
        Ok(registered)
    }

    /// Second phase: resolve references and mark everything constructed.
    pub fn finish(&self) -> Result<usize, RuntimeError> {
        Ok(self.store.construct()?)
    }

    fn load_class(&self, program: &Program, class: &ClassDecl) -> Result<usize, RuntimeError> {
        let class_name = program.resolve(class.name.name).to_string();
        let parent = program.base_class_name(class);
        self.store.register_class(&class_name, parent.as_deref());
        let mut registered = 0;

        if let Some(decorator) = find(&class.decorators, &self.config.model_decorator, program) {
            let Metadata::Model(metadata) = payload(decorator, program, &class_name)? else {
                return Err(wrong_record(&class_name, DeclarationKind::Model));
            };
            let declared = options(decorator, program, &class_name);
            let merged = self
                .store
                .construct_schema_params(DeclarationKind::Model, &class_name, &class_name, &declared);
            let schema = ModelSchema::new(&self.store, metadata, parent.clone(), declared, merged);
            self.store.set_schema(AnySchema::Model(Arc::new(schema)));
            registered += 1;
        }

        for member in &class.members {
            match member {
                ClassMember::Field(field) => {
                    let Some(decorator) = find(&field.decorators, &self.config.attribute_decorator, program) else {
                        continue;
                    };
                    let member = field.name.text(program.interner()).unwrap_or_default();
                    let path = format!("{}.{}", class_name, member);
                    let Metadata::Attribute(metadata) = payload(decorator, program, &path)? else {
                        return Err(wrong_record(&path, DeclarationKind::Attribute));
                    };

                    let mut declared = options(decorator, program, &path);
                    if let Some(default) = field.initializer.as_ref().and_then(|e| literal(e, program)) {
                        if let Value::Object(map) = &mut declared {
                            map.entry("default").or_insert(default);
                        }
                    }
                    let merged = self.store.construct_schema_params(
                        DeclarationKind::Attribute,
                        &class_name,
                        &metadata.name,
                        &declared,
                    );
                    let name = metadata.name.clone();
                    let schema = AttributeSchema::new(&self.store, &class_name, metadata, declared, merged);
                    self.store.set_schema(AnySchema::Attribute(Arc::new(schema)));
                    if let Some(model) = self.store.get_model_schema(&class_name) {
                        model.add_attribute(&name);
                    }
                    registered += 1;
                }
                ClassMember::Method(method) => {
                    let member = method.name.text(program.interner()).unwrap_or_default();
                    let path = format!("{}.{}", class_name, member);
                    let mut action = None;

                    if let Some(decorator) = find(&method.decorators, &self.config.action_decorator, program) {
                        let Metadata::Action(metadata) = payload(decorator, program, &path)? else {
                            return Err(wrong_record(&path, DeclarationKind::Action));
                        };
                        let declared = options(decorator, program, &path);
                        let merged = self.store.construct_schema_params(
                            DeclarationKind::Action,
                            &class_name,
                            &metadata.name,
                            &declared,
                        );
                        let name = metadata.name.clone();
                        let schema = Arc::new(ActionSchema::new(&self.store, &class_name, metadata, declared, merged));
                        self.store.set_schema(AnySchema::Action(schema.clone()));
                        if let Some(model) = self.store.get_model_schema(&class_name) {
                            model.add_action(&name);
                        }
                        action = Some(schema);
                        registered += 1;
                    }

                    for (index, param) in method.params.iter().enumerate() {
                        let Some(decorator) = find(&param.decorators, &self.config.argument_decorator, program) else {
                            continue;
                        };
                        let param_name = param
                            .name
                            .identifier()
                            .map(|id| program.resolve(id.name).to_string())
                            .unwrap_or_default();
                        let argument_path = format!("{}.{}", path, param_name);
                        let Metadata::Attribute(metadata) = payload(decorator, program, &argument_path)? else {
                            return Err(wrong_record(&argument_path, DeclarationKind::Argument));
                        };
                        let declared = options(decorator, program, &argument_path);
                        let merged = self.store.construct_schema_params(
                            DeclarationKind::Argument,
                            &path,
                            &metadata.name,
                            &declared,
                        );
                        let schema = Arc::new(ArgumentSchema::new(&self.store, &path, metadata, index, declared, merged));
                        self.store.set_schema(AnySchema::Argument(schema.clone()));
                        if let Some(action) = &action {
                            action.add_argument(schema);
                        }
                        registered += 1;
                    }
                }
                ClassMember::Accessor(_) | ClassMember::Constructor(_) | ClassMember::Other(_) => {}
            }
        }

        Ok(registered)
    }
}

fn find<'d>(decorators: &'d [Decorator], name: &str, program: &Program) -> Option<&'d Decorator> {
    decorators
        .iter()
        .find(|d| d.name().is_some_and(|id| program.resolve(id.name) == name))
}

fn wrong_record(declaration: &str, expected: DeclarationKind) -> RuntimeError {
    RuntimeError::InvalidMetadata {
        declaration: declaration.to_string(),
        reason: format!("payload is not {} metadata", expected),
    }
}

/// The metadata record embedded as the last argument of the call.
fn payload(decorator: &Decorator, program: &Program, declaration: &str) -> Result<Metadata, RuntimeError> {
    let Some(Expression::StringLiteral(last)) = decorator.arguments().last() else {
        return Err(RuntimeError::MissingMetadata {
            declaration: declaration.to_string(),
        });
    };
    Metadata::from_json(program.resolve(last.value)).map_err(|e| RuntimeError::InvalidMetadata {
        declaration: declaration.to_string(),
        reason: e.to_string(),
    })
}

/// Options object passed as the leading argument, as JSON. Values that are
/// not literals are skipped.
fn options(decorator: &Decorator, program: &Program, declaration: &str) -> Value {
    let Some(Expression::Object(object)) = decorator.arguments().first().map(Expression::unwrapped) else {
        return empty();
    };
    let mut map = Map::new();
    for property in &object.properties {
        let ObjectProperty::Property(property) = property else {
            tracing::warn!(declaration, "skipping spread in declaration options");
            continue;
        };
        let Some(key) = property.key.text(program.interner()) else {
            tracing::warn!(declaration, "skipping computed key in declaration options");
            continue;
        };
        match (property.shorthand, literal(&property.value, program)) {
            (false, Some(value)) => {
                map.insert(key, value);
            }
            _ => tracing::warn!(declaration, option = %key, "skipping non-literal option"),
        }
    }
    Value::Object(map)
}

/// JSON value of a literal expression.
fn literal(expression: &Expression, program: &Program) -> Option<Value> {
    Some(match expression.unwrapped() {
        Expression::IntLiteral(n) => Value::from(n.value),
        Expression::FloatLiteral(n) => number_value(n.value),
        Expression::BigIntLiteral(n) => Value::String(program.resolve(n.digits).to_string()),
        Expression::StringLiteral(s) => Value::String(program.resolve(s.value).to_string()),
        Expression::TemplateLiteral(t) => {
            let raw = program.resolve(t.raw);
            if raw.contains("${") {
                return None;
            }
            Value::String(raw.to_string())
        }
        Expression::BooleanLiteral(b) => Value::Bool(b.value),
        Expression::NullLiteral(_) => Value::Null,
        Expression::Unary(unary) if unary.operator == UnaryOperator::Minus => {
            let value = literal(&unary.operand, program)?;
            if let Some(n) = value.as_i64() {
                Value::from(-n)
            } else {
                number_value(-value.as_f64()?)
            }
        }
        Expression::Array(array) => Value::Array(
            array
                .elements
                .iter()
                .map(|element| match element {
                    Some(element) => literal(element, program),
                    None => Some(Value::Null),
                })
                .collect::<Option<Vec<_>>>()?,
        ),
        Expression::Object(object) => {
            let mut map = Map::new();
            for property in &object.properties {
                let ObjectProperty::Property(property) = property else {
                    return None;
                };
                if property.shorthand {
                    return None;
                }
                map.insert(property.key.text(program.interner())?, literal(&property.value, program)?);
            }
            Value::Object(map)
        }
        _ => return None,
    })
}
