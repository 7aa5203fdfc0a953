//! `sigil inspect`: print the schemas built from declaration sources.

use serde_json::{json, Value};
use sigil_runtime::{AppContext, ModelSchema, PersistenceDeclaration, Schema, SigilConfig};
use std::sync::Arc;

use super::files::read_sources;
use crate::output::StyledOutput;

pub fn execute(
    paths: &[String],
    model: Option<&str>,
    json: bool,
    config: SigilConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<bool> {
    let context = load(paths, config)?;
    let models = select(&context, model)?;

    if json {
        let described = models.iter().map(|m| describe(m)).collect::<anyhow::Result<Vec<_>>>()?;
        out.plain(&serde_json::to_string_pretty(&json!({ "models": described }))?);
        out.newline();
        return Ok(true);
    }

    for model in &models {
        print_model(model, out)?;
        out.newline();
    }
    Ok(true)
}

/// Load and construct every source under `paths`.
pub fn load(paths: &[String], config: SigilConfig) -> anyhow::Result<AppContext> {
    let sources = read_sources(paths)?;
    let context = AppContext::new(config);
    context.load_sources(sources.iter().map(|(name, text)| (name.as_str(), text.as_str())))?;
    Ok(context)
}

fn select(context: &AppContext, model: Option<&str>) -> anyhow::Result<Vec<Arc<ModelSchema>>> {
    match model {
        Some(name) => {
            let Some(schema) = context.store().get_model_schema(name) else {
                anyhow::bail!("Unknown model `{}`", name);
            };
            Ok(vec![schema])
        }
        None => Ok(context.store().models()),
    }
}

// ============================================================================
// JSON
// ============================================================================

fn describe(model: &ModelSchema) -> anyhow::Result<Value> {
    let mut attributes = Vec::new();
    for name in model.attribute_names()? {
        let schema = model.attribute_schema(&name)?;
        attributes.push(json!({
            "name": name,
            "owner": schema.owner_class(),
            "metadata": schema.metadata(),
            "options": schema.options(),
            "persistence": schema.persistence().ok(),
        }));
    }

    let mut actions = Vec::new();
    for name in model.action_names()? {
        let Some(action) = model.action_schema(&name)? else {
            continue;
        };
        let arguments: Vec<Value> = action
            .arguments()
            .iter()
            .map(|argument| json!(argument.metadata()))
            .collect();
        actions.push(json!({
            "metadata": action.metadata(),
            "arguments": arguments,
        }));
    }

    Ok(json!({
        "className": model.class_name(),
        "collectionName": model.collection_name(),
        "isAbstract": model.is_abstract(),
        "parent": model.parent(),
        "attributes": attributes,
        "actions": actions,
    }))
}

// ============================================================================
// Terminal
// ============================================================================

fn print_model(model: &ModelSchema, out: &mut StyledOutput) -> anyhow::Result<()> {
    out.bold(&format!("model {}", model.class_name()));
    if let Some(parent) = model.parent() {
        out.plain(&format!(" extends {}", parent));
    }
    out.dim(&format!("  ({})", model.collection_name()));
    if model.is_abstract() {
        out.warning("  abstract");
    }
    out.newline();

    for name in model.attribute_names()? {
        let schema = model.attribute_schema(&name)?;
        let metadata = schema.metadata();
        out.plain("  ");
        out.info(&format!("{}{}", name, if metadata.is_required { "" } else { "?" }));
        out.plain(&format!(": {}", metadata.ty));

        let mut flags = Vec::new();
        if metadata.is_read_only {
            flags.push("readonly");
        }
        if metadata.is_internal {
            flags.push("internal");
        }
        if metadata.is_lazy {
            flags.push("lazy");
        }
        if !flags.is_empty() {
            out.dim(&format!(" [{}]", flags.join(", ")));
        }
        if let Ok(declaration) = schema.persistence() {
            out.dim(&format!("  {}", persistence_summary(&declaration)));
        }
        out.newline();
    }

    for name in model.action_names()? {
        let Some(action) = model.action_schema(&name)? else {
            continue;
        };
        let arguments: Vec<String> = action
            .arguments()
            .iter()
            .map(|argument| {
                let metadata = argument.metadata();
                format!("{}{}: {}", metadata.name, if metadata.is_required { "" } else { "?" }, metadata.ty)
            })
            .collect();
        out.plain("  ");
        if action.is_static() {
            out.dim("static ");
        }
        out.success(&action.name());
        out.plain(&format!("({})", arguments.join(", ")));
        out.newline();
    }
    Ok(())
}

fn persistence_summary(declaration: &PersistenceDeclaration) -> String {
    match declaration {
        PersistenceDeclaration::Primary { generated: Some(strategy) } => format!("primary key, generated ({:?})", strategy),
        PersistenceDeclaration::Primary { generated: None } => "primary key".to_string(),
        PersistenceDeclaration::Generated { strategy } => format!("generated ({:?})", strategy),
        PersistenceDeclaration::CreateDate => "creation date".to_string(),
        PersistenceDeclaration::UpdateDate => "update date".to_string(),
        PersistenceDeclaration::DeleteDate => "deletion date".to_string(),
        PersistenceDeclaration::Version => "version".to_string(),
        PersistenceDeclaration::Relation(relation) => {
            let mut text = format!("{} {}", relation.cardinality, relation.target);
            if let Some(inverse) = &relation.inverse {
                text.push_str(&format!(".{}", inverse));
            }
            if let Some(column) = &relation.join_column {
                text.push_str(&format!(" via {}", column));
            }
            if relation.owner {
                text.push_str(" (owner)");
            }
            text
        }
        PersistenceDeclaration::Column(column) => {
            let mut text = format!("column {:?}", column.column_type);
            for (flag, label) in [
                (column.nullable, "nullable"),
                (column.unique, "unique"),
                (column.index, "indexed"),
                (!column.update, "no update"),
            ] {
                if flag {
                    text.push_str(", ");
                    text.push_str(label);
                }
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_runtime::{Cardinality, ColumnDeclaration, ColumnType, RelationDeclaration};

    #[test]
    fn test_persistence_summary() {
        let relation = PersistenceDeclaration::Relation(RelationDeclaration {
            target: "Post".to_string(),
            cardinality: Cardinality::ManyToOne,
            inverse: Some("author".to_string()),
            join_column: None,
            owner: false,
            nullable: false,
        });
        assert_eq!(persistence_summary(&relation), "many-to-one Post.author");

        let column = PersistenceDeclaration::Column(ColumnDeclaration {
            column_type: ColumnType::Text,
            nullable: true,
            unique: false,
            index: true,
            update: false,
        });
        assert_eq!(persistence_summary(&column), "column Text, nullable, indexed, no update");
    }
}
