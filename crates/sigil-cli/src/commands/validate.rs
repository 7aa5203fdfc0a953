//! `sigil validate`: check JSON records against a model schema.

use anyhow::Context;
use serde_json::Value;
use sigil_runtime::{Access, Schema, SigilConfig, ValidationResult};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::inspect::load;
use crate::output::StyledOutput;

pub struct ValidateOptions {
    pub model: String,
    pub data: PathBuf,
    pub external: bool,
    pub json: bool,
}

/// Returns `false` when any record fails validation.
pub fn execute(
    paths: &[String],
    options: &ValidateOptions,
    config: SigilConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<bool> {
    let context = load(paths, config)?;
    let Some(model) = context.store().get_model_schema(&options.model) else {
        anyhow::bail!("Unknown model `{}`", options.model);
    };

    let records = match read_data(&options.data)? {
        Value::Array(records) => records,
        record => vec![record],
    };
    let access = if options.external {
        Access::External
    } else {
        Access::Internal
    };

    let results = records
        .iter()
        .map(|record| model.validate(record, access))
        .collect::<Result<Vec<_>, _>>()?;
    let failed = results.iter().filter(|result| !result.success).count();
    tracing::info!(model = %options.model, records = results.len(), failed, "validated records");

    if options.json {
        out.plain(&serde_json::to_string_pretty(&results)?);
        out.newline();
        return Ok(failed == 0);
    }

    for (index, result) in results.iter().enumerate() {
        print_result(index, result, out);
    }
    out.newline();
    if failed == 0 {
        out.success(&format!("{} of {} records valid", results.len(), results.len()));
    } else {
        out.error(&format!("{} of {} records invalid", failed, results.len()));
    }
    out.newline();
    Ok(failed == 0)
}

fn read_data(path: &Path) -> anyhow::Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_result(index: usize, result: &ValidationResult, out: &mut StyledOutput) {
    if result.success {
        out.pass_badge();
    } else {
        out.fail_badge();
    }
    out.plain(&format!(" record {}\n", index));

    for issue in &result.errors {
        let path = if issue.path.is_empty() {
            "(root)".to_string()
        } else {
            issue.path.join(".")
        };
        out.plain("    ");
        out.error(&format!("{:<15}", issue_label(issue)));
        out.info(&path);
        out.dim(&format!("  {}", issue.message));
        out.newline();
    }
}

fn issue_label(issue: &sigil_runtime::ValidationIssue) -> String {
    serde_json::to_value(issue.kind)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", issue.kind))
}
