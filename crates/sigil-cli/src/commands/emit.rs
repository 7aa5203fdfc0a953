//! `sigil emit`: embed metadata payloads into declaration sources.

use anyhow::Context;
use serde_json::json;
use sigil_engine::{emit_source, EmittedUnit};
use sigil_runtime::SigilConfig;
use std::path::{Component, Path, PathBuf};

use super::files::collect_sources;
use crate::output::StyledOutput;

pub struct EmitOptions {
    pub out_dir: Option<PathBuf>,
    pub write: bool,
    pub check: bool,
    pub json: bool,
}

/// Returns `false` when `--check` finds stale sources.
pub fn execute(
    paths: &[String],
    options: &EmitOptions,
    config: &SigilConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<bool> {
    let files = collect_sources(paths)?;
    if files.is_empty() {
        anyhow::bail!("No declaration sources found in {}", paths.join(", "));
    }

    let mut records = Vec::new();
    let mut total = 0;
    let mut stale = 0;
    let mut written = 0;

    for path in &files {
        let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.display().to_string();
        let (rewritten, units) =
            emit_source(&name, &source, &config.engine).with_context(|| format!("Failed to emit {}", name))?;
        tracing::debug!(file = %name, declarations = units.len(), "emitted source");
        total += units.len();

        if options.check {
            if rewritten != source {
                stale += 1;
                if !options.json {
                    out.stale_badge();
                    out.plain(&format!(" {}\n", name));
                }
            }
        } else if let Some(out_dir) = &options.out_dir {
            let target = out_dir.join(relative_path(path));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &rewritten).with_context(|| format!("Failed to write {}", target.display()))?;
            written += 1;
        } else if options.write && rewritten != source {
            std::fs::write(path, &rewritten).with_context(|| format!("Failed to write {}", name))?;
            written += 1;
        }

        if options.json {
            records.extend(units.iter().map(record));
        } else if !options.check {
            print_units(&name, &units, out);
        }
    }

    if options.json {
        out.plain(&serde_json::to_string_pretty(&records)?);
        out.newline();
        return Ok(stale == 0);
    }

    out.newline();
    if options.check {
        if stale == 0 {
            out.success("All sources up to date");
            out.plain(&format!(" ({} files)\n", files.len()));
        } else {
            out.error(&format!("{} of {} sources need `sigil emit --write`", stale, files.len()));
            out.newline();
        }
    } else {
        out.success("Emitted");
        out.plain(&format!(" {} declarations in {} files", total, files.len()));
        if written > 0 {
            out.plain(&format!(", {} written", written));
        }
        out.newline();
    }
    Ok(stale == 0)
}

fn record(unit: &EmittedUnit) -> serde_json::Value {
    json!({
        "file": unit.file,
        "kind": unit.kind,
        "path": unit.path(),
        "metadata": unit.metadata,
    })
}

fn print_units(name: &str, units: &[EmittedUnit], out: &mut StyledOutput) {
    out.bold(name);
    out.newline();
    for unit in units {
        out.plain("  ");
        out.info(&format!("{:<10}", unit.kind.as_str()));
        out.plain(&unit.path());
        out.newline();
    }
}

/// `path` with root, prefix and parent components dropped, so output stays
/// under the output directory.
fn relative_path(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_stays_inside() {
        assert_eq!(relative_path(Path::new("./models/user.ts")), PathBuf::from("models/user.ts"));
        assert_eq!(relative_path(Path::new("/abs/user.ts")), PathBuf::from("abs/user.ts"));
        assert_eq!(relative_path(Path::new("../up/user.ts")), PathBuf::from("up/user.ts"));
    }
}
