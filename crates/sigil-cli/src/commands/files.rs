//! Shared source collection for CLI commands.

use anyhow::Context;
use std::path::{Path, PathBuf};

/// Extension of declaration sources
const SOURCE_EXTENSION: &str = "ts";

/// Collect declaration sources from the given paths (files or directories),
/// sorted so output is stable.
pub fn collect_sources(paths: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            collect_in_dir(path, &mut files)?;
        } else {
            anyhow::bail!("No such file or directory: {}", path_str);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Recursively collect sources in a directory.
fn collect_in_dir(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // Skip hidden dirs, build output and node_modules
        if path.is_dir() {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with('.') || name_str == "dist" || name_str == "node_modules" {
                continue;
            }
            collect_in_dir(&path, files)?;
        } else if is_source(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// `.ts` files, declaration files (`.d.ts`) excluded.
fn is_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) && !name.ends_with(".d.ts")
}

/// Read every collected source as `(display name, text)`.
pub fn read_sources(paths: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let files = collect_sources(paths)?;
    if files.is_empty() {
        anyhow::bail!("No declaration sources found in {}", paths.join(", "));
    }
    files
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect()
}
