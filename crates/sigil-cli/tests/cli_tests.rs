//! End-to-end tests for the `sigil` binary.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

const USER: &str = r#"
@Model()
class User {
    @Attr() name: string;
    @Attr({ min: 0 }) age?: number;
}
"#;

fn sigil(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sigil"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("SIGIL_LOG")
        .output()
        .expect("failed to run sigil")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    std::fs::write(dir.path().join("models/user.ts"), USER).unwrap();
    dir
}

// ────────────────────────────────────────────────────────────────────────────
// emit
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_emit_lists_declarations() {
    let dir = project();
    let output = sigil(dir.path(), &["emit", "models"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let text = stdout(&output);
    assert!(text.contains("User.name"), "Expected User.name in {}", text);
    assert!(text.contains("Emitted 3 declarations in 1 files"), "Got {}", text);

    // Nothing written without --write
    assert_eq!(std::fs::read_to_string(dir.path().join("models/user.ts")).unwrap(), USER);
}

#[test]
fn test_emit_check_then_write() {
    let dir = project();

    let stale = sigil(dir.path(), &["emit", "--check", "models"]);
    assert_eq!(stale.status.code(), Some(1));
    assert!(stdout(&stale).contains("STALE"));

    let written = sigil(dir.path(), &["emit", "--write", "models"]);
    assert!(written.status.success());
    let source = std::fs::read_to_string(dir.path().join("models/user.ts")).unwrap();
    assert!(source.contains("@Attr('{"), "Expected an embedded payload in {}", source);

    let fresh = sigil(dir.path(), &["emit", "--check", "models"]);
    assert!(fresh.status.success(), "Got {}", stdout(&fresh));
}

#[test]
fn test_emit_out_dir() {
    let dir = project();
    let output = sigil(dir.path(), &["emit", "--out-dir", "dist", "models"]);
    assert!(output.status.success());

    let emitted = std::fs::read_to_string(dir.path().join("dist/models/user.ts")).unwrap();
    assert!(emitted.contains(r#""className":"User""#));
}

#[test]
fn test_emit_json() {
    let dir = project();
    let output = sigil(dir.path(), &["emit", "--json", "models"]);
    assert!(output.status.success());

    let records: Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["kind"], "model");
    assert_eq!(records[1]["path"], "User.name");
    assert_eq!(records[1]["metadata"]["type"]["kind"], "primitive");
}

// ────────────────────────────────────────────────────────────────────────────
// inspect
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_json() {
    let dir = project();
    let output = sigil(dir.path(), &["inspect", "--json", "models"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let user = &report["models"][0];
    assert_eq!(user["className"], "User");
    assert_eq!(user["collectionName"], "users");
    assert_eq!(user["attributes"][0]["name"], "name");
    assert_eq!(user["attributes"][0]["persistence"]["kind"], "column");
    assert_eq!(user["attributes"][1]["options"]["min"], 0);
}

#[test]
fn test_inspect_unknown_model() {
    let dir = project();
    let output = sigil(dir.path(), &["inspect", "--model", "Ghost", "models"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown model `Ghost`"));
}

// ────────────────────────────────────────────────────────────────────────────
// validate
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_validate_records() {
    let dir = project();
    std::fs::write(dir.path().join("good.json"), r#"{"name": "Ada", "age": 36}"#).unwrap();
    std::fs::write(dir.path().join("bad.json"), r#"[{"name": "Ada"}, {"age": -1}]"#).unwrap();

    let good = sigil(dir.path(), &["validate", "--model", "User", "--data", "good.json", "models"]);
    assert!(good.status.success(), "Got {}", stdout(&good));
    assert!(stdout(&good).contains("PASS"));

    let bad = sigil(dir.path(), &["validate", "--model", "User", "--data", "bad.json", "models"]);
    assert_eq!(bad.status.code(), Some(1));
    let text = stdout(&bad);
    assert!(text.contains("FAIL"));
    assert!(text.contains("1 of 2 records invalid"), "Got {}", text);

    let json = sigil(
        dir.path(),
        &["validate", "--model", "User", "--data", "bad.json", "--json", "models"],
    );
    let results: Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(results[0]["success"], true);
    let kinds: Vec<&str> = results[1]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"required"));
    assert!(kinds.contains(&"rangeUnderflow"));
}

#[test]
fn test_config_renames_decorators() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sigil.toml"), "[engine]\nmodel_decorator = \"Entity\"\n").unwrap();
    std::fs::write(
        dir.path().join("post.ts"),
        "@Entity() class Post { @Attr() title: string; }",
    )
    .unwrap();

    let output = sigil(dir.path(), &["inspect", "--json", "."]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["models"][0]["className"], "Post");
}
