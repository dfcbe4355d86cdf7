//! CLI integration tests for purser.
//!
//! These tests drive the binary against throwaway workspaces.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get the purser binary command, isolated from the user's global config.
fn purser(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("purser").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("PURSER_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_json(root: &Path, rel: &str) -> Value {
    serde_json::from_str(&fs::read_to_string(root.join(rel)).unwrap()).unwrap()
}

/// Root declaring `dep-1`; package-1 requires `dep-1` and the undeclared
/// `dep-2`; package-2 requires package-1.
fn basic_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "package.json",
        r#"{
  "name": "root",
  "version": "0.0.1",
  "dependencies": {
    "dep-1": "0.0.0"
  }
}
"#,
    );
    write(
        root,
        "packages/package-1/package.json",
        r#"{
  "name": "@test/package-1",
  "version": "0.0.0",
  "description": "kept as is"
}
"#,
    );
    write(
        root,
        "packages/package-1/index.js",
        "const dep1 = require('dep-1');\nconst dep2 = require('dep-2');\n",
    );
    write(
        root,
        "packages/package-2/package.json",
        r#"{
  "name": "@test/package-2",
  "version": "0.0.0"
}
"#,
    );
    write(
        root,
        "packages/package-2/index.js",
        "const p1 = require('@test/package-1');\n",
    );
    tmp
}

// ============================================================================
// purser update
// ============================================================================

#[test]
fn test_update_adds_declared_and_local_dependencies() {
    let tmp = basic_workspace();

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Added"))
        .stderr(predicate::str::contains("'dep-2'"))
        .stderr(predicate::str::contains("not found"));

    let p1 = read_json(tmp.path(), "packages/package-1/package.json");
    assert_eq!(p1["dependencies"]["dep-1"], "0.0.0");
    assert!(p1["dependencies"].get("dep-2").is_none());
    assert_eq!(p1["description"], "kept as is");

    let keys: Vec<_> = p1.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["name", "version", "description", "dependencies"]);

    let p2 = read_json(tmp.path(), "packages/package-2/package.json");
    assert_eq!(p2["dependencies"]["@test/package-1"], "0.0.0");
}

#[test]
fn test_update_output_format() {
    let tmp = basic_workspace();

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success();

    let text = fs::read_to_string(tmp.path().join("packages/package-2/package.json")).unwrap();
    assert_eq!(
        text,
        "{\n  \"name\": \"@test/package-2\",\n  \"version\": \"0.0.0\",\n  \"dependencies\": {\n    \"@test/package-1\": \"0.0.0\"\n  }\n}\n"
    );
}

#[test]
fn test_update_is_idempotent() {
    let tmp = basic_workspace();

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success();
    let first = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Added").not())
        .stderr(predicate::str::contains("Updated").not());
    let second = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_update_dry_run_writes_nothing() {
    let tmp = basic_workspace();
    let before = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();

    purser(tmp.path())
        .args(["update", "--dry-run", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("dry run"));

    let after = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_update_finds_root_from_cwd() {
    let tmp = basic_workspace();
    write(tmp.path(), "purser.toml", "[workspace]\npackages = \"packages\"\n");

    purser(tmp.path())
        .arg("update")
        .current_dir(tmp.path().join("packages/package-1"))
        .assert()
        .success();

    let p1 = read_json(tmp.path(), "packages/package-1/package.json");
    assert_eq!(p1["dependencies"]["dep-1"], "0.0.0");
}

#[test]
fn test_update_inherits_version() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"name": "root", "version": "1.2.0"}"#);
    write(
        tmp.path(),
        "packages/child/package.json",
        r#"{"name": "child", "version": "1.0.0", "purser": {"inherit": ["version"]}}"#,
    );

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Inherited"));

    let child = read_json(tmp.path(), "packages/child/package.json");
    assert_eq!(child["version"], "1.2.0");
}

#[test]
fn test_update_prune_removes_unused() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"name": "root"}"#);
    write(
        tmp.path(),
        "packages/a/package.json",
        r#"{"name": "a", "dependencies": {"unused": "1.0.0"}}"#,
    );

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("DISABLED"));
    let a = read_json(tmp.path(), "packages/a/package.json");
    assert_eq!(a["dependencies"]["unused"], "1.0.0");

    purser(tmp.path())
        .args(["update", "--prune", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));
    let a = read_json(tmp.path(), "packages/a/package.json");
    assert!(a["dependencies"].get("unused").is_none());
}

#[test]
fn test_update_self_merges_children() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"name": "root"}"#);
    write(tmp.path(), "packages/a/package.json", r#"{"name": "a"}"#);
    write(tmp.path(), "packages/a/index.js", "module.exports = 1;\n");
    write(
        tmp.path(),
        "packages/b/package.json",
        r#"{"name": "b", "dependencies": {"dep-x": "3.1.0"}}"#,
    );
    write(tmp.path(), "packages/b/index.js", "require('dep-x');\n");

    purser(tmp.path())
        .args(["update", "--self", "--root"])
        .arg(tmp.path())
        .assert()
        .success();

    let root = read_json(tmp.path(), "package.json");
    assert_eq!(root["dependencies"]["dep-x"], "3.1.0");
    assert!(root.get("devDependencies").is_none());
}

#[test]
fn test_update_esm_module_system() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "package.json",
        r#"{"name": "root", "dependencies": {"react": "18.2.0"}, "devDependencies": {"chai": "4.3.0"}}"#,
    );
    write(tmp.path(), "packages/web/package.json", r#"{"name": "web"}"#);
    write(
        tmp.path(),
        "packages/web/index.js",
        "import React from 'react';\nexport { x } from './local.js';\n",
    );
    write(
        tmp.path(),
        "packages/web/test/index.test.js",
        "import { expect } from 'chai';\n",
    );

    purser(tmp.path())
        .args(["update", "--module-system", "esm", "--root"])
        .arg(tmp.path())
        .assert()
        .success();

    let web = read_json(tmp.path(), "packages/web/package.json");
    assert_eq!(web["dependencies"]["react"], "18.2.0");
    assert_eq!(web["devDependencies"]["chai"], "4.3.0");
}

#[test]
fn test_update_parse_error_fails() {
    let tmp = basic_workspace();
    write(tmp.path(), "packages/package-2/broken.js", "import a from b;\n");
    let before = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();

    purser(tmp.path())
        .args(["update", "--module-system", "esm", "--root"])
        .arg(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("broken.js"));

    let after = fs::read_to_string(tmp.path().join("packages/package-1/package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_update_json_messages() {
    let tmp = basic_workspace();

    let output = purser(tmp.path())
        .args(["--message-format", "json", "update", "--root"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let events: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events
        .iter()
        .any(|e| e["reason"] == "unresolved-dependency" && e["name"] == "dep-2"));
    assert!(events
        .iter()
        .any(|e| e["reason"] == "patch-applied" && e["name"] == "dep-1" && e["outcome"] == "changed"));
    assert_eq!(events.last().unwrap()["reason"], "update-finished");
}

#[test]
fn test_update_missing_root_manifest() {
    let tmp = TempDir::new().unwrap();

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.json"));
}

#[test]
fn test_update_warns_about_package_without_manifest() {
    let tmp = basic_workspace();
    write(tmp.path(), "packages/stray/index.js", "require('x');\n");

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("stray"));
}

#[test]
fn test_update_duplicate_package_names_fail() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"name": "root"}"#);
    write(tmp.path(), "packages/a/package.json", r#"{"name": "same"}"#);
    write(tmp.path(), "packages/b/package.json", r#"{"name": "same"}"#);

    purser(tmp.path())
        .args(["update", "--root"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("same"));
}

// ============================================================================
// purser link
// ============================================================================

#[cfg(unix)]
#[test]
fn test_link_creates_symlinks() {
    let tmp = basic_workspace();

    purser(tmp.path())
        .args(["link", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Linked"));

    let link = tmp.path().join("packages/node_modules/@test/package-1");
    let meta = fs::symlink_metadata(&link).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(
        fs::read_link(&link).unwrap(),
        tmp.path().join("packages/package-1")
    );

    // linking again replaces the links, and the node_modules dir is not a package
    purser(tmp.path())
        .args(["link", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("node_modules'").not());
}

// ============================================================================
// purser version / help / completions
// ============================================================================

#[test]
fn test_version() {
    let tmp = TempDir::new().unwrap();

    purser(tmp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("purser "));
}

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();

    purser(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("link"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();

    purser(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("purser"));
}
