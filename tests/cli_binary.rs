use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const PR_URL: &str = "https://dev.azure.com/org1/proj1/_git/repoA/pullrequest/42";

#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("adoreview").unwrap();
    cmd.env_remove("ADO_BEARER_TOKEN");
    cmd
}

// --- Help & version ---

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("review threads"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adoreview"));
}

#[test]
fn post_help_lists_select() {
    cmd()
        .args(["post", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--select"))
        .stdout(predicate::str::contains("--dry-run"));
}

// --- Argument errors ---

#[test]
fn post_without_comments_is_usage_error() {
    cmd()
        .args(["post", PR_URL])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--comments"));
}

#[test]
fn fetch_rejects_malformed_url() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["fetch", "https://github.com/org/repo/pull/1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("dev.azure.com"))
        .stderr(predicate::str::contains("visualstudio.com"));
}

#[test]
fn post_missing_comments_file() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["post", PR_URL, "--comments", "nope.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("comments file not found"));
}

#[test]
fn post_invalid_selection() {
    let dir = tempfile::tempdir().unwrap();
    let comments = dir.path().join("comments.json");
    fs::write(&comments, r#"[{"filePath": "/a.rs", "line": 1, "content": "x"}]"#).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["post", PR_URL, "--comments"])
        .arg(&comments)
        .args(["--select", "1,two"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("two"));
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["fetch", PR_URL, "--config", "missing.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".adoreview.toml"), "bogus_key = 1\n").unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["fetch", PR_URL])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bogus_key"));
}

// --- Dry run (offline) ---

#[test]
fn dry_run_prints_selected_requests() {
    let dir = tempfile::tempdir().unwrap();
    let comments = dir.path().join("comments.json");
    fs::write(
        &comments,
        r#"[
            {"filePath": "/a.rs", "line": 3, "content": "first"},
            {"filePath": "b.rs", "line": 7, "content": "second"}
        ]"#,
    )
    .unwrap();

    let output = cmd()
        .current_dir(dir.path())
        .args(["post", PR_URL, "--dry-run", "--select", "2", "--comments"])
        .arg(&comments)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let planned: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let planned = planned.as_array().unwrap();
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0]["index"], 2);
    assert_eq!(planned[0]["request"]["threadContext"]["filePath"], "/b.rs");
    assert_eq!(planned[0]["request"]["threadContext"]["rightFileStart"]["line"], 7);
}

#[test]
fn dry_run_reads_comments_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["post", PR_URL, "--dry-run", "--comments", "-"])
        .write_stdin(r#"[{"filePath": "/a.rs", "line": 1, "content": "x"}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"index\": 1"));
}
