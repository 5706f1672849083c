//! End-to-end tests of the `cloudron` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn cloudron(config_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cloudron").expect("binary");
    cmd.env("CLOUDRON_CONFIG", config_dir.path().join("cloudron.json"))
        .env_remove("CLOUDRON_HOST")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    cloudron(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("versions"));
}

#[test]
fn versions_latest_is_pinned() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = cloudron(&dir)
        .args(["versions", "latest"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    cloudron(&dir)
        .args(["versions", "latest"])
        .assert()
        .success()
        .stdout(first);
}

#[test]
fn versions_unknown_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    cloudron(&dir)
        .args(["versions", "42.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: unknown version: 42.0.0"));
}

#[test]
fn list_requires_login() {
    let dir = tempfile::tempdir().expect("tempdir");
    cloudron(&dir)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: not logged in"));
}

#[test]
fn exec_without_terminal_fails_before_network() {
    let dir = tempfile::tempdir().expect("tempdir");
    cloudron(&dir)
        .args(["--host", "127.0.0.1:1", "--app", "app1", "exec", "--", "ls"])
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a terminal"));
}

#[test]
fn logout_clears_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cloudron.json");
    std::fs::write(&path, r#"{"host":"my.example.com","token":"t0k3n"}"#).expect("write");

    cloudron(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout("Logged out.\n");

    let saved = std::fs::read_to_string(&path).expect("read");
    assert!(!saved.contains("t0k3n"));
    assert!(saved.contains("my.example.com"));
}

#[test]
fn builds_without_manifest_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    cloudron(&dir)
        .current_dir(dir.path())
        .arg("builds")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CloudronManifest.json"));
}
