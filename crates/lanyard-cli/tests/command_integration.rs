//! Integration tests for CLI commands.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const STATIC_CONFIG: &str = r#"
[[resolver.connectors]]
id = "fixed"
type = "static"
attributes = [
    { id = "affiliation", values = ["member", "staff"] },
    { id = "mail", values = ["alice@example.org"] },
]

[[resolver.definitions]]
id = "eduPersonAffiliation"
type = "simple"
dependencies = [{ plugin = "fixed", source_attribute = "affiliation" }]

[[resolver.definitions]]
id = "uid"
type = "regex-split"
pattern = '^(.+)@example\.org$'
dependencies = [{ plugin = "fixed", source_attribute = "mail" }]

[[filter.policies]]
id = "sp"
requirement = { type = "requester-string", value = "https://sp.example.org" }

[[filter.policies.rules]]
attribute = "eduPersonAffiliation"
permit = [{ type = "value-string", value = "member" }]

[[filter.policies.rules]]
attribute = "uid"
permit = [{ type = "any" }]
"#;

const DIRECTORY_CONFIG: &str = r#"
[[resolver.connectors]]
id = "people"
type = "directory"
backend = "ldap"
base_dn = "ou=people,dc=example,dc=org"
filter = "(uid=${principal})"
"#;

fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("lanyard.toml"), config).unwrap();
    temp
}

fn lanyard(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lanyard").unwrap();
    cmd.arg("--project")
        .arg(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn version_prints_name() {
    Command::cargo_bin("lanyard")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lanyard"));
}

#[test]
fn resolve_requires_principal() {
    Command::cargo_bin("lanyard")
        .unwrap()
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--principal"));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn check_accepts_static_config() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 connectors, 2 definitions"))
        .stdout(predicate::str::contains("All connectors validated"));
}

#[test]
fn check_reports_offline_directory() {
    let temp = project(DIRECTORY_CONFIG);
    lanyard(&temp)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Connector validation failed"));

    lanyard(&temp).args(["check", "--skip-backends"]).assert().success();
}

#[test]
fn check_rejects_dependency_cycle() {
    let temp = project(
        r#"
[[resolver.definitions]]
id = "a"
type = "simple"
dependencies = [{ plugin = "b" }]

[[resolver.definitions]]
id = "b"
type = "simple"
dependencies = [{ plugin = "a" }]
"#,
    );
    lanyard(&temp)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn show_toml_round_trips_connector_type() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .args(["show", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"type = "static""#));
}

#[test]
fn show_text_lists_plugins() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed [static]"))
        .stdout(predicate::str::contains("uid [regex-split] <- fixed"));
}

#[test]
fn environment_overrides_logging_level() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .env("LANYARD_LOGGING__LEVEL", "warn")
        .args(["show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""level": "warn""#));
}

#[test]
fn resolve_filters_for_requester() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .args([
            "resolve",
            "--principal",
            "alice",
            "--requester",
            "https://sp.example.org",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("eduPersonAffiliation: member"))
        .stdout(predicate::str::contains("staff").not())
        .stdout(predicate::str::contains("uid: alice"))
        .stdout(predicate::str::contains("sp: TRUE"));
}

#[test]
fn resolve_other_requester_gets_nothing() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .args([
            "resolve",
            "--principal",
            "alice",
            "--requester",
            "https://other.example.org",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""attributes": {}"#))
        .stdout(predicate::str::contains(r#""requirement": "false""#));
}

#[test]
fn resolve_limits_to_requested_attributes() {
    let temp = project(STATIC_CONFIG);
    lanyard(&temp)
        .args([
            "resolve",
            "--principal",
            "alice",
            "--requester",
            "https://sp.example.org",
            "--attribute",
            "uid",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("uid: alice"))
        .stdout(predicate::str::contains("eduPersonAffiliation").not());
}
