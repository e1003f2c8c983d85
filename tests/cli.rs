//! Command-line behavior of the `ormforge` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const BLOG: &str = r#"
[[shapes]]
name = "Blog"
members = [
    { name = "Id", kind = { scalar = "int32" } },
    { name = "Url", kind = { scalar = "string" } },
    { name = "Posts", kind = { collection = "Post" } },
]

[[shapes]]
name = "Post"
members = [
    { name = "Id", kind = { scalar = "int32" } },
    { name = "Blog", kind = { reference = "Blog" } },
]

[[entities]]
name = "Blog"
indexes = [{ properties = ["Url"], unique = true }]
"#;

const AMBIGUOUS: &str = r#"
[[shapes]]
name = "Person"
members = [
    { name = "Id", kind = { scalar = "int32" } },
    { name = "Authored", kind = { collection = "Post" } },
    { name = "Edited", kind = { collection = "Post" } },
]

[[shapes]]
name = "Post"
members = [
    { name = "Id", kind = { scalar = "int32" } },
    { name = "Author", kind = { reference = "Person" } },
    { name = "Editor", kind = { reference = "Person" } },
]

[[entities]]
name = "Person"
"#;

fn ormforge() -> Command {
    let mut cmd = Command::cargo_bin("ormforge").unwrap();
    cmd.env_remove("ORMFORGE_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_check_valid_definition() {
    let dir = TempDir::new().unwrap();
    let definition = write(&dir, "blog.toml", BLOG);

    ormforge()
        .arg("check")
        .arg(&definition)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entity types, 1 foreign keys"));
}

#[test]
fn test_check_reports_ambiguity() {
    let dir = TempDir::new().unwrap();
    let definition = write(&dir, "people.toml", AMBIGUOUS);

    ormforge()
        .arg("check")
        .arg(&definition)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Person.Authored"))
        .stderr(predicate::str::contains("has 2 error(s)"));
}

#[test]
fn test_dump_text() {
    let dir = TempDir::new().unwrap();
    let definition = write(&dir, "blog.toml", BLOG);

    ormforge()
        .args(["dump", "--format", "text"])
        .arg(&definition)
        .assert()
        .success()
        .stdout(predicate::str::contains("Blog [Explicit]"))
        .stdout(predicate::str::contains("index (Url) unique"))
        .stdout(predicate::str::contains("via Blog / Posts"));
}

#[test]
fn test_dump_json_to_file() {
    let dir = TempDir::new().unwrap();
    let definition = write(&dir, "blog.toml", BLOG);
    let output = dir.path().join("model.json");

    ormforge()
        .arg("dump")
        .arg(&definition)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let json = fs::read_to_string(&output).unwrap();
    assert!(json.contains("\"product_version\""));
    assert!(json.contains("\"name\": \"Post\""));
}

#[test]
fn test_unsupported_definition_format() {
    let dir = TempDir::new().unwrap();
    let definition = write(&dir, "blog.yaml", "entities: []");

    ormforge()
        .arg("check")
        .arg(&definition)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_conventions_follow_config() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "ormforge.toml", "[conventions]\nforeign_key_index = false\n");

    ormforge()
        .arg("conventions")
        .assert()
        .success()
        .stdout(predicate::str::contains(" 1. property_discovery"))
        .stdout(predicate::str::contains("12. model_version"))
        .stdout(predicate::str::contains("(disabled)").not());

    ormforge()
        .args(["conventions", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("11. foreign_key_index (disabled)"));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "ormforge.toml", "max_dispatches = 0\n");

    ormforge()
        .arg("conventions")
        .env("ORMFORGE_CONFIG", &config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_dispatches must be positive"));
}
