//! Integration tests for the ep binary's offline subcommands

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::TempDir;

/// Command for ep with logs, config and secrets isolated in a temp dir
fn ep(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("ep");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    ep(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: ep"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("templates"));
}

#[test]
fn test_templates_lists_every_variable_set() {
    let home = TempDir::new().unwrap();
    ep(&home)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("input, response, reference"))
        .stdout(predicate::str::contains("input, response, context"))
        .stdout(predicate::str::contains("ground-truth"))
        .stdout(predicate::str::contains("context-reference"));
}

#[test]
fn test_presets() {
    let home = TempDir::new().unwrap();
    ep(&home)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("pass-fail"))
        .stdout(predicate::str::contains("1-10"));
}

#[test]
fn test_generate_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    ep(&home)
        .args(["generate", "--name", "tone", "--criteria", "Is it polite?", "--rubric", "1-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_generate_rejects_bad_examples_file() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("examples.yml");
    std::fs::write(&file, "not: [a, list").unwrap();
    ep(&home)
        .args(["generate", "--name", "tone", "--criteria", "x", "--rubric", "1-5", "--examples-file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse examples file"));
}

#[test]
fn test_invalid_config_path_fails() {
    let home = TempDir::new().unwrap();
    ep(&home)
        .args(["--config", "/nonexistent/evalprompt.yml", "presets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
