use assert_cmd::Command;
use predicates::prelude::*;

fn invex() -> Command {
    Command::cargo_bin("invex").unwrap()
}

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{"service": {"api_key_env": "INVEX_CLI_TEST_KEY"}}"#).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    invex()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_process_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    invex()
        .arg("--config")
        .arg(&config)
        .args(["process", "/nonexistent/invoice.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_requires_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(docs.join("notes.txt"), "hello").unwrap();

    invex()
        .env_remove("INVEX_CLI_TEST_KEY")
        .arg("--config")
        .arg(&config)
        .arg("batch")
        .arg(&docs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVEX_CLI_TEST_KEY"));
}

#[test]
fn test_batch_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let pattern = dir.path().join("*.pdf");

    invex()
        .arg("--config")
        .arg(&config)
        .arg("batch")
        .arg(&pattern)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No files found"));
}

#[test]
fn test_config_init_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("invex.json");

    invex()
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("gpt-4o-2024-08-06"));
    assert!(content.contains("json_check"));

    invex()
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
