use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn input_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn folio() -> Command {
    Command::cargo_bin("folio").unwrap()
}

#[test]
fn run_text() {
    let file = input_file("\\noindent Hello\n");
    folio()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("% page 1\n\\vbox"))
        .stdout(predicate::str::contains("\\font0 H"));
}

#[test]
fn run_json() {
    let file = input_file("\\hbox{ab}\\eject\\hbox{c}\n");
    let output = folio()
        .args(["run", "--format", "json"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let pages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let pages = pages.as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["box"]["type"], "vbox");
}

#[test]
fn run_hsize_flag() {
    let file = input_file("Hello\n");
    let output = folio()
        .args(["run", "--format", "json", "--hsize", "100pt"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let pages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(pages[0]["box"]["width"], 100 * 65536);
}

#[test]
fn run_config_file() {
    let config = input_file(r#"{"hsize": 6553600, "error_limit": 1}"#);
    let file = input_file("Hello\n");
    let output = folio()
        .args(["run", "--format", "json", "--config"])
        .arg(config.path())
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let pages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(pages[0]["box"]["width"], 100 * 65536);
}

#[test]
fn run_invalid_config_file() {
    let config = input_file("{");
    let file = input_file("Hello\n");
    folio()
        .args(["run", "--config"])
        .arg(config.path())
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn run_message() {
    let file = input_file("\\message{hello from the document}\n");
    folio()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("hello from the document"));
}

#[test]
fn run_recoverable_error() {
    let file = input_file("\\undefined a\n");
    folio()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("% page 1"))
        .stderr(predicate::str::contains("1 error(s) were reported"));
}

#[test]
fn run_fatal_error() {
    let file = input_file("a{\n");
    folio()
        .arg("run")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("typesetting stopped"));
}

#[test]
fn run_error_limit() {
    let file = input_file("\\a \\b \\c\n");
    folio()
        .args(["run", "--error-limit", "1"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("too many errors"));
}

#[test]
fn run_missing_file() {
    folio()
        .args(["run", "/this/file/does/not/exist.tex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open file"));
}

#[test]
fn doc_primitive() {
    folio()
        .args(["doc", "\\hbox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build a box from a horizontal list"));
}

#[test]
fn doc_list() {
    folio()
        .arg("doc")
        .assert()
        .success()
        .stdout(predicate::str::contains("advance"))
        .stdout(predicate::str::contains("xdef"));
}

#[test]
fn doc_unknown() {
    folio()
        .args(["doc", "notAPrimitive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown primitive"));
}
