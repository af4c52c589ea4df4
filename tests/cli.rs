//! Command-line validation tests. None of these reach the network.
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

fn bimbus() -> Command {
    Command::cargo_bin("bimbus").unwrap()
}

#[test]
fn test_no_arguments_prints_help() {
    bimbus()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_token() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("main.rs");
    input.write_str("fn main() {}").unwrap();

    bimbus()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("token"))
        .stderr(predicate::str::contains("Run 'bimbus -h' for help"));
}

#[test]
fn test_missing_input() {
    bimbus()
        .args(["-t", "sk-test"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("input file"));
}

#[test]
fn test_nonexistent_input_creates_nothing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("out");
    out.create_dir_all().unwrap();

    bimbus()
        .args(["-t", "sk-test"])
        .arg("-i")
        .arg(temp.path().join("missing.rs"))
        .arg("-o")
        .arg(out.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));

    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_input_is_directory() {
    let temp = assert_fs::TempDir::new().unwrap();

    bimbus()
        .args(["-t", "sk-test"])
        .arg("-i")
        .arg(temp.path())
        .arg("-o")
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a file"));
}

#[test]
fn test_output_is_not_directory() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("main.rs");
    input.write_str("fn main() {}").unwrap();

    bimbus()
        .args(["-t", "sk-test"])
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(temp.path().join("nowhere"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Output directory does not exist"));
}

#[test]
fn test_invalid_filetype() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("main.rs");
    input.write_str("fn main() {}").unwrap();

    bimbus()
        .args(["-t", "sk-test", "-f", "pdf"])
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid file type 'pdf'"));
}
