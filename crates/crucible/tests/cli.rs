//! Command-surface tests (spec §6), grounded on the teacher's
//! `assert_cmd`-based CLI tests (`depyler/tests/test_compile_command.rs`).

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn setup_python_file(filename: &str, content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(filename);
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn compile_help_mentions_the_subcommand() {
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"));
}

#[test]
fn compile_prints_ir_for_a_valid_file() {
    let (_dir, path) = setup_python_file("hello.py", "def f():\n    return 1\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("fn f"));
}

#[test]
fn compile_exits_nonzero_on_a_parse_error() {
    let (_dir, path) = setup_python_file("bad.py", "def f(:\n    pass\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn build_reports_dependency_unit_count() {
    let (_dir, path) = setup_python_file("hello.py", "def f():\n    return 1\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["build", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("built"));
}

#[test]
fn emit_bytecode_prints_a_serialized_program_instead_of_ir() {
    let (_dir, path) = setup_python_file("const.py", "x = 1 + 1\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", "--emit-bytecode", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("instructions"))
        .stdout(predicate::str::contains("fn ").not());
}

#[test]
fn emit_bytecode_fails_on_a_construct_the_embedded_vm_does_not_support() {
    let (_dir, path) = setup_python_file("func.py", "def f():\n    return 1\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", "--emit-bytecode", path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn force_bypasses_the_cache_oracle_on_repeated_compiles() {
    let (_dir, path) = setup_python_file("hello.py", "def f():\n    return 1\n");
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["compile", path.to_str().unwrap()])
        .assert()
        .success();
    Command::cargo_bin("crucible")
        .unwrap()
        .args(["--force", "compile", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("fn f"));
}
