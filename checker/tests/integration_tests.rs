use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const HALF_ADDER_BLIF: &str = ".model half_adder\n\
.inputs a b\n\
.outputs sum cout\n\
.gate xor2 a=a b=b O=sum\n\
.gate and2 a=a b=b O=cout\n\
.end\n";

fn checker_cmd() -> Command {
    Command::cargo_bin("checker").unwrap()
}

#[test]
fn test_help_command() {
    checker_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verifies that a substrate transformation pipeline"));
}

#[test]
fn test_half_adder_passes_under_digital_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("half_adder.blif");
    fs::write(&path, HALF_ADDER_BLIF).unwrap();

    checker_cmd()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn test_half_adder_passes_under_analog_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("half_adder.blif");
    fs::write(&path, HALF_ADDER_BLIF).unwrap();

    checker_cmd()
        .arg(&path)
        .arg("--pim-mode")
        .arg("analog")
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn test_malformed_blif_is_a_hard_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.blif");
    fs::write(&path, ".model m\n.inputs a\n.outputs a\n").unwrap();

    checker_cmd().arg(&path).assert().failure().code(2);
}

#[test]
fn test_multiple_files_in_one_invocation() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.blif");
    let b = dir.path().join("b.blif");
    fs::write(&a, HALF_ADDER_BLIF).unwrap();
    fs::write(&b, HALF_ADDER_BLIF).unwrap();

    checker_cmd()
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS").count(2));
}
