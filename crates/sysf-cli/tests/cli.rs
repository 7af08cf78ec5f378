use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn sysf() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("sysf").into()
}

fn fixture_path(name: &str) -> String {
    format!(
        "{}/tests/fixtures/{}.sf",
        env!("CARGO_MANIFEST_DIR"),
        name
    )
}

/// Write `source` to a temporary `bad.sf`; the directory lives as long as
/// the returned guard.
fn temp_source(source: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.sf");
    fs::write(&file, source).unwrap();
    (dir, file)
}

// ── parse command ───────────────────────────────────────────

#[test]
fn parse_prints_surface_ast() {
    sysf()
        .args(["parse", &fixture_path("length")])
        .assert()
        .success()
        .stdout(predicate::str::contains("(data Nat"))
        .stdout(predicate::str::contains("(def main"));
}

#[test]
fn parse_error_reports_span() {
    let (_dir, file) = temp_source("(def x (+ 1 2 3))");
    sysf()
        .args(["parse", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "bad.sf:8:9: parse error: operator + cannot take 3 operands",
        ));
}

// ── check command ───────────────────────────────────────────

#[test]
fn check_prints_types() {
    sysf()
        .args(["check", &fixture_path("length")])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "length : (forall 'a (-> (List 'a) Nat))",
        ))
        .stdout(predicate::str::contains("main : Nat"))
        .stdout(predicate::str::ends_with("OK\n"));
}

#[test]
fn check_llm_function() {
    sysf()
        .args(["check", &fixture_path("translate")])
        .assert()
        .success()
        .stdout(predicate::str::contains("translate : (-> String String)"));
}

#[test]
fn check_type_error_exits_nonzero() {
    let (_dir, file) = temp_source("(def x : Int \"s\")");
    sysf()
        .args(["check", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "type error: in x: type mismatch: expected Int, found String",
        ));
}

#[test]
fn check_elaboration_error_exits_nonzero() {
    let (_dir, file) = temp_source("(def main y)");
    sysf()
        .args(["check", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "bad.sf:10:11: elaboration error: undefined variable: y",
        ));
}

#[test]
fn check_missing_file() {
    sysf()
        .args(["check", "does-not-exist.sf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read does-not-exist.sf"));
}

// ── run command ─────────────────────────────────────────────

#[test]
fn run_prints_main() {
    sysf()
        .args(["run", &fixture_path("length")])
        .assert()
        .success()
        .stdout("(Succ (Succ Zero))\n");
}

#[test]
fn run_llm_function_falls_back_offline() {
    sysf()
        .args(["run", &fixture_path("translate"), "--model", "local"])
        .assert()
        .success()
        .stdout("\"hello\"\n");
}

#[test]
fn run_without_main_prints_every_declaration() {
    sysf()
        .args(["run", &fixture_path("basics")])
        .assert()
        .success()
        .stdout(predicate::str::contains("answer = 42"))
        .stdout(predicate::str::contains("greeting = \"hello, world\""))
        .stdout(predicate::str::contains("flipped = False"))
        .stdout(predicate::str::contains("id = <type-closure>"));
}

#[test]
fn run_entry() {
    sysf()
        .args(["run", &fixture_path("basics"), "--entry", "greeting"])
        .assert()
        .success()
        .stdout("\"hello, world\"\n");
}

#[test]
fn run_unknown_entry() {
    sysf()
        .args(["run", &fixture_path("basics"), "--entry", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no declaration named nope"));
}

#[test]
fn run_rejects_bad_temperature() {
    sysf()
        .args(["run", &fixture_path("translate"), "--temperature", "warm"])
        .assert()
        .failure();
}

#[test]
fn run_runtime_error() {
    let (_dir, file) = temp_source("(def main (/ 1 0))");
    sysf()
        .args(["run", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("runtime error: division by zero"));
}

#[test]
fn run_does_not_evaluate_ill_typed_program() {
    let (_dir, file) = temp_source("(def boom (/ 1 0))\n(def x : Int \"s\")");
    sysf()
        .args(["run", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("type error"))
        .stderr(predicate::str::contains("runtime error").not());
}
