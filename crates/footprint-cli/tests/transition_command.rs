use assert_cmd::Command;
use footprint_cli::commands::InputArgs;
use footprint_cli::commands::transition::run_transition;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_footprint_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("footprint")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_transition_matrix() {
    let t = run_transition(&InputArgs::new(fixture("transition.ltsv")))
        .expect("transition should succeed");

    assert_eq!(t.count("", "POST /initialize"), 1);
    assert_eq!(t.count("", "GET /"), 3);
    assert_eq!(t.count("GET /", "GET /"), 1);
    assert_eq!(t.count("GET /", ""), 3);
    assert_eq!(t.count("POST /initialize", ""), 1);

    assert_eq!(t.totals["POST /initialize"], 1);
    assert_eq!(t.totals["GET /"], 4);
}

#[test]
fn test_transition_flow_balance() {
    let t = run_transition(&InputArgs::new(fixture("transition.ltsv"))).unwrap();

    assert_eq!(t.outgoing(""), t.sessions);
    assert_eq!(t.incoming(""), t.sessions);
    assert_eq!(t.outgoing("GET /"), t.incoming("GET /"));
}

#[test]
fn test_transition_table_from_binary() {
    let mut cmd = Command::new(get_footprint_bin());
    cmd.arg("transition")
        .arg(fixture("transition.ltsv"))
        .arg("--format")
        .arg("table");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("from,to,count\n"))
        .stdout(predicate::str::contains(",GET /,3\n"))
        .stdout(predicate::str::contains("GET /,,3\n"))
        .stdout(predicate::str::contains("POST /initialize,,1\n"));
}

#[test]
fn test_transition_missing_file() {
    let mut cmd = Command::new(get_footprint_bin());
    cmd.arg("transition").arg("does-not-exist.ltsv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}
