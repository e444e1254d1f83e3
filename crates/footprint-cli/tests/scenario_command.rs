use assert_cmd::Command;
use footprint_cli::commands::InputArgs;
use footprint_cli::commands::scenario::run_scenario;
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

fn summary(args: &InputArgs) -> Vec<(String, usize, i64, i64)> {
    run_scenario(args)
        .expect("scenario should succeed")
        .scenarios
        .into_iter()
        .map(|s| (s.hash, s.count, s.first_req, s.last_req))
        .collect()
}

#[test]
fn test_scenarios_with_ignored_assets() {
    let mut args = InputArgs::new(fixture("scenario.ltsv"))
        .with_groups(&["^/api/user/[^/]+$", "^/api/group/[^/]+$"]);
    args.ignores = vec!["^/static/".to_string()];

    assert_eq!(
        summary(&args),
        vec![
            ("POST /initialize".to_string(), 1, 0, 0),
            ("(GET /)*".to_string(), 1, 5, 6),
        ]
    );
}

#[test]
fn test_scenarios_keep_unignored_assets() {
    let args = InputArgs::new(fixture("scenario.ltsv"));

    assert_eq!(
        summary(&args),
        vec![
            ("POST /initialize".to_string(), 1, 0, 0),
            ("GET /static/app.js -> (GET /)*".to_string(), 1, 3, 6),
        ]
    );
}

#[test]
fn test_scenario_json_from_binary() {
    let mut cmd = Command::new(get_footprint_bin());
    cmd.arg("scenario")
        .arg(fixture("scenario.ltsv"))
        .arg("--ignore")
        .arg("^/static/")
        .arg("-f")
        .arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"hash\": \"(GET /)*\""))
        .stdout(predicate::str::contains("\"sessions\": 2"))
        .stdout(predicate::str::contains("pattern").not());
}
