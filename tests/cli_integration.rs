//! Drives the `minigrid-sim` binary end to end.

mod common;

use std::process::{Command, Output};

use common::scratch_dir;

#[derive(Debug)]
struct Summary {
    generation_kwh: f64,
    demand_kwh: f64,
    unmet_kwh: f64,
    peer_traded_kwh: f64,
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_minigrid-sim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("minigrid-sim process should run")
}

fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

fn parse_metric(stdout: &str, label: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing summary line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid summary format for line `{line}`"));
    let number = raw.split_whitespace().next().unwrap_or("");
    number
        .trim_start_matches('$')
        .parse()
        .unwrap_or_else(|_| panic!("non-numeric value in `{line}`"))
}

fn parse_summary(stdout: &str) -> Summary {
    Summary {
        generation_kwh: parse_metric(stdout, "Generation:"),
        demand_kwh: parse_metric(stdout, "Demand:"),
        unmet_kwh: parse_metric(stdout, "Unmet demand:"),
        peer_traded_kwh: parse_metric(stdout, "Peer traded:"),
    }
}

#[test]
fn presets_run_and_differ() {
    let federation = parse_summary(&run_ok(&["--preset", "federation", "--days", "2", "--quiet"]));
    let single = parse_summary(&run_ok(&["--preset", "single_grid", "--days", "2", "--quiet"]));
    let undersized = parse_summary(&run_ok(&["--preset", "undersized", "--days", "2", "--quiet"]));

    assert!(federation.demand_kwh > single.demand_kwh, "{federation:?} vs {single:?}");
    assert_eq!(single.peer_traded_kwh, 0.0);
    assert!(undersized.generation_kwh < federation.generation_kwh);
    for s in [&federation, &single, &undersized] {
        assert_eq!(s.unmet_kwh, 0.0, "{s:?}");
    }
}

#[test]
fn scenario_files_run() {
    for path in [
        "scenarios/federation.toml",
        "scenarios/undersized.toml",
        "scenarios/single_grid.toml",
    ] {
        let stdout = run_ok(&["--scenario", path, "--days", "1", "--quiet"]);
        let summary = parse_summary(&stdout);
        assert!(summary.demand_kwh > 0.0, "{path}: {summary:?}");
    }
}

#[test]
fn hourly_lines_printed_unless_quiet() {
    let loud = run_ok(&["--preset", "single_grid", "--days", "1"]);
    assert_eq!(loud.lines().filter(|l| l.starts_with("h=")).count(), 24);

    let quiet = run_ok(&["--preset", "single_grid", "--days", "1", "--quiet"]);
    assert_eq!(quiet.lines().filter(|l| l.starts_with("h=")).count(), 0);
}

#[test]
fn same_seed_same_output() {
    let a = run_ok(&["--preset", "federation", "--days", "1", "--seed", "5"]);
    let b = run_ok(&["--preset", "federation", "--days", "1", "--seed", "5"]);
    let c = run_ok(&["--preset", "federation", "--days", "1", "--seed", "6"]);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn initial_state_is_json() {
    let stdout = run_ok(&["--preset", "federation", "--days", "1", "--quiet", "--initial-state"]);
    let start = stdout.find('[').expect("json array");
    let end = stdout.find("\n]").expect("end of json array") + 2;
    let state: serde_json::Value = serde_json::from_str(&stdout[start..end]).expect("valid json");
    assert_eq!(state.as_array().map(Vec::len), Some(3));
    assert_eq!(state[2]["house_count"], 2);
}

#[test]
fn log_dir_receives_csv_files() {
    let dir = scratch_dir("cli-logs");
    let dir_arg = dir.to_string_lossy().to_string();
    run_ok(&["--preset", "single_grid", "--days", "1", "--quiet", "--log-dir", &dir_arg]);

    assert!(dir.join("simulation_log.csv").exists());
    assert!(dir.join("mini_grid_log_1.csv").exists());
    for house in 0..4 {
        assert!(dir.join(format!("house_log_grid_1_house_{house}.csv")).exists());
    }
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unknown_preset_fails() {
    let output = run(&["--preset", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn invalid_scenario_is_rejected_before_running() {
    let dir = scratch_dir("cli-invalid");
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let path = dir.join("bad.toml");
    std::fs::write(
        &path,
        "[[grids]]\navg_sunlight_hours = 30.0\nsell_price = 0.0\n[[grids.houses]]\n",
    )
    .expect("write scenario");

    let output = run(&["--scenario", &path.to_string_lossy()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("grids[0]"), "stderr: {stderr}");
    assert!(String::from_utf8_lossy(&output.stdout).lines().all(|l| !l.starts_with("h=")));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn scenario_and_preset_conflict() {
    let output = run(&["--preset", "federation", "--scenario", "scenarios/federation.toml"]);
    assert!(!output.status.success());
}
