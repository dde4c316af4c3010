mod common;

use common::{loops, perfect, schedule, stall_turn};
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    schedule_path: PathBuf,
    flight_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let schedule_path = dir.path().join("schedule.json");
        let flight_path = dir.path().join("flight.json");

        schedule().save_to_file(&schedule_path).unwrap();
        let flights = vec![perfect(&loops()), perfect(&stall_turn())];
        std::fs::write(&flight_path, serde_json::to_string(&flights).unwrap()).unwrap();

        Self {
            dir,
            schedule_path,
            flight_path,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn flightscore(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flightscore"))
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

#[test]
fn score_writes_results() {
    let ctx = TestContext::new();
    let out = ctx.path("results.json");
    let output = flightscore(&[
        "score",
        "--schedule",
        ctx.schedule_path.to_str().unwrap(),
        "--flight",
        ctx.flight_path.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
        "--details",
        "--log-level",
        "warn",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("TOTAL"));
    assert!(stdout.contains("loops"));

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(results["manoeuvres"].as_array().unwrap().len(), 2);
    assert!(results["total"].as_f64().unwrap() > 0.0);
}

#[test]
fn score_with_config_file() {
    let ctx = TestContext::new();
    let cfg = ctx.path("config.json");
    std::fs::write(&cfg, r#"{"scoring": {"difficulty": 1}}"#).unwrap();
    let output = flightscore(&[
        "score",
        "-s",
        ctx.schedule_path.to_str().unwrap(),
        "-f",
        ctx.flight_path.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert!(output.status.success());
}

#[test]
fn bad_config_file_is_fatal() {
    let ctx = TestContext::new();
    let cfg = ctx.path("config.json");
    std::fs::write(&cfg, r#"{"scoring": {"difficulty": 9}}"#).unwrap();
    let output = flightscore(&[
        "score",
        "-s",
        ctx.schedule_path.to_str().unwrap(),
        "-f",
        ctx.flight_path.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FATAL"));
}

#[test]
fn template_is_written_as_json() {
    let ctx = TestContext::new();
    let out = ctx.path("template.json");
    let output = flightscore(&[
        "template",
        "-s",
        ctx.schedule_path.to_str().unwrap(),
        "-m",
        "stall",
        "--heading",
        "left",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let tp: flightscore::state::State =
        serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(tp.element_names().len(), 7);
}

#[test]
fn built_in_schedule_is_found_by_name() {
    let ctx = TestContext::new();
    let out = ctx.path("top_hat.json");
    let output = flightscore(&[
        "template",
        "-s",
        "f3a_p23",
        "-m",
        "tHat",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let tp: flightscore::state::State =
        serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(tp.element_names().first().map(String::as_str), Some("entry_line"));
}

#[test]
fn unknown_manoeuvre_is_fatal() {
    let ctx = TestContext::new();
    let output = flightscore(&[
        "template",
        "-s",
        ctx.schedule_path.to_str().unwrap(),
        "-m",
        "missing",
    ]);
    assert!(!output.status.success());
}

#[test]
fn criteria_table_lists_filtered_keys() {
    let output = flightscore(&["criteria", "--filter", "inter."]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("inter.radius"));
    assert!(!stdout.contains("intra.angle"));
}
