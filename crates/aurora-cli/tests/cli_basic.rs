//! Basic CLI E2E tests.
//!
//! Tests run the built `aurora` binary against a throwaway HOME and verify outputs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const TASKS: &str = r#"[
    {"id": "1", "title": "Report", "minutes": 90, "priority": "high", "due": "2026-10-18"},
    {"id": "2", "title": "Notes", "minutes": 45, "priority": "medium", "due": "2026-10-19"}
]"#;

struct Sandbox {
    home: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("temp home"),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_aurora"));
        cmd.env("HOME", self.home.path())
            .env_remove("AURORA_ENV")
            .env_remove("OPENAI_API_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        serde_json::from_str(&stdout).expect("JSON output")
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

fn titles(plan: &Value) -> Vec<String> {
    plan["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_plan_morning_scenario() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("tasks.json", TASKS);
    let plan = sandbox.run_json(&[
        "plan",
        "--tasks",
        path_str(&tasks),
        "--time",
        "morning",
        "--intensity",
        "balanced",
        "--capacity",
        "5",
    ]);

    assert_eq!(plan["strategy"], "heuristic");
    assert_eq!(
        titles(&plan),
        vec!["Plan & Setup", "Report", "Break", "Notes", "Wrap up & Review"]
    );
    assert_eq!(plan["blocks"][1]["start"], "08:00");
    assert_eq!(plan["blocks"][1]["end"], "09:30");
    assert_eq!(plan["summary"]["focus_minutes"], 135);
    assert_eq!(plan["focus_budget_minutes"], 300);
}

#[test]
fn test_plan_reads_stdin_and_scalar_intensity() {
    let sandbox = Sandbox::new();
    let mut child = sandbox
        .command()
        .args(["plan", "--tasks", "-", "--intensity", "80"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn aurora");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"tasks": [{"title": "Essay", "minutes": 100}]}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
    // 100 min at the intense multiplier
    assert_eq!(plan["blocks"][1]["start"], "08:00");
    assert_eq!(plan["blocks"][1]["end"], "09:55");
}

#[test]
fn test_plan_without_api_key_falls_back() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("tasks.json", TASKS);
    let plan = sandbox.run_json(&[
        "plan",
        "--tasks",
        path_str(&tasks),
        "--prompt",
        "Gym at 17:00",
    ]);
    assert_eq!(plan["requested"], "generative");
    assert_eq!(plan["strategy"], "heuristic");
    assert_eq!(plan["fallback"]["kind"], "generator_unavailable");
}

#[test]
fn test_plan_rejects_invalid_tasks() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("bad.json", r#"[{"id": "x", "title": "Nothing", "minutes": 0}]"#);
    let (_, stderr, code) = sandbox.run(&["plan", "--tasks", path_str(&tasks)]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("non-positive duration"));
}

#[test]
fn test_empty_task_list() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("empty.json", "[]");
    let plan = sandbox.run_json(&["plan", "--tasks", path_str(&tasks)]);
    assert!(plan["blocks"].as_array().unwrap().is_empty());

    let stub = sandbox.run_json(&["plan", "--tasks", path_str(&tasks), "--wrap-up-only"]);
    assert_eq!(titles(&stub), vec!["Plan & Setup", "Wrap up & Review"]);
}

#[test]
fn test_save_and_history_latest() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("tasks.json", TASKS);
    let plan = sandbox.run_json(&[
        "plan",
        "--tasks",
        path_str(&tasks),
        "--time",
        "afternoon",
        "--session",
        "abc",
        "--save",
    ]);
    assert_eq!(plan["saved"]["identity"]["id"], "abc");

    let latest = sandbox.run_json(&["history", "latest", "--session", "abc"]);
    assert_eq!(latest["strategy"], "heuristic");
    assert_eq!(latest["identity"]["kind"], "session");
    assert_eq!(latest["sequence"][1]["start_minute"], 13 * 60);

    // Saved preferences are reused on the next run.
    let again = sandbox.run_json(&["plan", "--tasks", path_str(&tasks), "--session", "abc"]);
    assert_eq!(again["blocks"][1]["start"], "13:00");

    let (_, stderr, code) = sandbox.run(&["history", "latest", "--user", "abc"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no stored plan"));
}

#[test]
fn test_config_get_set() {
    let sandbox = Sandbox::new();
    let (stdout, _, code) = sandbox.run(&["config", "get", "planner.max_blocks"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "12");

    let (_, _, code) = sandbox.run(&["config", "set", "planner.anchors.morning", "09:00"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = sandbox.run(&["config", "get", "planner.anchors.morning"]);
    assert_eq!(stdout.trim(), "09:00");

    let (_, stderr, code) = sandbox.run(&["config", "set", "planner.anchors.morning", "9am"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("planner.anchors.morning"));

    let (_, _, code) = sandbox.run(&["config", "get", "planner.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_anchor_moves_the_plan() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("tasks.json", TASKS);
    sandbox.run(&["config", "set", "planner.anchors.morning", "09:30"]);
    let plan = sandbox.run_json(&["plan", "--tasks", path_str(&tasks)]);
    assert_eq!(plan["blocks"][1]["start"], "09:30");
}

#[test]
fn test_prompt_command() {
    let sandbox = Sandbox::new();
    let tasks = sandbox.write("tasks.json", TASKS);
    let (stdout, _, code) = sandbox.run(&[
        "prompt",
        "--tasks",
        path_str(&tasks),
        "--prompt",
        "No meetings before 10",
    ]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("You are an elite productivity scheduler."));
    assert!(stdout.contains(r#""title":"Report""#));
    assert!(stdout.contains("\"No meetings before 10\""));
}

#[test]
fn test_task_crud_and_plan_from_store() {
    let sandbox = Sandbox::new();
    let added = sandbox.run_json(&[
        "task", "add", "Notes", "--minutes", "45", "--due", "2026-10-19", "--session", "s1",
    ]);
    assert_eq!(added["identity"]["id"], "s1");
    assert_eq!(added["task"]["completed"], false);
    sandbox.run_json(&[
        "task", "add", "Report", "--minutes", "90", "--priority", "high", "--due", "2026-10-18",
        "--id", "r1", "--notes", "draft", "--session", "s1",
    ]);
    sandbox.run_json(&["task", "add", "Laundry", "--minutes", "30", "--id", "l1", "--session", "s1"]);

    let listed = sandbox.run_json(&["task", "list", "--session", "s1"]);
    let listed_titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(listed_titles, vec!["Report", "Notes", "Laundry"]);
    assert_eq!(listed[0]["notes"], "draft");

    let updated = sandbox.run_json(&["task", "update", "l1", "--completed", "true", "--session", "s1"]);
    assert_eq!(updated["completed"], true);
    assert_eq!(sandbox.run_json(&["task", "list", "--session", "s1"]).as_array().unwrap().len(), 2);
    assert_eq!(
        sandbox.run_json(&["task", "list", "--all", "--session", "s1"]).as_array().unwrap().len(),
        3
    );

    // Open tasks feed the planner when no task file is given.
    let plan = sandbox.run_json(&["plan", "--session", "s1", "--capacity", "5"]);
    assert_eq!(
        titles(&plan),
        vec!["Plan & Setup", "Report", "Break", "Notes", "Wrap up & Review"]
    );
    assert_eq!(plan["blocks"][1]["task_id"], "r1");

    let (stdout, _, code) = sandbox.run(&["task", "delete", "r1", "--session", "s1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Task deleted: r1"));
    let (_, stderr, code) = sandbox.run(&["task", "delete", "r1", "--session", "s1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("task not found: r1"));

    let (_, stderr, code) = sandbox.run(&["task", "list", "--session", "other", "--user", "u"]);
    assert_ne!(code, 0, "{stderr}");
}

#[test]
fn test_task_add_rejects_zero_minutes_and_plan_needs_a_source() {
    let sandbox = Sandbox::new();
    let (_, stderr, code) = sandbox.run(&["task", "add", "Nothing", "--minutes", "0", "--session", "s"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("non-positive duration"), "stderr: {stderr}");

    let (_, stderr, code) = sandbox.run(&["plan"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--tasks"), "stderr: {stderr}");
}
