use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;
use std::fs;

use test_env::{gantry_cmd, setup_test_env};

/// Three records: a plan, a build that depends on it, and a launch milestone
fn seed_project(temp_dir: &TempDir) {
    let file = temp_dir.path().join("seed.json");
    fs::write(
        &file,
        r#"[
            {"key": "work/Build.md", "fields": {
                "start": "2026-03-10", "due": "2026-03-20", "progress": 25,
                "status": "Doing", "depends-on": "[[Plan]]"}},
            {"key": "work/Plan.md", "fields": {
                "start": "2026-03-01", "due": "2026-03-05", "progress": "100%",
                "status": "Done"}},
            {"key": "work/Launch.md", "fields": {
                "start": "2026-03-25", "due": "2026-03-25", "status": "Todo"}}
        ]"#,
    )
    .unwrap();
    gantry_cmd(temp_dir)
        .args(["import", file.to_str().unwrap()])
        .assert()
        .success();
}

fn timeline_json(temp_dir: &TempDir, extra: &[&str]) -> Value {
    let output = gantry_cmd(temp_dir)
        .args(["timeline", "--json"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn task_ids(timeline: &Value) -> Vec<String> {
    timeline["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

fn find<'a>(timeline: &'a Value, id: &str) -> &'a Value {
    timeline["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == id)
        .unwrap()
}

#[test]
fn test_timeline_json_orders_dependencies_first() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    let timeline = timeline_json(&temp_dir, &[]);
    assert_eq!(
        task_ids(&timeline),
        vec!["task:work/Plan.md", "task:work/Launch.md", "task:work/Build.md"]
    );

    let build = find(&timeline, "task:work/Build.md");
    assert_eq!(build["name"], "Build");
    assert_eq!(build["start"], "2026-03-10");
    assert_eq!(build["end"], "2026-03-20");
    assert_eq!(build["progress"], 25);
    assert_eq!(build["dependencies"], serde_json::json!(["task:work/Plan.md"]));

    let plan = find(&timeline, "task:work/Plan.md");
    assert_eq!(plan["progress"], 100);

    let launch = find(&timeline, "task:work/Launch.md");
    assert_eq!(launch["is_milestone"], true);
    assert_eq!(launch["end"], "2026-03-26");
}

#[test]
fn test_timeline_colors_by_category() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    let timeline = timeline_json(&temp_dir, &[]);
    // Buckets follow first appearance: Doing, Done, Todo
    assert_eq!(find(&timeline, "task:work/Build.md")["color_bucket"], 0);
    assert_eq!(find(&timeline, "task:work/Plan.md")["color_bucket"], 1);
    assert_eq!(find(&timeline, "task:work/Launch.md")["color_bucket"], 2);
}

#[test]
fn test_timeline_grouped_adds_headers() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    let timeline = timeline_json(&temp_dir, &["--group-by", "status"]);
    assert_eq!(
        task_ids(&timeline),
        vec![
            "group:Doing",
            "task:work/Build.md",
            "group:Done",
            "task:work/Plan.md",
            "group:Todo",
            "task:work/Launch.md",
        ]
    );

    let header = find(&timeline, "group:Doing");
    assert_eq!(header["start"], "2026-03-10");
    assert_eq!(header["end"], "2026-03-20");
    assert_eq!(header["source"], Value::Null);

    // The dependency on Plan crosses groups and still resolves
    assert_eq!(
        find(&timeline, "task:work/Build.md")["dependencies"],
        serde_json::json!(["task:work/Plan.md"])
    );
}

#[test]
fn test_timeline_hides_progress() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    let timeline = timeline_json(&temp_dir, &["--no-progress"]);
    assert_eq!(timeline["config"]["show_progress"], false);
    assert_eq!(find(&timeline, "task:work/Build.md")["progress"], 0);
}

#[test]
fn test_timeline_text_output() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["timeline", "--granularity", "day"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-03-01 .. 2026-03-26  (day view, 3 tasks)"))
        .stdout(predicate::str::contains("Build"))
        .stdout(predicate::str::contains("← Plan"))
        .stdout(predicate::str::contains("◆"))
        .stdout(predicate::str::contains(" 25%"));
}

#[test]
fn test_timeline_rejects_unknown_granularity() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["timeline", "--granularity", "fortnight"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid granularity"));
}

#[test]
fn test_timeline_needs_configuration_without_dates() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["add", "Notes.md", "status:Todo", "owner:Sam"])
        .assert()
        .success();

    gantry_cmd(&temp_dir)
        .args(["timeline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Timeline needs configuration"));

    let timeline = timeline_json(&temp_dir, &[]);
    assert_eq!(timeline["needs_configuration"], true);
}

#[test]
fn test_pinned_start_role_is_used() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["add", "A.md", "kickoff:2026-05-04", "wrapup:2026-05-08"])
        .assert()
        .success();
    gantry_cmd(&temp_dir)
        .args(["config", "set", "role.start", "wrapup"])
        .assert()
        .success();

    let timeline = timeline_json(&temp_dir, &[]);
    let task = find(&timeline, "task:A.md");
    assert_eq!(task["start"], "2026-05-08");
}

#[test]
fn test_detect_report() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["detect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("start (detected)"))
        .stdout(predicate::str::contains("due (detected)"))
        .stdout(predicate::str::contains("depends-on (detected)"))
        .stdout(predicate::str::contains("status (detected)"));

    let output = gantry_cmd(&temp_dir).args(["detect", "--json"]).output().unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let fields: Vec<&str> = report["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["start", "due", "progress", "status", "depends-on"]);
}

#[test]
fn test_move_writes_dates_back() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["move", "work/Build.md", "2026-03-12", "2026-03-24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated work/Build.md (2 fields)."));

    let timeline = timeline_json(&temp_dir, &[]);
    let build = find(&timeline, "task:work/Build.md");
    assert_eq!(build["start"], "2026-03-12");
    assert_eq!(build["end"], "2026-03-24");
}

#[test]
fn test_move_keeps_duration_and_milestones() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["move", "task:work/Launch.md", "2026-04-01"])
        .assert()
        .success();

    let output = gantry_cmd(&temp_dir).args(["list", "--json"]).output().unwrap();
    let records: Value = serde_json::from_slice(&output.stdout).unwrap();
    let launch = records
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["key"] == "work/Launch.md")
        .unwrap();
    assert_eq!(launch["fields"]["start"], "2026-04-01");
    assert_eq!(launch["fields"]["due"], "2026-04-01");
}

#[test]
fn test_move_rejects_inverted_range() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["move", "work/Build.md", "2026-03-20", "2026-03-10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("before start date"));
}

#[test]
fn test_move_unknown_task() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["move", "work/Missing.md", "2026-03-20"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Task not found on the timeline"));
}

#[test]
fn test_progress_writes_back() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["progress", "work/Build.md", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated work/Build.md (1 field)."));

    gantry_cmd(&temp_dir)
        .args(["progress", "work/Build.md", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes to work/Build.md."));

    let timeline = timeline_json(&temp_dir, &[]);
    assert_eq!(find(&timeline, "task:work/Build.md")["progress"], 60);
}

#[test]
fn test_progress_out_of_range() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["progress", "work/Build.md", "120"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("between 0 and 100"));
}

#[test]
fn test_group_header_is_not_editable() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);
    gantry_cmd(&temp_dir)
        .args(["config", "set", "group_by", "status"])
        .assert()
        .success();

    gantry_cmd(&temp_dir)
        .args(["progress", "group:Doing", "50"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a record task"));
}

#[test]
fn test_click_opens_record() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["click", "task:work/Plan.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key: work/Plan.md"));
}

#[test]
fn test_new_at_creates_record() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["new-at", "2026-04-10", "work/Retro.md", "--name", "Retro"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created record work/Retro.md."));

    let timeline = timeline_json(&temp_dir, &[]);
    let retro = find(&timeline, "task:work/Retro.md");
    assert_eq!(retro["name"], "Retro");
    assert_eq!(retro["start"], "2026-04-10");
    assert_eq!(retro["is_milestone"], true);
}

#[test]
fn test_new_at_existing_key_fails() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["new-at", "2026-04-10", "work/Plan.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record already exists"));
}

#[test]
fn test_config_set_show_unset() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["config", "set", "view.granularity", "month"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set view.granularity = month."));

    gantry_cmd(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"view\.granularity\s+month").unwrap());

    gantry_cmd(&temp_dir)
        .args(["config", "unset", "view.granularity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unset view.granularity."));

    gantry_cmd(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"view\.granularity\s+week").unwrap());
}

#[test]
fn test_config_rejects_bad_values() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["config", "set", "view.bar_thickness", "80"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("between 16 and 60"));

    gantry_cmd(&temp_dir)
        .args(["config", "set", "role.owner", "who"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown role 'owner'"));

    gantry_cmd(&temp_dir)
        .args(["config", "set", "theme", "dark"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown setting 'theme'"));
}

#[test]
fn test_config_warns_on_unknown_field() {
    let (temp_dir, _guard) = setup_test_env();
    seed_project(&temp_dir);

    gantry_cmd(&temp_dir)
        .args(["config", "set", "role.end", "dew"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Did you mean 'due'?"));
}
