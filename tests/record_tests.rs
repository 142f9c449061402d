use predicates::prelude::*;
use std::fs;

use test_env::{gantry_cmd, setup_test_env};

#[test]
fn test_add_and_list() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["add", "projects/Research.md", "start:2026-03-01", "status:Todo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added record projects/Research.md."));

    gantry_cmd(&temp_dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("projects/Research.md"))
        .stdout(predicate::str::contains("Research"))
        .stdout(predicate::str::contains("start, status"));
}

#[test]
fn test_list_empty() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records found."));
}

#[test]
fn test_add_duplicate_key_fails() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir).args(["add", "A.md", "start:2026-03-01"]).assert().success();
    gantry_cmd(&temp_dir)
        .args(["add", "A.md", "start:2026-04-01"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record already exists: A.md"));
}

#[test]
fn test_add_rejects_malformed_field() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["add", "A.md", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected field:value"));
}

#[test]
fn test_show_record() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args([
            "add",
            "--name",
            "Literature review",
            "--body",
            "Read the papers",
            "notes/Review.md",
            "start:2026-03-01",
            "progress:40",
        ])
        .assert()
        .success();

    gantry_cmd(&temp_dir)
        .args(["show", "notes/Review.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Literature review"))
        .stdout(predicate::str::contains("key: notes/Review.md"))
        .stdout(predicate::str::contains("progress"))
        .stdout(predicate::str::contains("| Read the papers"));
}

#[test]
fn test_show_missing_record() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["show", "nope.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record not found: nope.md"));
}

#[test]
fn test_set_updates_and_removes_fields() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir)
        .args(["add", "A.md", "start:2026-03-01", "status:Todo", "progress:10"])
        .assert()
        .success();
    gantry_cmd(&temp_dir)
        .args(["set", "A.md", "status:Done", "progress:"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated record A.md."));

    let output = gantry_cmd(&temp_dir).args(["list", "--json"]).output().unwrap();
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let fields = &records[0]["fields"];
    assert_eq!(fields["status"], "Done");
    assert!(fields.get("progress").is_none());
    assert_eq!(fields["start"], "2026-03-01");
}

#[test]
fn test_remove_record() {
    let (temp_dir, _guard) = setup_test_env();

    gantry_cmd(&temp_dir).args(["add", "A.md", "start:2026-03-01"]).assert().success();
    gantry_cmd(&temp_dir)
        .args(["remove", "A.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed record A.md."));
    gantry_cmd(&temp_dir)
        .args(["remove", "A.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record not found"));
}

#[test]
fn test_import_records() {
    let (temp_dir, _guard) = setup_test_env();

    let file = temp_dir.path().join("records.json");
    fs::write(
        &file,
        r#"[
            {"key": "a.md", "fields": {"start": "2026-03-01", "end": "2026-03-04"}},
            {"key": "b.md", "name": "Bee", "fields": {"start": "2026-03-05"}, "body": "notes"}
        ]"#,
    )
    .unwrap();

    gantry_cmd(&temp_dir)
        .args(["import", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 records."));

    gantry_cmd(&temp_dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.md"))
        .stdout(predicate::str::contains("Bee"));
}

#[test]
fn test_import_invalid_file() {
    let (temp_dir, _guard) = setup_test_env();

    let file = temp_dir.path().join("broken.json");
    fs::write(&file, "{ not json").unwrap();

    gantry_cmd(&temp_dir)
        .args(["import", file.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid import file"));
}
