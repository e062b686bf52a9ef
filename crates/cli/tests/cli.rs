use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SNAPSHOT: &str = r#"{
  "purpose": "Help small teams decide well",
  "values": [
    {"id": "v1", "name": "Speed", "description": ""},
    {"id": "v2", "name": "Perfect Quality", "description": ""}
  ]
}"#;

#[allow(deprecated)]
fn compass() -> Command {
    let mut cmd = Command::cargo_bin("compass").expect("binary");
    cmd.env_remove("COMPASS_LEXICON").arg("--quiet");
    cmd
}

fn run_json(args: &[&str]) -> Value {
    let output = compass().args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn setup(snapshot: &str) -> (TempDir, PathBuf) {
    let temp = tempdir().unwrap();
    let path = temp.path().join("identity.json");
    fs::write(&path, snapshot).unwrap();
    (temp, path)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn evaluate_reports_conflict_and_metrics() {
    let (_temp, path) = setup(SNAPSHOT);
    let body = run_json(&["evaluate", arg(&path)]);

    let conflicts = body["graph"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["dimension"], "SPEED vs QUALITY");
    assert_eq!(body["graph"]["nodes"].as_array().unwrap().len(), 3);
    // purpose + values out of eight required fields
    assert_eq!(body["metrics"]["completeness_score"], 25);
}

#[test]
fn evaluate_accepts_empty_and_malformed_collections() {
    let output = compass()
        .args(["evaluate", "-"])
        .write_stdin("{}")
        .output()
        .unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["graph"]["nodes"].as_array().unwrap().is_empty());
    assert_eq!(body["metrics"]["completeness_score"], 0);

    let output = compass()
        .args(["evaluate", "-"])
        .write_stdin(r#"{"values": "not a list", "goals": [42, "Grow"]}"#)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    let nodes = body["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["id"], "goal-0");
}

#[test]
fn evaluate_rejects_non_json_input() {
    compass()
        .args(["evaluate", "-"])
        .write_stdin("definitely not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("snapshot"));
}

#[test]
fn moved_node_survives_new_siblings() {
    let (_temp, path) = setup(SNAPSHOT);
    let layout = run_json(&["move-node", arg(&path), "value-v1", "--x", "100", "--y", "200"]);
    assert_eq!(layout["positions"]["value-v1"]["x"], 100.0);

    let mut snapshot = read_json(&path);
    snapshot["values"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"id": "v3", "name": "Care", "description": ""}));
    fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let rendered = run_json(&["layout", arg(&path)]);
    let nodes = rendered["nodes"].as_array().unwrap();
    let find = |id: &str| nodes.iter().find(|n| n["id"] == id).unwrap().clone();
    let v1 = find("value-v1");
    let v3 = find("value-v3");
    assert_eq!(v1["position"]["x"], 100.0);
    assert_eq!(v1["position"]["y"], 200.0);
    assert_eq!(v1["user_positioned"], true);
    assert_eq!(v3["user_positioned"], false);
    assert_ne!(v3["position"], v1["position"]);
}

#[test]
fn connect_deduplicates_either_direction() {
    let (_temp, path) = setup(SNAPSHOT);
    let first = run_json(&["connect", arg(&path), "value-v1", "value-v2"]);
    assert_eq!(first["changed"], true);
    let second = run_json(&["connect", arg(&path), "value-v2", "value-v1"]);
    assert_eq!(second["changed"], false);

    let relationships = read_json(&path)["relationships"].clone();
    assert_eq!(relationships.as_array().unwrap().len(), 1);
    assert_eq!(relationships[0]["relation_type"], "user_defined");

    compass()
        .args(["connect", arg(&path), "value-v1", "value-v9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("value-v9"));
}

#[test]
fn edit_node_rewrites_the_record() {
    let (_temp, path) = setup(SNAPSHOT);
    let body = run_json(&["edit-node", arg(&path), "value-v1", "Pace"]);
    assert_eq!(body["changed"], true);
    assert_eq!(read_json(&path)["values"][0]["name"], "Pace");

    compass()
        .args(["edit-node", arg(&path), "behavior-7", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("behavior"));
}

#[test]
fn enhance_adds_and_saves_suggestions_once() {
    let (temp, path) = setup(SNAPSHOT);
    let suggestions = temp.path().join("suggestions.json");
    fs::write(
        &suggestions,
        r#"{"suggestions": [
            {"source_id": "value-v1", "target_id": "value-v2", "relation_type": "supports", "strength": 55, "confidence": 80},
            {"source_id": "value-v1", "target_id": "value-ghost", "relation_type": "supports"}
        ]}"#,
    )
    .unwrap();

    let body = run_json(&[
        "enhance",
        arg(&path),
        "--suggestions",
        arg(&suggestions),
        "--save",
    ]);
    assert_eq!(body["added"], 1);
    assert_eq!(body["saved"], 1);
    let saved = read_json(&path)["relationships"].clone();
    assert_eq!(saved.as_array().unwrap().len(), 1);
    assert_eq!(saved[0]["auto_detected"], false);

    let again = run_json(&["enhance", arg(&path), "--suggestions", arg(&suggestions)]);
    assert_eq!(again["added"], 0);
}

#[test]
fn enhance_degrades_when_the_capability_fails() {
    let (temp, path) = setup(SNAPSHOT);
    let missing = temp.path().join("missing.json");
    let body = run_json(&["enhance", arg(&path), "--suggestions", arg(&missing)]);
    assert_eq!(body["added"], 0);
    assert_eq!(body["graph"]["nodes"].as_array().unwrap().len(), 3);
}

#[test]
fn export_emits_mermaid() {
    let (_temp, path) = setup(SNAPSHOT);
    compass()
        .args(["export", arg(&path), "--orientation", "lr"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph LR"))
        .stdout(predicate::str::contains("x--x|SPEED vs QUALITY|"));
}

#[test]
fn lexicon_comes_from_flag_or_environment() {
    let (temp, path) = setup(SNAPSHOT);
    let lexicon = temp.path().join("calm.toml");
    fs::write(&lexicon, "name = \"calm\"\noppositions = []\n").unwrap();

    let body = run_json(&["evaluate", arg(&path), "--lexicon", arg(&lexicon)]);
    assert!(body["graph"]["conflicts"].as_array().unwrap().is_empty());

    let output = compass()
        .env("COMPASS_LEXICON", &lexicon)
        .args(["evaluate", arg(&path)])
        .output()
        .unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["graph"]["conflicts"].as_array().unwrap().is_empty());

    let broken = temp.path().join("broken.json");
    fs::write(&broken, r#"{"thresholds": {"critical": 2.0}}"#).unwrap();
    compass()
        .args(["evaluate", arg(&path), "--lexicon", arg(&broken)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load lexicon"));
}

#[test]
fn snippets_are_grouped_by_type() {
    let temp = tempdir().unwrap();
    let library = temp.path().join("snippets.json");
    fs::write(
        &library,
        r#"[{"id": "a", "node_type": "value", "text": "Candor"},
            {"id": "b", "node_type": "goal", "text": "Ship monthly"}]"#,
    )
    .unwrap();
    let grouped = run_json(&["snippets", arg(&library)]);
    assert_eq!(grouped["value"][0]["text"], "Candor");
    let goals = run_json(&["snippets", arg(&library), "--node-type", "goal"]);
    assert_eq!(goals.as_array().unwrap().len(), 1);
}

#[test]
fn schema_describes_commands() {
    compass()
        .args(["schema", "command"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edit_node"));
}
