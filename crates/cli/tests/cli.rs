use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const SPAM_EMAIL: &str = "Win $1000 now!! Click http://bit.ly/xyz";

fn stub_cmd(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("spam-shield");
    cmd.current_dir(dir.path())
        .env("SPAM_SHIELD__LLM__PROVIDER", "stub");
    cmd
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("spam-shield");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("history_capacity = 10"));
    assert!(content.contains("provider = \"gemini\""));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine").expect("write config");

    let mut cmd = cargo_bin_cmd!("spam-shield");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine");
}

#[test]
fn classify_outputs_valid_json() {
    let dir = TempDir::new().expect("temp dir");

    let output = stub_cmd(&dir)
        .args(["classify", "--text", SPAM_EMAIL, "--json"])
        .output()
        .expect("run classify");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["classification"], "SPAM");
    assert_eq!(value["content"], SPAM_EMAIL);
    assert!(value["id"].is_string());
    assert!(value["timestamp"].is_string());
    assert!(value["features"]["urgencyLevel"].is_u64());
    assert!(!value["reasoning"].as_array().unwrap().is_empty());
}

#[test]
fn classify_rejects_blank_input() {
    let dir = TempDir::new().expect("temp dir");

    stub_cmd(&dir)
        .args(["classify", "--text", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No text provided"));
}

#[test]
fn classify_reports_unreachable_service() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("spam-shield");
    cmd.current_dir(dir.path())
        .env("SPAM_SHIELD__LLM__PROVIDER", "gemini")
        .env("SPAM_SHIELD__LLM__GEMINI__API_KEY_ENV", "SPAM_SHIELD_CLI_TEST_NO_KEY")
        .env_remove("SPAM_SHIELD_CLI_TEST_NO_KEY")
        .args(["classify", "--text", SPAM_EMAIL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [unreachable]"));
}

#[test]
fn session_analyzes_and_lists_history() {
    let dir = TempDir::new().expect("temp dir");

    let script = format!(
        ":analyze\n{}\n:analyze\n:clear-input\nHi team, lunch is at noon.\n:analyze\n:history\n:stats\n:quit\n",
        SPAM_EMAIL
    );

    stub_cmd(&dir)
        .arg("session")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("SPAM Detected  [HIGH RISK]"))
        .stdout(predicate::str::contains("Hi team, lunch is at noon."))
        .stdout(predicate::str::contains("Recent History"))
        .stdout(predicate::str::contains("Safe: 0  Spam/Phish: 2"))
        .stderr(predicate::str::contains("Nothing to analyze"));
}

#[test]
fn session_history_is_capped_and_clearable() {
    let dir = TempDir::new().expect("temp dir");

    let mut script = String::new();
    for i in 0..3 {
        script.push_str(&format!(":clear-input\nemail number {}\n:analyze\n", i));
    }
    script.push_str(":history\n:select 2\n:clear-history\n:history\n:show\n");

    let output = stub_cmd(&dir)
        .args(["session", "--history-capacity", "2", "--json"])
        .write_stdin(script)
        .output()
        .expect("run session");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");

    assert!(stdout.contains("email number 2"));
    assert!(!stdout.contains("email number 0..."));
    assert!(stdout.contains("No recent analyses"));

    // :select 2 and :show both print the record for "email number 1"
    let selected: Vec<Value> = stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(|value| value["content"] == "email number 1")
        .collect();
    assert_eq!(selected.len(), 3);
    assert_eq!(selected[1], selected[2]);
}

#[test]
fn session_keeps_colon_lines_as_email_text() {
    let dir = TempDir::new().expect("temp dir");

    let script = ":Subject: invoice overdue\n:) pay today\n::analyze this\n:input\n:quit\n";

    stub_cmd(&dir)
        .arg("session")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            ":Subject: invoice overdue\n:) pay today\n:analyze this",
        ))
        .stderr(predicate::str::contains("unknown command").not());
}
