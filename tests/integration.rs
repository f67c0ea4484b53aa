use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rq_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rq"))
}

const ORDERS_CSV: &str = "Identifier,Location,Action,Description,Date,Cost\n\
1234567890,100 MAIN STREET,REPLACE BELT,worn belt,2025-06-24,120\n\
1234567891,5 OAK AVENUE,CLEAN FILTER,dusty filter,2025-06-25,40\n\
1234567892,9 ELM ROAD,REPLACE BELT,snapped belt,2025-06-26,80\n";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("orders.csv"), ORDERS_CSV).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/rq.sqlite"

[llm]
provider = "disabled"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("rq.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rq(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rq_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rq binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn csv_path(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files/orders.csv")
        .display()
        .to_string()
}

fn ingested() -> (TempDir, PathBuf) {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_rq(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let (stdout, stderr, success) = run_rq(&config_path, &["ingest", &csv_path(&config_path)]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("records: 3"), "{}", stdout);
    (tmp, config_path)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_rq(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/rq.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    assert!(run_rq(&config_path, &["init"]).2);
    assert!(run_rq(&config_path, &["init"]).2);
}

#[test]
fn test_missing_config_fails() {
    let (stdout, stderr, success) = run_rq(Path::new("/nonexistent/rq.toml"), &["init"]);
    assert!(!success, "stdout: {}", stdout);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_ask_without_dataset() {
    let (_tmp, config_path) = setup_test_env();
    run_rq(&config_path, &["init"]);
    let (stdout, _, success) = run_rq(&config_path, &["ask", "how many issues are there?"]);
    assert!(!success);
    assert!(stdout.contains("no active dataset"), "{}", stdout);
}

#[test]
fn test_ingest_twice_is_skipped() {
    let (_tmp, config_path) = ingested();
    let (stdout, _, success) = run_rq(&config_path, &["ingest", &csv_path(&config_path)]);
    assert!(success);
    assert!(stdout.contains("already imported"), "{}", stdout);

    let (stdout, _, success) = run_rq(&config_path, &["datasets"]);
    assert!(success);
    assert_eq!(stdout.matches("orders.csv").count(), 1, "{}", stdout);
}

#[test]
fn test_ask_identifier() {
    let (_tmp, config_path) = ingested();
    let (stdout, stderr, success) = run_rq(
        &config_path,
        &["ask", "Give me the identifier for main street"],
    );
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("1234567890"), "{}", stdout);
    assert!(stdout.contains("100 MAIN STREET"), "{}", stdout);
}

#[test]
fn test_ask_count_and_sum() {
    let (_tmp, config_path) = ingested();
    let (stdout, _, _) = run_rq(&config_path, &["ask", "How many issues are there?"]);
    assert_eq!(stdout.trim(), "There are 3 issues reported.");

    let (stdout, _, _) = run_rq(&config_path, &["ask", "what is the total cost"]);
    assert_eq!(stdout.trim(), "The total Cost is 240 across 3 records.");
}

#[test]
fn test_ask_date_json() {
    let (_tmp, config_path) = ingested();
    let (stdout, stderr, success) = run_rq(
        &config_path,
        &["ask", "What happened on 2025-06-25?", "--json"],
    );
    assert!(success, "ask failed: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["intent"]["kind"], "date");
    assert_eq!(json["answered_by"], "pipeline");
    assert_eq!(json["matches"].as_array().unwrap().len(), 1);
    assert!(json["answer"].as_str().unwrap().contains("CLEAN FILTER"));
}

#[test]
fn test_ask_no_results_diagnostic() {
    let (_tmp, config_path) = ingested();
    let (stdout, _, success) = run_rq(&config_path, &["ask", "where is 77 pine drive"]);
    assert!(success);
    assert!(stdout.contains("No Results"), "{}", stdout);
    assert!(stdout.contains("77 PINE DRIVE"), "{}", stdout);
}

#[test]
fn test_ask_unknown_dataset_fails() {
    let (_tmp, config_path) = ingested();
    let (_, stderr, success) = run_rq(
        &config_path,
        &["ask", "how many issues", "--dataset", "does-not-exist"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown dataset"), "{}", stderr);
}
