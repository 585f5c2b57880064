use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Credentials that would otherwise let a developer's shell reach a real API.
const CREDENTIAL_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "DASHSCOPE_API_KEY",
    "QIANFAN_API_KEY",
    "ZHIPU_API_KEY",
    "MOONSHOT_API_KEY",
    "ARK_API_KEY",
    "GITHUB_TOKEN",
];

fn icongw_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("icongw");
    path
}

fn write_icon(dir: &Path, name: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(format!("{}.svg", name)),
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1em\" height=\"1em\" viewBox=\"0 0 1024 1024\">\n  <path d=\"M0 0h1024v1024H0z\"/>\n</svg>\n",
    )
    .unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let icons = root.join("icons");
    write_icon(&icons.join("element-plus"), "delete");
    write_icon(&icons.join("element-plus"), "delete-location");
    write_icon(&icons.join("element-plus"), "edit");
    write_icon(&icons.join("ant-design/outlined"), "delete");
    write_icon(&icons.join("ant-design/filled"), "delete");

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Every remote endpoint points at the discard port so nothing leaves
    // the machine.
    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[libraries]
root = "{}/icons"
prefer_local = true
timeout_secs = 2

[libraries.remote]
element_plus_url = "http://127.0.0.1:9/element-plus"
ant_design_url = "http://127.0.0.1:9/ant-design"

[keyword_index]
url = "http://127.0.0.1:9"
timeout_secs = 2

[generation]
timeout_secs = 2
default_count = 4
"#,
        root.display()
    );

    let config_path = config_dir.join("icons.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_icongw(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = icongw_binary();
    let mut command = Command::new(&binary);
    for var in CREDENTIAL_VARS {
        command.env_remove(var);
    }
    let output = command
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run icongw binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn parse_records(stdout: &str) -> Vec<serde_json::Value> {
    serde_json::from_str(stdout)
        .unwrap_or_else(|e| panic!("expected JSON records, got {:?}: {}", stdout, e))
}

#[test]
fn test_search_local_table() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_icongw(&config_path, &["search", "delete"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.starts_with("| source | name | svg |"));
    assert!(stdout.contains("| element-plus | Delete |"));
    assert!(stdout.contains("| element-plus | DeleteLocation |"));
    assert!(stdout.contains("| ant-design | DeleteOutlined |"));
    assert!(stdout.contains("| ant-design | DeleteFilled |"));
}

#[test]
fn test_search_exact_style_and_format() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_icongw(
        &config_path,
        &[
            "search",
            "delete,edit",
            "--exact",
            "--style",
            "ant-design",
            "--format",
            "filled",
            "--json",
        ],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let records = parse_records(&stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["source"], "ant-design");
    assert_eq!(records[0]["name"], "DeleteFilled");
    assert_eq!(records[0]["code"], 0);
    assert_eq!(records[0]["model"], "none");
    let raw = records[0]["rawSvg"].as_str().unwrap();
    assert!(raw.contains("width=\"30\""));
    assert!(!raw.contains('\n'));
}

#[test]
fn test_search_no_match_prints_placeholder_row() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_icongw(&config_path, &["search", "zebra", "--local"]);
    assert!(success);
    assert!(stdout.contains("no icons found"));
}

#[test]
fn test_search_remote_failure_is_not_an_error() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_icongw(&config_path, &["search", "delete", "--remote"]);
    assert!(success, "remote failures must degrade: stderr={}", stderr);
    assert!(stdout.contains("no icons found"));
    assert!(stderr.contains("suppressed"));
}

#[test]
fn test_search_invalid_format_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_icongw(&config_path, &["search", "delete", "--format", "thin"]);
    assert!(!success);
    assert!(stderr.contains("invalid format"));
}

#[test]
fn test_generate_library_hit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_icongw(
        &config_path,
        &["generate", "a red trash button", "--name", "edit", "--json"],
    );
    assert!(success, "generate failed: stdout={}, stderr={}", stdout, stderr);

    let records = parse_records(&stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["source"], "element-plus");
    assert_eq!(records[0]["name"], "Edit");
}

#[test]
fn test_generate_falls_back_to_stock() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_icongw(&config_path, &["generate", "a lighthouse at dusk", "--json"]);
    assert!(success, "generate failed: stdout={}, stderr={}", stdout, stderr);

    let records = parse_records(&stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["source"], "stock");
    assert_eq!(records[0]["code"], -1);
    assert_eq!(records[0]["name"], "aLighthouseAt");
    assert_eq!(records[0]["description"], "a lighthouse at dusk");
}

#[test]
fn test_generate_empty_description_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_icongw(&config_path, &["generate", "   "]);
    assert!(!success);
    assert!(stderr.contains("description must not be empty"));
}

#[test]
fn test_category_uses_default_count() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_icongw(&config_path, &["category", "office", "--json"]);
    assert!(success, "category failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(parse_records(&stdout).len(), 4);
}

#[test]
fn test_category_explicit_count() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_icongw(
        &config_path,
        &["category", "weather", "--count", "2", "--json"],
    );
    assert!(success);
    let records = parse_records(&stdout);
    assert_eq!(records.len(), 2);
    assert_ne!(
        (&records[0]["source"], &records[0]["name"]),
        (&records[1]["source"], &records[1]["name"])
    );
}

#[test]
fn test_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_icongw(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("element-plus"));
    assert!(stdout.contains("LOCAL + REMOTE"));
    assert!(stdout.contains("iconify"));
    assert!(stdout.contains("NO CREDENTIAL (OPENAI_API_KEY)"));
}

#[test]
fn test_invalid_config_errors() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[keyword_index]\nlimit = 9\n").unwrap();

    let (_, stderr, success) = run_icongw(&bad, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("keyword_index.limit"));
}

#[test]
fn test_unknown_priority_provider_errors() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[generation]\npriority = [\"skynet\"]\n").unwrap();

    let (_, stderr, success) = run_icongw(&bad, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("unknown provider"));
}
