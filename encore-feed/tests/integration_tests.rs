//! Integration tests for the encore-feed CLI

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use axum::routing::get;
use axum::Router;
use predicates::prelude::*;
use tempfile::TempDir;

struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    /// Config pointing at a closed local port, with an optional stored token
    fn new(token: Option<&str>) -> Self {
        Self::with_api("http://127.0.0.1:9/api/", token)
    }

    fn with_api(base_url: &str, token: Option<&str>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = temp_dir.path().join("store");
        let config_path = temp_dir.path().join("config.toml");

        let config_content = format!(
            r#"
[api]
base_url = "{}"
timeout = "5s"

[storage]
backend = "file"
path = "{}"
"#,
            base_url,
            store_dir.to_string_lossy().replace('\\', "\\\\")
        );
        fs::write(&config_path, config_content).unwrap();

        if let Some(token) = token {
            fs::create_dir_all(&store_dir).unwrap();
            fs::write(store_dir.join("encore.auth-token"), token).unwrap();
        }

        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("encore-feed").unwrap();
        cmd.env("ENCORE_CONFIG", &self.config_path);
        cmd.env_remove("ENCORE_API_URL");
        cmd
    }
}

/// Serve `body` as the JSON answer of `/api/Post/paged`
fn spawn_server(body: &'static str) -> String {
    let router = Router::new().route("/api/Post/paged", get(move || async move { body }));

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    format!("http://{}/api/", rx.recv().unwrap())
}

#[test]
fn test_help_lists_exit_codes() {
    let env = TestEnv::new(None);

    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIT CODES"));
}

#[test]
fn test_not_logged_in_exits_two() {
    let env = TestEnv::new(None);

    env.cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn test_zero_take_is_invalid_input() {
    let env = TestEnv::new(Some("t"));

    env.cmd().args(["--take", "0"]).assert().code(3);
}

#[test]
fn test_unreachable_server_exits_one() {
    let env = TestEnv::new(Some("t"));

    env.cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load posts"));
}

#[test]
fn test_empty_list_says_so() {
    let env = TestEnv::with_api(&spawn_server("[]"), Some("t"));

    env.cmd()
        .assert()
        .success()
        .stdout(predicate::str::diff("No posts found\n"));
}

#[test]
fn test_empty_list_as_json_is_empty_array() {
    let env = TestEnv::with_api(&spawn_server("[]"), Some("t"));

    env.cmd()
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}
