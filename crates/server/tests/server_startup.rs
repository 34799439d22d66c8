use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config rooted in `dir`
fn minimal_config(port: u16, dir: &Path, pipeline: &str) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
data_dir = "{}"
database_path = "{}"

[pipeline]
{}
"#,
        port,
        dir.join("data").display(),
        dir.join("phenorun.db").display(),
        pipeline,
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_phenorun"))
        .env("PHENORUN_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let temp_file = write_config(&minimal_config(port, dir.path(), r#"command = "true""#));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let pipeline = r#"command = "true"
args = ["--api-key", "hunter2"]"#;
    let temp_file = write_config(&minimal_config(port, dir.path(), pipeline));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["pipeline"]["command"], "true");
    assert_eq!(json["pipeline"]["arg_count"], 2);
    assert_eq!(json["server"]["port"], port);
    assert!(!json.to_string().contains("hunter2"));

    server.kill().await.ok();
}

/// Runs a real job through the binary with a shell pipeline command.
#[cfg(unix)]
#[tokio::test]
async fn test_job_runs_pipeline_command() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let pipeline = r#"command = "sh"
args = ["-c", "echo group,items; echo $PHENORUN_GROUP_ID,$#", "pipeline"]"#;
    let temp_file = write_config(&minimal_config(port, dir.path(), pipeline));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let base = format!("http://127.0.0.1:{}/api/v1", port);
    let response = client
        .post(format!("{}/jobs/carol", base))
        .json(&json!({
            "items": ["a", "b", "c"],
            "thread_count": 2,
            "owner": "carol",
            "output_name": "exp"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 202);

    let mut job = serde_json::Value::Null;
    for _ in 0..100 {
        job = client
            .get(format!("{}/jobs/carol", base))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        if job["status"] == "completed" || job["status"] == "failed" {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(job["status"], "completed", "job: {}", job);
    assert_eq!(job["summary"]["artifacts_merged"], 3);

    let merged = job["summary"]["merged_output"].as_str().unwrap();
    let content = std::fs::read_to_string(merged).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("group,items"));
    assert_eq!(lines.count(), 3);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phenorun"))
            .env("PHENORUN_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_pipeline_section_exits_with_error() {
    let config_without_pipeline = r#"
[server]
port = 8080
"#;
    let temp_file = write_config(config_without_pipeline);

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phenorun"))
            .env("PHENORUN_CONFIG", temp_file.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
