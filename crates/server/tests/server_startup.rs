use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
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

/// Create a minimal valid config. Remote services are never contacted
/// until a job arrives.
fn minimal_config(port: u16, blob_root: &std::path::Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[deployment]
execution_role = "arn:role/model-exec"

[blob_store]
root = "{}"

[control_plane]
url = "http://127.0.0.1:9"
api_key = "cp-secret-key"

[coordinator]
url = "http://127.0.0.1:9"
"#,
        port,
        blob_root.display()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_promoter"))
        .env("PROMOTER_CONFIG", config_path)
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
async fn test_health_and_config_endpoints() {
    let port = get_available_port();
    let blobs = TempDir::new().unwrap();
    let config_file = write_config(&minimal_config(port, blobs.path()));

    let mut server = spawn_server(config_file.path());

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(health["status"], "ok");

    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("\"api_key_configured\":true"));
    assert!(!body.contains("cp-secret-key"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_exits_with_error() {
    let mut server = spawn_server(std::path::Path::new("/nonexistent/promoter.toml"));

    let status = timeout(Duration::from_secs(10), server.wait())
        .await
        .expect("Server should exit quickly")
        .expect("Failed to wait for server");

    assert!(!status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let port = get_available_port();
    let blobs = TempDir::new().unwrap();
    let config = minimal_config(port, blobs.path()).replace(
        "execution_role = \"arn:role/model-exec\"",
        "execution_role = \"\"",
    );
    let config_file = write_config(&config);

    let mut server = spawn_server(config_file.path());

    let status = timeout(Duration::from_secs(10), server.wait())
        .await
        .expect("Server should exit quickly")
        .expect("Failed to wait for server");

    assert!(!status.success());
}
