//! Sandbox execution tests against a real Docker daemon.
//!
//! Ignored by default; run with `cargo test -- --ignored` on a host with
//! Docker and a python3 image available. Uses `python:3.12-slim` so no
//! project-specific image build is needed.

use std::time::Duration;

use optiflow_core::messages::ExecutionStatus;
use optiflow_sandbox::engine::{CodeSandbox, SandboxConfig};

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

fn config() -> SandboxConfig {
    SandboxConfig::with_image("python:3.12-slim")
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn hello_world_executes_cleanly() {
    let sandbox = CodeSandbox::new(config()).await.unwrap();
    let outcome = sandbox.run("print('hello world', end='')").await;

    assert_eq!(outcome.status_code, 0);
    assert_eq!(outcome.stdout, "hello world");
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.status, ExecutionStatus::Executed);
    assert!(outcome.generated_files.is_empty());
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn nonzero_exit_code_is_reported() {
    let sandbox = CodeSandbox::new(config()).await.unwrap();
    let outcome = sandbox.run("import sys; sys.exit(42)").await;

    assert_eq!(outcome.status_code, 42);
    assert_eq!(outcome.status, ExecutionStatus::Failed);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn long_running_code_is_killed_at_the_deadline() {
    let mut limited = config();
    limited.timeout = Duration::from_secs(1);
    let sandbox = CodeSandbox::new(limited).await.unwrap();

    let outcome = sandbox.run("import time; time.sleep(3)").await;

    assert_eq!(outcome.status_code, -1);
    assert_eq!(outcome.status, ExecutionStatus::Failed);
    assert!(outcome.stderr.contains("Timeout error"));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn png_written_to_output_is_captured() {
    let sandbox = CodeSandbox::new(config()).await.unwrap();
    let code = r#"
with open('/output/test_image.png', 'wb') as f:
    f.write(bytes([0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) + b'payload')
print('written')
"#;
    let outcome = sandbox.run(code).await;

    assert_eq!(outcome.status, ExecutionStatus::Executed);
    let bytes = outcome
        .generated_files
        .get("test_image.png")
        .expect("png should be captured");
    assert!(bytes.starts_with(PNG_MAGIC));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn network_access_is_disabled() {
    let sandbox = CodeSandbox::new(config()).await.unwrap();
    let code = r#"
import socket
try:
    socket.create_connection(("1.1.1.1", 80), timeout=2)
    print("connected")
except OSError:
    print("blocked", end='')
"#;
    let outcome = sandbox.run(code).await;

    assert_eq!(outcome.status, ExecutionStatus::Executed);
    assert_eq!(outcome.stdout, "blocked");
}
