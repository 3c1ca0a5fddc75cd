#![deny(unused)]
//! Sandbox worker entry point.
//!
//! Consumes code jobs and executes them in isolated containers. Exits
//! immediately when the container runtime is unavailable: a running worker
//! with a broken sandbox would silently fail every job.

use optiflow_core::config::{BrokerSettings, SandboxSettings};
use optiflow_sandbox::{CodeSandbox, SandboxConfig, SandboxWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    optiflow_core::telemetry::init(rust_log.as_deref(), false)?;

    tracing::info!("starting sandbox worker v{}", env!("CARGO_PKG_VERSION"));

    let broker_settings = BrokerSettings::from_env()?;
    let sandbox_settings = SandboxSettings::from_env()?;

    let sandbox = match CodeSandbox::new(SandboxConfig::with_image(&sandbox_settings.image)).await
    {
        Ok(sandbox) => sandbox,
        Err(e) => {
            tracing::error!(error = %e, "sandbox initialization failed, exiting");
            return Err(e.into());
        }
    };
    tracing::info!(image = %sandbox_settings.image, "sandbox ready");

    let worker = SandboxWorker::new(sandbox, broker_settings);

    tokio::select! {
        result = worker.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("worker stopped by user");
        }
    }

    Ok(())
}
