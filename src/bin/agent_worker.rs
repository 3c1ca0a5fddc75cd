#![deny(unused)]
//! Agent worker entry point.
//!
//! Consumes task messages, dispatches them to the Modeler, Coder or
//! Visualizer role, and publishes completion/failure replies.

use std::sync::Arc;

use optiflow_agents::{AgentRegistry, AgentWorker};
use optiflow_broker::SandboxRpcClient;
use optiflow_core::config::BrokerSettings;
use optiflow_core::traits::{LlmClient, SandboxExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    optiflow_core::telemetry::init(rust_log.as_deref(), false)?;

    tracing::info!("starting agent worker v{}", env!("CARGO_PKG_VERSION"));

    let settings = BrokerSettings::from_env()?;

    let llm: Arc<dyn LlmClient> = Arc::new(optiflow_model_gateway::create_default_client()?);
    tracing::info!(model = %llm.model(), "LLM client ready");

    let sandbox: Arc<dyn SandboxExecutor> = Arc::new(SandboxRpcClient::new(settings.clone()));
    let registry = AgentRegistry::new(llm, sandbox);
    let worker = AgentWorker::new(registry, settings);

    tokio::select! {
        result = worker.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("worker stopped by user");
        }
    }

    Ok(())
}
