//! Tracing subscriber configuration for the worker binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Result;

/// Configure stdout logging with an env filter. `rust_log` overrides the
/// default directive; `json_logs` switches to line-delimited JSON output.
pub fn init(rust_log: Option<&str>, json_logs: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(rust_log.unwrap_or("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}
