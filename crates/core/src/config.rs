//! Environment-driven configuration.
//!
//! Both workers are configured entirely through environment variables so the
//! same container image can run either role. Recognized keys:
//! `RABBITMQ_HOST`, `RABBITMQ_USER`, `RABBITMQ_PASS`,
//! `RABBITMQ_IN_QUEUE_AGENT`, `RABBITMQ_OUT_QUEUE_AGENT`,
//! `RABBITMQ_IN_QUEUE_SANDBOX`, `RABBITMQ_OUT_QUEUE_SANDBOX`,
//! `SANDBOX_IMAGE`.

use config::{Config, Environment};
use secrecy::Secret;
use serde::Deserialize;

use crate::error::Result;

/// Connection and queue settings for the message broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Broker hostname.
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker username.
    #[serde(default = "default_user")]
    pub user: String,
    /// Broker password.
    #[serde(default = "default_pass")]
    pub pass: Secret<String>,
    /// Queue the agent worker consumes task messages from.
    #[serde(default = "default_in_queue_agent")]
    pub in_queue_agent: String,
    /// Queue the agent worker publishes completion/failure messages to.
    #[serde(default = "default_out_queue_agent")]
    pub out_queue_agent: String,
    /// Queue the sandbox worker consumes code jobs from.
    #[serde(default = "default_in_queue_sandbox")]
    pub in_queue_sandbox: String,
    /// Default reply queue for sandbox results when a job names none.
    #[serde(default = "default_out_queue_sandbox")]
    pub out_queue_sandbox: String,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_user() -> String {
    "guest".into()
}

fn default_pass() -> Secret<String> {
    Secret::new("guest".into())
}

fn default_in_queue_agent() -> String {
    "ai_tasks_queue".into()
}

fn default_out_queue_agent() -> String {
    "ai_results_queue".into()
}

fn default_in_queue_sandbox() -> String {
    "code_execution_queue".into()
}

fn default_out_queue_sandbox() -> String {
    "code_results_queue".into()
}

impl BrokerSettings {
    /// Load from `RABBITMQ_*` environment variables, with defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(Environment::with_prefix("RABBITMQ"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            pass: default_pass(),
            in_queue_agent: default_in_queue_agent(),
            out_queue_agent: default_out_queue_agent(),
            in_queue_sandbox: default_in_queue_sandbox(),
            out_queue_sandbox: default_out_queue_sandbox(),
        }
    }
}

/// Sandbox worker settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SandboxSettings {
    /// Container image code jobs run in.
    #[serde(default = "default_image")]
    pub image: String,
}

fn default_image() -> String {
    "optiflow-sandbox:latest".into()
}

impl SandboxSettings {
    /// Load from `SANDBOX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(Environment::with_prefix("SANDBOX"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            image: default_image(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_defaults_match_canonical_queue_names() {
        let settings = BrokerSettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.in_queue_agent, "ai_tasks_queue");
        assert_eq!(settings.out_queue_agent, "ai_results_queue");
        assert_eq!(settings.in_queue_sandbox, "code_execution_queue");
        assert_eq!(settings.out_queue_sandbox, "code_results_queue");
    }

    #[test]
    fn sandbox_default_image() {
        assert_eq!(SandboxSettings::default().image, "optiflow-sandbox:latest");
    }
}
