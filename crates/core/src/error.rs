//! Error types for Optiflow.

use thiserror::Error;

/// Result type alias using Optiflow's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Optiflow.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Broker Errors (C1, C7)
    // =========================================================================
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Sandbox execution timeout for job {0}")]
    RpcTimeout(String),

    // =========================================================================
    // Agent Errors (C4, C5, C6, C8)
    // =========================================================================
    #[error("Unknown agent type: {0}")]
    UnknownAgent(String),

    #[error("Model provider error: {0}")]
    ModelProvider(String),

    // =========================================================================
    // Sandbox Errors (C2, C3)
    // =========================================================================
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Code execution failed: {0}")]
    CodeExecution(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a broker error.
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    /// Create an invalid message error.
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Create an unknown agent error.
    pub fn unknown_agent(role: impl Into<String>) -> Self {
        Self::UnknownAgent(role.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a sandbox error.
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::Sandbox(msg.into())
    }

    /// Create a code execution error.
    pub fn code_execution(msg: impl Into<String>) -> Self {
        Self::CodeExecution(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
