//! Seams between the workers and their external collaborators.
//!
//! The LLM, the sandbox RPC transport, and the agent roles all sit behind
//! traits so the orchestration logic can be driven by scripted mocks in
//! tests (see [`crate::mocks`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::messages::{ResultPayload, SandboxResultMessage, TaskMessage};

// =============================================================================
// LLM Client
// =============================================================================

/// LLM client interface.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a flattened prompt.
    async fn complete(&self, prompt: &str) -> Result<LlmResponse>;

    /// Generate a completion for an ordered message list.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;

    /// Model identifier reported in result payloads as `engine`.
    fn model(&self) -> &str;
}

/// Chat message for LLM interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content.
    pub content: String,
    /// Finish reason.
    pub finish_reason: String,
}

// =============================================================================
// Sandbox Executor
// =============================================================================

/// A callee that runs code in the sandbox tier and returns its reply.
///
/// The production implementation publishes the job over the broker with a
/// private reply queue and blocks until the correlated result arrives.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// Execute `code` under the given (stage-suffixed) job id.
    async fn execute(&self, job_id: &str, code: &str) -> Result<SandboxResultMessage>;
}

// =============================================================================
// Agent Role
// =============================================================================

/// One agent role (Modeler, Coder, Visualizer).
#[async_trait]
pub trait AgentRole: Send + Sync {
    /// Process a task and produce its result payload. Any error is turned
    /// into a TASK_FAILED reply by the worker.
    async fn run(&self, task: &TaskMessage) -> Result<ResultPayload>;
}
