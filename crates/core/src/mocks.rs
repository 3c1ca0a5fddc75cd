//! Mock implementations of core traits for testing.
//!
//! Scripted doubles used across the workspace so orchestration logic can be
//! exercised without a broker, a Docker daemon, or a model provider.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::messages::SandboxResultMessage;
use crate::traits::{ChatMessage, LlmClient, LlmResponse, SandboxExecutor};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses in order.
pub struct MockLlm {
    responses: Mutex<Vec<String>>,
    call_count: Mutex<usize>,
}

impl MockLlm {
    /// Create a new mock LLM with a queue of responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, _prompt: &str) -> Result<LlmResponse> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let responses = self.responses.lock().unwrap();
        let idx = (*count - 1) % responses.len().max(1);
        let content = responses
            .get(idx)
            .cloned()
            .unwrap_or_else(|| "mock response".to_string());

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
        })
    }

    async fn chat(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        self.complete("").await
    }

    fn model(&self) -> &str {
        "mock-engine"
    }
}

// =============================================================================
// Mock Sandbox Executor
// =============================================================================

/// Scripted sandbox double that records submitted jobs and replays
/// predefined replies in order.
#[derive(Default)]
pub struct MockSandboxExecutor {
    replies: Mutex<Vec<SandboxResultMessage>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockSandboxExecutor {
    /// Create with a queue of replies, consumed front-first.
    pub fn new(replies: Vec<SandboxResultMessage>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(job_id, code)` pair submitted so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SandboxExecutor for MockSandboxExecutor {
    async fn execute(&self, job_id: &str, code: &str) -> Result<SandboxResultMessage> {
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), code.to_string()));

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(Error::RpcTimeout(job_id.to_string()));
        }
        let mut reply = replies.remove(0);
        reply.job_id = job_id.to_string();
        Ok(reply)
    }
}
