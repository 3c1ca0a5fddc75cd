//! Coder role: mathematical model → executable solver code.

use std::sync::Arc;

use async_trait::async_trait;

use optiflow_core::error::Result;
use optiflow_core::messages::{ResultPayload, TaskMessage};
use optiflow_core::traits::{AgentRole, LlmClient};

use crate::chain::{clean_code_output, PromptChain};
use crate::prompts::CODER_SYSTEM;

pub struct CoderAgent {
    llm: Arc<dyn LlmClient>,
}

impl CoderAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AgentRole for CoderAgent {
    async fn run(&self, task: &TaskMessage) -> Result<ResultPayload> {
        tracing::info!(job_id = %task.job_id, "generating solver code");

        let response = PromptChain::new(CODER_SYSTEM)
            .with_accepted_model(&task.accepted_model)
            .with_history(&task.conversation_history)
            .with_user(task.prompt.clone())
            .invoke(self.llm.as_ref())
            .await?;

        let content = clean_code_output(&response);

        tracing::info!(job_id = %task.job_id, "solver code ready");
        Ok(ResultPayload::PythonCode {
            content,
            engine: self.llm.model().to_string(),
        })
    }
}
