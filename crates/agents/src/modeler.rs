//! Modeler role: natural-language problem → mathematical model.

use std::sync::Arc;

use async_trait::async_trait;

use optiflow_core::error::Result;
use optiflow_core::messages::{ResultPayload, TaskMessage};
use optiflow_core::traits::{AgentRole, LlmClient};

use crate::chain::PromptChain;
use crate::files::attachment_context;
use crate::prompts::{modeler_user_prompt, MODELER_SYSTEM};

pub struct ModelerAgent {
    llm: Arc<dyn LlmClient>,
}

impl ModelerAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AgentRole for ModelerAgent {
    async fn run(&self, task: &TaskMessage) -> Result<ResultPayload> {
        tracing::info!(job_id = %task.job_id, "modeling problem");

        let attachments = attachment_context(&task.files, &task.prompt);
        let reference = if attachments.is_empty() {
            task.context.clone()
        } else if task.context.is_empty() {
            attachments
        } else {
            format!("{}\n{}", task.context, attachments)
        };

        let content = PromptChain::new(MODELER_SYSTEM)
            .with_accepted_model(&task.accepted_model)
            .with_history(&task.conversation_history)
            .with_user(modeler_user_prompt(&reference, &task.prompt))
            .invoke(self.llm.as_ref())
            .await?;

        tracing::info!(job_id = %task.job_id, "model formulated");
        Ok(ResultPayload::MathModel {
            content,
            engine: self.llm.model().to_string(),
        })
    }
}
