//! Visualizer role: solver results → plots → markdown report.
//!
//! The only role that calls back into the sandbox tier. Pipeline for one
//! task: optionally run the approved solver code to capture fresh output,
//! have the LLM write matplotlib code, run that in the sandbox, then have
//! the LLM compose a markdown report referencing the produced PNGs with
//! `[FILE: name.png]` markers. The first failing stage aborts the pipeline;
//! the worker converts the error into a TASK_FAILED reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use optiflow_core::codec::normalize_files_to_base64;
use optiflow_core::error::{Error, Result};
use optiflow_core::messages::{
    stage_job_id, ExecutionStatus, ResultPayload, SandboxResultMessage, TaskMessage,
};
use optiflow_core::traits::{AgentRole, LlmClient, SandboxExecutor};

use crate::chain::{clean_code_output, PromptChain};
use crate::prompts::{
    report_user_prompt, visualization_user_prompt, REPORT_MODEL_LABEL, REPORT_SYSTEM,
    VISUALIZATION_SYSTEM,
};

pub struct VisualizerAgent {
    llm: Arc<dyn LlmClient>,
    sandbox: Arc<dyn SandboxExecutor>,
}

impl VisualizerAgent {
    pub fn new(llm: Arc<dyn LlmClient>, sandbox: Arc<dyn SandboxExecutor>) -> Self {
        Self { llm, sandbox }
    }

    /// Run the approved solver code and capture its stdout for the plotting
    /// step.
    async fn execute_solver(&self, task: &TaskMessage) -> Result<String> {
        tracing::info!(job_id = %task.job_id, "running solver code in sandbox");
        let result = self
            .sandbox
            .execute(&stage_job_id(&task.job_id, "solver"), &task.accepted_code)
            .await?;

        if result.status == ExecutionStatus::Failed {
            return Err(Error::code_execution(format!(
                "Solver code execution failed: {}",
                failure_reason(&result)
            )));
        }
        Ok(result.generated_code.stdout)
    }

    /// Have the LLM write the plotting code. Fresh solver output gets the
    /// detailed template; follow-up requests lean on the conversation
    /// history and send the bare user request.
    async fn generate_visualization_code(
        &self,
        task: &TaskMessage,
        execution_output: &str,
    ) -> Result<String> {
        tracing::info!(job_id = %task.job_id, "generating visualization code");

        let user_message = if execution_output.is_empty() {
            task.prompt.clone()
        } else {
            visualization_user_prompt(&task.context, execution_output, &task.prompt)
        };

        let response = PromptChain::new(VISUALIZATION_SYSTEM)
            .with_accepted_model(&task.accepted_model)
            .with_history(&task.conversation_history)
            .with_user(user_message)
            .invoke(self.llm.as_ref())
            .await?;

        Ok(clean_code_output(&response))
    }

    /// Run the plotting code and pull out its stdout and file mapping.
    async fn execute_visualization(
        &self,
        task: &TaskMessage,
        code: &str,
    ) -> Result<(String, BTreeMap<String, String>)> {
        tracing::info!(job_id = %task.job_id, "running visualization code in sandbox");
        let result = self
            .sandbox
            .execute(&stage_job_id(&task.job_id, "viz"), code)
            .await?;

        if result.status == ExecutionStatus::Failed {
            return Err(Error::code_execution(format!(
                "Visualization code execution failed: {}",
                failure_reason(&result)
            )));
        }

        let stdout = result.generated_code.stdout;
        let files = result.generated_code.generated_files.unwrap_or_default();
        tracing::info!(
            job_id = %task.job_id,
            files = files.len(),
            "visualization code produced artifacts"
        );
        Ok((stdout, files))
    }

    /// Compose the final markdown report.
    async fn generate_report(
        &self,
        task: &TaskMessage,
        execution_output: &str,
        sandbox_output: &str,
    ) -> Result<String> {
        tracing::info!(job_id = %task.job_id, "generating report");

        PromptChain::new(REPORT_SYSTEM)
            .with_labeled_user(REPORT_MODEL_LABEL, &task.accepted_model)
            .with_user(report_user_prompt(
                execution_output,
                sandbox_output,
                &task.prompt,
            ))
            .invoke(self.llm.as_ref())
            .await
    }
}

#[async_trait]
impl AgentRole for VisualizerAgent {
    async fn run(&self, task: &TaskMessage) -> Result<ResultPayload> {
        tracing::info!(job_id = %task.job_id, "starting visualization");

        // Solver runs only when the current task carries approved code;
        // otherwise prior results live in the conversation history.
        let execution_output = if task.accepted_code.is_empty() {
            String::new()
        } else {
            self.execute_solver(task).await?
        };

        let visualization_code = self
            .generate_visualization_code(task, &execution_output)
            .await?;

        let (sandbox_output, wire_files) =
            self.execute_visualization(task, &visualization_code).await?;

        let content = self
            .generate_report(task, &execution_output, &sandbox_output)
            .await?;

        let generated_files = normalize_files_to_base64(&wire_files);

        Ok(ResultPayload::VisualizationReport {
            content,
            generated_files,
            visualization_code,
            engine: self.llm.model().to_string(),
        })
    }
}

/// Human-readable reason for a failed sandbox stage.
fn failure_reason(result: &SandboxResultMessage) -> String {
    if result.generated_code.stderr.is_empty() {
        format!("exit code {}", result.generated_code.status_code)
    } else {
        result.generated_code.stderr.clone()
    }
}
