//! Wire messages exchanged over the broker.
//!
//! All messages are UTF-8 JSON with camelCase keys and are published with
//! delivery-mode persistent. Result payloads keep their historical
//! snake_case field names (`generated_files`, `visualization_code`) and tag
//! values (`math_model`, `python_code`, `visualization_report`) — they are
//! part of the contract with the frontend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Task Messages (agent in-queue)
// =============================================================================

/// A task request consumed by the agent worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    /// Unique id for the request.
    pub job_id: String,
    /// Role tag, e.g. `MODELER_AGENT`. Kept as a string on the wire so an
    /// unknown role is a routing decision, not a parse failure.
    pub agent_type: String,
    /// User instruction.
    pub prompt: String,
    /// Reference material for labels and titles.
    #[serde(default)]
    pub context: String,
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    /// Previously approved mathematical model, empty if none.
    #[serde(default)]
    pub accepted_model: String,
    /// Previously approved solver code, empty if none.
    #[serde(default)]
    pub accepted_code: String,
    /// Attached documents.
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

impl TaskMessage {
    /// Reject messages missing any of the required fields. Empty strings
    /// count as missing.
    pub fn validate(&self) -> Result<()> {
        if self.job_id.is_empty() || self.agent_type.is_empty() || self.prompt.is_empty() {
            return Err(Error::invalid_message(
                "task message requires jobId, agentType and prompt",
            ));
        }
        Ok(())
    }
}

/// One prior conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`; anything else is dropped during chain building.
    pub role: String,
    pub content: String,
}

/// A document attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    /// Base64-encoded file bytes.
    #[serde(rename = "content_base64")]
    pub content: String,
}

// =============================================================================
// Agent Result Messages (agent out-queue)
// =============================================================================

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "TASK_COMPLETED")]
    Completed,
    #[serde(rename = "TASK_FAILED")]
    Failed,
}

/// Reply published to the agent out-queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResultMessage {
    pub job_id: String,
    pub status: TaskStatus,
    pub agent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResultMessage {
    pub fn completed(job_id: &str, agent_type: &str, payload: ResultPayload) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: TaskStatus::Completed,
            agent_type: agent_type.to_string(),
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(job_id: &str, agent_type: &str, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: TaskStatus::Failed,
            agent_type: agent_type.to_string(),
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Role-specific result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResultPayload {
    /// Modeler output: a markdown mathematical model.
    #[serde(rename = "math_model")]
    MathModel { content: String, engine: String },

    /// Coder output: executable solver code, markdown fences stripped.
    #[serde(rename = "python_code")]
    PythonCode { content: String, engine: String },

    /// Visualizer output: a markdown report with `[FILE: name.png]` markers
    /// and the referenced images as base64.
    #[serde(rename = "visualization_report")]
    VisualizationReport {
        content: String,
        generated_files: BTreeMap<String, String>,
        visualization_code: String,
        engine: String,
    },
}

// =============================================================================
// Sandbox Messages (sandbox in/out queues)
// =============================================================================

/// A code execution job consumed by the sandbox worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxJobMessage {
    /// Stage-suffixed job id, see [`stage_job_id`].
    pub job_id: String,
    /// Source to execute.
    pub code: String,
    /// Queue the caller listens on; the worker replies to the default
    /// results queue when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_queue: Option<String>,
}

/// Outcome of a sandboxed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "CODE_EXECUTED")]
    Executed,
    #[serde(rename = "CODE_FAILED")]
    Failed,
}

/// Reply published by the sandbox worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxResultMessage {
    pub job_id: String,
    pub status: ExecutionStatus,
    pub generated_code: ExecutionReport,
}

/// Streams and artifacts captured from one container run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub status_code: i64,
    pub stdout: String,
    pub stderr: String,
    /// Basename → base64 bytes of every PNG written to `/output`. Absent
    /// when the run produced none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_files: Option<BTreeMap<String, String>>,
}

/// Derive a sandbox-scoped job id for one visualizer sub-step. The random
/// suffix keeps sibling calls from ever colliding on the broker.
pub fn stage_job_id(job_id: &str, stage: &str) -> String {
    format!("{}_{}_{}", job_id, stage, uuid::Uuid::new_v4().simple())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_message_parses_wire_shape() {
        let body = r#"{
            "jobId": "job-1",
            "agentType": "MODELER_AGENT",
            "prompt": "Maximize x+y s.t. x+y<=10",
            "conversationHistory": [{"role": "user", "content": "hi"}],
            "acceptedModel": "max x+y",
            "files": [{"name": "data.txt", "content_base64": "aGVsbG8="}]
        }"#;
        let msg: TaskMessage = serde_json::from_str(body).unwrap();
        assert_eq!(msg.job_id, "job-1");
        assert_eq!(msg.agent_type, "MODELER_AGENT");
        assert_eq!(msg.conversation_history.len(), 1);
        assert_eq!(msg.accepted_model, "max x+y");
        assert!(msg.accepted_code.is_empty());
        assert_eq!(msg.files[0].name, "data.txt");
        msg.validate().unwrap();
    }

    #[test]
    fn task_message_missing_required_field_is_a_parse_error() {
        let body = r#"{"jobId": "job-1", "prompt": "p"}"#;
        assert!(serde_json::from_str::<TaskMessage>(body).is_err());
    }

    #[test]
    fn task_message_empty_required_field_fails_validation() {
        let body = r#"{"jobId": "job-1", "agentType": "", "prompt": "p"}"#;
        let msg: TaskMessage = serde_json::from_str(body).unwrap();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn completed_result_serializes_without_error_key() {
        let msg = AgentResultMessage::completed(
            "j",
            "CODER_AGENT",
            ResultPayload::PythonCode {
                content: "print(1)".into(),
                engine: "test-engine".into(),
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "TASK_COMPLETED");
        assert_eq!(json["payload"]["type"], "python_code");
        assert_eq!(json["payload"]["content"], "print(1)");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_result_serializes_without_payload_key() {
        let msg = AgentResultMessage::failed("j", "VISUALIZER_AGENT", "boom");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "TASK_FAILED");
        assert_eq!(json["error"], "boom");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn visualization_payload_keeps_snake_case_fields() {
        let mut files = BTreeMap::new();
        files.insert("plot.png".to_string(), "aGk=".to_string());
        let payload = ResultPayload::VisualizationReport {
            content: "[FILE: plot.png]".into(),
            generated_files: files,
            visualization_code: "import matplotlib".into(),
            engine: "test-engine".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "visualization_report");
        assert_eq!(json["generated_files"]["plot.png"], "aGk=");
        assert_eq!(json["visualization_code"], "import matplotlib");
    }

    #[test]
    fn sandbox_job_round_trips_response_queue() {
        let job = SandboxJobMessage {
            job_id: "j_viz_1".into(),
            code: "print()".into(),
            response_queue: Some("amq.gen-abc".into()),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["responseQueue"], "amq.gen-abc");

        let bare: SandboxJobMessage =
            serde_json::from_str(r#"{"jobId": "x", "code": "y"}"#).unwrap();
        assert!(bare.response_queue.is_none());
    }

    #[test]
    fn sandbox_result_wire_shape() {
        let msg = SandboxResultMessage {
            job_id: "j".into(),
            status: ExecutionStatus::Failed,
            generated_code: ExecutionReport {
                status_code: -1,
                stdout: String::new(),
                stderr: "Timeout error: Code execution exceeded 10 seconds.".into(),
                generated_files: None,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "CODE_FAILED");
        assert_eq!(json["generatedCode"]["statusCode"], -1);
        assert!(json["generatedCode"].get("generatedFiles").is_none());
    }

    #[test]
    fn stage_job_ids_are_prefixed_and_unique() {
        let a = stage_job_id("job-7", "solver");
        let b = stage_job_id("job-7", "solver");
        assert!(a.starts_with("job-7_solver_"));
        assert_ne!(a, b);
    }
}
