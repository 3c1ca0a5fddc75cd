//! Prompt chain building and output cleaning.

use optiflow_core::error::Result;
use optiflow_core::messages::ChatTurn;
use optiflow_core::traits::{ChatMessage, LlmClient};

use crate::prompts::{ACCEPTED_CODE_LABEL, ACCEPTED_MODEL_LABEL};

/// Ordered message list submitted to the LLM as a single call.
///
/// Composition order is fixed: system template, then the accepted-model and
/// accepted-code context (when present), then prior conversation turns, then
/// the current user message.
pub struct PromptChain {
    messages: Vec<ChatMessage>,
}

impl PromptChain {
    /// Start a chain with the role's system template.
    pub fn new(system_template: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_template)],
        }
    }

    /// Add the approved model under its fixed label, if non-empty.
    pub fn with_accepted_model(mut self, accepted_model: &str) -> Self {
        if !accepted_model.is_empty() {
            self.messages.push(ChatMessage::user(format!(
                "{}{}",
                ACCEPTED_MODEL_LABEL, accepted_model
            )));
        }
        self
    }

    /// Add the approved code under its fixed label, if non-empty.
    pub fn with_accepted_code(mut self, accepted_code: &str) -> Self {
        if !accepted_code.is_empty() {
            self.messages.push(ChatMessage::user(format!(
                "{}{}",
                ACCEPTED_CODE_LABEL, accepted_code
            )));
        }
        self
    }

    /// Append prior conversation turns. Turns with unknown role tags are
    /// dropped silently.
    pub fn with_history(mut self, history: &[ChatTurn]) -> Self {
        for turn in history {
            match turn.role.as_str() {
                "user" => self.messages.push(ChatMessage::user(&turn.content)),
                "assistant" => self.messages.push(ChatMessage::assistant(&turn.content)),
                other => {
                    tracing::debug!(role = %other, "dropping turn with unknown role");
                }
            }
        }
        self
    }

    /// Append a labeled user message, skipped when `content` is empty.
    pub fn with_labeled_user(mut self, label: &str, content: &str) -> Self {
        if !content.is_empty() {
            self.messages
                .push(ChatMessage::user(format!("{}{}", label, content)));
        }
        self
    }

    /// Append the current user message.
    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content.into()));
        self
    }

    /// The composed message list.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Submit the chain and return the model's text.
    pub async fn invoke(&self, llm: &dyn LlmClient) -> Result<String> {
        let response = llm.chat(&self.messages).await?;
        Ok(response.content)
    }
}

/// Strip markdown code fences from model output and trim surrounding
/// whitespace. Handles any number of fence blocks and is idempotent.
pub fn clean_code_output(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_with_history_keeps_order() {
        let history = vec![
            ChatTurn {
                role: "user".into(),
                content: "Hello".into(),
            },
            ChatTurn {
                role: "assistant".into(),
                content: "Hi there!".into(),
            },
        ];
        let chain = PromptChain::new("You are a helpful assistant.").with_history(&history);

        let messages = chain.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[2].content, "Hi there!");
    }

    #[test]
    fn chain_with_accepted_model_uses_fixed_label() {
        let chain = PromptChain::new("You are a modeler.").with_accepted_model("Maximize: x + y");

        let messages = chain.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1]
            .content
            .starts_with("Zaakceptowany model matematyczny:\n\n"));
        assert!(messages[1].content.contains("Maximize: x + y"));
    }

    #[test]
    fn chain_with_accepted_code_uses_fixed_label() {
        let chain = PromptChain::new("You are a coder.").with_accepted_code("print('hello')");

        let messages = chain.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Zaakceptowany kod"));
        assert!(messages[1].content.contains("print('hello')"));
    }

    #[test]
    fn empty_optional_context_adds_nothing() {
        let chain = PromptChain::new("System message")
            .with_accepted_model("")
            .with_accepted_code("")
            .with_history(&[]);
        assert_eq!(chain.messages().len(), 1);
        assert_eq!(chain.messages()[0].content, "System message");
    }

    #[test]
    fn unknown_history_roles_are_dropped() {
        let history = vec![
            ChatTurn {
                role: "tool".into(),
                content: "ignored".into(),
            },
            ChatTurn {
                role: "user".into(),
                content: "kept".into(),
            },
        ];
        let chain = PromptChain::new("sys").with_history(&history);
        assert_eq!(chain.messages().len(), 2);
        assert_eq!(chain.messages()[1].content, "kept");
    }

    #[test]
    fn clean_strips_fences() {
        let dirty = "```python\nprint('hello')\n```";
        assert_eq!(clean_code_output(dirty), "print('hello')");
    }

    #[test]
    fn clean_preserves_plain_code() {
        assert_eq!(clean_code_output("print('hello')"), "print('hello')");
        assert_eq!(clean_code_output("  x = 1\n"), "x = 1");
    }

    #[test]
    fn clean_handles_multiple_blocks() {
        let dirty = "```python\na = 1\n```\ntext between\n```\nb = 2\n```";
        let cleaned = clean_code_output(dirty);
        assert!(cleaned.contains("a = 1"));
        assert!(cleaned.contains("text between"));
        assert!(cleaned.contains("b = 2"));
        assert!(!cleaned.contains("```"));
    }

    #[test]
    fn clean_is_idempotent() {
        let inputs = [
            "```python\nprint('hello')\n```",
            "plain text",
            "```\nonly fences\n```",
            "  padded  ",
        ];
        for input in inputs {
            let once = clean_code_output(input);
            assert_eq!(clean_code_output(&once), once);
        }
    }
}
