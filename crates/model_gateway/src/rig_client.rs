//! Rig LLM client adapter.
//!
//! Wraps Rig's Agent for integration with our LlmClient trait.

use async_trait::async_trait;

use optiflow_core::{
    traits::{ChatMessage, LlmClient, LlmResponse},
    Error, Result,
};

use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

/// Configuration for Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    /// Provider to use.
    pub provider: RigProvider,
    /// Model name.
    pub model: String,
    /// Temperature (0.0 - 1.0).
    pub temperature: Option<f64>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            provider: RigProvider::Gemini,
            model: "gemini-2.5-flash-lite".to_string(),
            temperature: Some(0.2),
        }
    }
}

impl RigConfig {
    /// Create config for Gemini.
    pub fn gemini(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::Gemini,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create config for OpenAI.
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::OpenAI,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create config for Anthropic.
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::Anthropic,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Rig-based LLM client.
///
/// This client wraps Rig's provider clients to implement our LlmClient
/// trait, giving the agent roles one interface across providers.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    /// Create a new Rig client with the given configuration.
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    /// Flatten a message list into a role-prefixed prompt string.
    fn build_prompt(&self, messages: &[ChatMessage]) -> String {
        let mut prompt = String::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => {
                    prompt.push_str(&format!("System: {}\n\n", msg.content));
                }
                "user" => {
                    prompt.push_str(&format!("User: {}\n\n", msg.content));
                }
                "assistant" => {
                    prompt.push_str(&format!("Assistant: {}\n\n", msg.content));
                }
                _ => {
                    prompt.push_str(&format!("{}: {}\n\n", msg.role, msg.content));
                }
            }
        }

        prompt
    }

    /// Call Gemini via Rig.
    async fn call_gemini(&self, prompt: &str) -> Result<LlmResponse> {
        use rig::providers::gemini;

        // Check env var first to avoid panic
        if std::env::var("GEMINI_API_KEY").is_err() {
            return Err(Error::ModelProvider("GEMINI_API_KEY not set".to_string()));
        }

        let client = gemini::Client::from_env();

        let mut agent_builder = client.agent(&self.config.model);
        if let Some(temp) = self.config.temperature {
            agent_builder = agent_builder.temperature(temp);
        }
        let agent = agent_builder.build();

        let response: String = agent
            .prompt(prompt)
            .await
            .map_err(|e| Error::ModelProvider(format!("Gemini error: {}", e)))?;

        Ok(LlmResponse {
            content: response,
            finish_reason: "stop".to_string(),
        })
    }

    /// Call OpenAI via Rig.
    async fn call_openai(&self, prompt: &str) -> Result<LlmResponse> {
        use rig::providers::openai;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::ModelProvider("OPENAI_API_KEY not set".to_string()));
        }

        let client = openai::Client::from_env();

        let mut agent_builder = client.agent(&self.config.model);
        if let Some(temp) = self.config.temperature {
            agent_builder = agent_builder.temperature(temp);
        }
        let agent = agent_builder.build();

        let response: String = agent
            .prompt(prompt)
            .await
            .map_err(|e| Error::ModelProvider(format!("OpenAI error: {}", e)))?;

        Ok(LlmResponse {
            content: response,
            finish_reason: "stop".to_string(),
        })
    }

    /// Call Anthropic via Rig.
    async fn call_anthropic(&self, prompt: &str) -> Result<LlmResponse> {
        use rig::providers::anthropic;

        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            return Err(Error::ModelProvider("ANTHROPIC_API_KEY not set".to_string()));
        }

        let client = anthropic::Client::from_env();

        let mut agent_builder = client.agent(&self.config.model);
        if let Some(temp) = self.config.temperature {
            agent_builder = agent_builder.temperature(temp);
        }
        let agent = agent_builder.build();

        let response: String = agent
            .prompt(prompt)
            .await
            .map_err(|e| Error::ModelProvider(format!("Anthropic error: {}", e)))?;

        Ok(LlmResponse {
            content: response,
            finish_reason: "stop".to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling LLM"
        );

        match self.config.provider {
            RigProvider::Gemini => self.call_gemini(prompt).await,
            RigProvider::OpenAI => self.call_openai(prompt).await,
            RigProvider::Anthropic => self.call_anthropic(prompt).await,
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let prompt = self.build_prompt(messages);
        self.complete(&prompt).await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Create a default LLM client based on available API keys.
pub fn create_default_client() -> Result<RigLlmClient> {
    if std::env::var("GEMINI_API_KEY").is_ok() {
        Ok(RigLlmClient::new(RigConfig::gemini("gemini-2.5-flash-lite")))
    } else if std::env::var("OPENAI_API_KEY").is_ok() {
        Ok(RigLlmClient::new(RigConfig::openai("gpt-4o-mini")))
    } else if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        Ok(RigLlmClient::new(RigConfig::anthropic(
            "claude-3-haiku-20240307",
        )))
    } else {
        Err(Error::ModelProvider(
            "No API key found. Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RigConfig::gemini("gemini-2.5-flash-lite").with_temperature(0.1);

        assert_eq!(config.provider, RigProvider::Gemini);
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(config.temperature, Some(0.1));
    }

    #[test]
    fn test_build_prompt() {
        let client = RigLlmClient::new(RigConfig::default());

        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
        ];

        let prompt = client.build_prompt(&messages);
        assert!(prompt.contains("System: You are helpful"));
        assert!(prompt.contains("User: Hello"));
        assert!(prompt.contains("Assistant: Hi there"));
    }

    #[test]
    fn test_model_is_reported_as_engine() {
        let client = RigLlmClient::new(RigConfig::default());
        assert_eq!(client.model(), "gemini-2.5-flash-lite");
    }
}
