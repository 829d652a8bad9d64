mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::ChatModel;
use client::ClaudeClient;
use types::{ChatRequest, WireMessage};

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Single-turn completion: system instructions + user content, one text
    /// reply back. Low temperature, since callers parse the reply as JSON.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .temperature(0.1);

        let response = self.client().chat(&request).await?;

        response
            .text()
            .ok_or_else(|| anyhow!("No text in Claude response"))
    }
}

#[async_trait]
impl ChatModel for Claude {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.chat_completion(system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        assert_eq!(ai.model, "claude-haiku-4-5-20251001");
        assert_eq!(ai.api_key, "sk-ant-test");
    }

    #[test]
    fn test_claude_with_base_url() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }
}
