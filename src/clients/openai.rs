//! Minimal OpenAI chat completions client.

use crate::config::EvaluatorConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum OpenAiError {
    /// Missing API key or unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response or an empty choice list.
    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, OpenAiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OpenAiError::Config("API key is empty".into()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| OpenAiError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, OpenAiError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OpenAiError::Config("OPENAI_API_KEY not set".into()))?;
        Self::new(api_key, config.base_url.clone())
    }

    /// Sends the conversation and returns the text of the first choice.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String, OpenAiError> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAiError::Api(format!("{status}: {error_text}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAiError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAiError::Api("No response content".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI chat completion"
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_options() {
        let request = ChatRequest {
            model: "gpt-4-turbo-preview".to_string(),
            messages: vec![Message::user("hi")],
            temperature: None,
            max_tokens: Some(500),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            OpenAiClient::new("  ", "https://api.openai.com/v1"),
            Err(OpenAiError::Config(_))
        ));
    }
}
