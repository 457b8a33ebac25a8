//! OpenAI-compatible backend implementation
//!
//! Works with the hosted OpenAI API and any server that implements the
//! chat completions API with `response_format` support (vLLM, LocalAI,
//! llama-server, Docker Model Runner).
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)
//! - `OPENAI_MODEL`: Default model when a request names none (default: gpt-4o-mini)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{ChatMessage, CompletionRequest, ResponseFormat};
use super::AIBackend;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible backend
///
/// # Example
///
/// ```rust,ignore
/// export OPENAI_API_KEY="sk-..."
///
/// // Self-hosted vLLM
/// export OPENAI_BASE_URL="http://192.168.1.100:8000"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Create a new instance with a different default model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            api_key: self.api_key.clone(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `OPENAI_API_KEY`
    /// Optional: `OPENAI_BASE_URL` (default: https://api.openai.com)
    /// Optional: `OPENAI_MODEL` (default: gpt-4o-mini)
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Some(Self::with_api_key(&base_url, &model, &api_key))
    }

    /// Make a chat completion request
    async fn chat_completion(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest::from_request(request, &self.model);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            seed = ?body.seed,
            "OpenAI-compatible chat completion"
        );

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Backend("Empty response from OpenAI API".into()))
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
    stream: bool,
}

impl ChatCompletionRequest {
    fn from_request(request: &CompletionRequest, default_model: &str) -> Self {
        Self {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            messages: request.messages.clone(),
            temperature: request.temperature,
            seed: request.seed,
            max_tokens: request.max_tokens,
            response_format: match request.response_format {
                ResponseFormat::JsonObject => Some(WireResponseFormat {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
            stream: false,
        }
    }
}

/// `response_format` body field
#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message; content is null on refusals and tool calls
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response = self.chat_completion(request).await?;
        debug!("OpenAI-compatible extraction response: {}", response);
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .timeout(Duration::from_secs(5));
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        if let Ok(resp) = req_builder.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Some self-hosted servers only answer on /health
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockOpenAIServer, MockReply};

    #[test]
    fn test_backend_new() {
        let backend = OpenAICompatibleBackend::new("http://localhost:12434", "gpt-4o-mini");
        assert_eq!(backend.model(), "gpt-4o-mini");
        assert_eq!(backend.host(), "http://localhost:12434");
    }

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAICompatibleBackend::new("http://localhost:12434/", "gpt-4o-mini");
        assert_eq!(backend.host(), "http://localhost:12434");
    }

    #[test]
    fn test_backend_with_api_key() {
        let backend =
            OpenAICompatibleBackend::with_api_key("http://localhost:12434", "gpt-4o", "sk-test123");
        assert_eq!(backend.model(), "gpt-4o");
        assert_eq!(backend.api_key, Some("sk-test123".to_string()));
    }

    #[test]
    fn test_with_model_keeps_key() {
        let backend =
            OpenAICompatibleBackend::with_api_key("http://localhost:12434", "gpt-4o", "sk-test123")
                .with_model("gpt-4o-mini");
        assert_eq!(backend.model(), "gpt-4o-mini");
        assert_eq!(backend.api_key.as_deref(), Some("sk-test123"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAICompatibleBackend::new("http://127.0.0.1:9", "gpt-4o-mini");
        assert!(!backend.health_check().await);
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("Extract fields"),
            ChatMessage::user("Acme $5.00"),
        ])
        .with_model("gpt-4o")
        .with_temperature(0.3)
        .with_seed(2);

        let json = serde_json::to_value(ChatCompletionRequest::from_request(
            &request,
            "gpt-4o-mini",
        ))
        .unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Acme $5.00");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["seed"], 2);
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.3).abs() < 0.001);
        assert_eq!(json["stream"], false);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_uses_default_model() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let body = ChatCompletionRequest::from_request(&request, "gpt-4o-mini");
        assert_eq!(body.model, "gpt-4o-mini");
        assert!(body.seed.is_none());
    }

    #[test]
    fn test_response_deserialization_null_content() {
        let json = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockOpenAIServer::start().await;
        server.push(MockReply::content(r#"{"isLedgerEntry": true, "confidence": 0.9}"#));

        let backend = OpenAICompatibleBackend::with_api_key(&server.url(), "gpt-4o-mini", "sk-test");
        let request = CompletionRequest::new(vec![ChatMessage::user("Acme $5.00")]).with_seed(1);
        let content = backend.complete(&request).await.unwrap();
        assert!(content.contains("isLedgerEntry"));

        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["model"], "gpt-4o-mini");
        assert_eq!(seen[0]["response_format"]["type"], "json_object");
        assert_eq!(server.last_authorization().as_deref(), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn test_complete_http_error() {
        let server = MockOpenAIServer::start().await;
        server.push(MockReply::status(500));

        let backend = OpenAICompatibleBackend::new(&server.url(), "gpt-4o-mini");
        let request = CompletionRequest::new(vec![ChatMessage::user("x")]);
        let err = backend.complete(&request).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[tokio::test]
    async fn test_health_check_mock_server() {
        let server = MockOpenAIServer::start().await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "gpt-4o-mini");
        assert!(backend.health_check().await);
    }
}
