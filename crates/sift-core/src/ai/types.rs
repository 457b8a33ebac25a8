//! AI backend request and response types
//!
//! Requests are backend-agnostic; each backend maps them onto its own wire
//! format. Response schemas mirror the JSON objects the extraction prompts
//! ask the model to return.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Chat role for a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Output shape requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text
    Text,
    /// A single JSON object
    #[default]
    JsonObject,
}

/// A single chat completion call
///
/// `model` overrides the backend's default model when set. The extractors
/// always set it from the model router so retries can escalate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Sampling seed; extractors pass the attempt number
    pub seed: Option<i64>,
    pub response_format: ResponseFormat,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: None,
            messages,
            temperature: 0.1,
            seed: None,
            response_format: ResponseFormat::JsonObject,
            max_tokens: None,
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Secondary fields returned by the enhanced extraction prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancedMetadata {
    pub vendor: Option<String>,
    pub invoice_number: Option<String>,
    pub payment_method: Option<String>,
    pub currency: Option<String>,
    pub document_type: Option<String>,
}

/// Response schema for the enhanced extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedResponse {
    pub is_ledger_entry: bool,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub confidence: f64,
    /// An omitted object reads as empty metadata
    #[serde(default)]
    pub metadata: EnhancedMetadata,
}

/// Unfiltered lists the V2 model reports alongside its picks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRawExtraction {
    pub amounts: Vec<f64>,
    pub dates: Vec<String>,
    pub vendors: Vec<String>,
}

/// Response schema for the V2 extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Response {
    pub is_financial_document: bool,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub raw_extraction: ModelRawExtraction,
}
