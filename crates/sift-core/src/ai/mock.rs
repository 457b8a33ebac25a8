//! Mock backend for testing
//!
//! Replays scripted completions in order and records every request it sees.
//! Useful for unit tests and development without a reachable model server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::CompletionRequest;
use super::AIBackend;

/// Completion returned when nothing is scripted; parses under both
/// extraction schemas as "not a financial document"
pub const DEFAULT_MOCK_CONTENT: &str =
    r#"{"isLedgerEntry": false, "isFinancialDocument": false, "confidence": 0.0}"#;

/// One scripted outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Assistant message content
    Content(String),
    /// Transport-level failure
    Fail(String),
}

/// Mock AI backend for testing
///
/// Clones share the same script and request log, so a test can keep one
/// handle while the pipeline owns another.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            ..Default::default()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a mock that replays these contents in order
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for content in responses {
            mock.push(MockResponse::Content(content.into()));
        }
        mock
    }

    /// Create a new instance with a different model name
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Append a scripted outcome
    pub fn push(&self, response: MockResponse) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.push_back(response);
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of completions served
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .map_err(|_| Error::Backend("mock request log poisoned".into()))?
            .push(request.clone());

        let next = self
            .script
            .lock()
            .map_err(|_| Error::Backend("mock script poisoned".into()))?
            .pop_front();

        match next {
            Some(MockResponse::Content(content)) => Ok(content),
            Some(MockResponse::Fail(reason)) => Err(Error::Backend(reason)),
            None => Ok(DEFAULT_MOCK_CONTENT.to_string()),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ChatMessage;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockBackend::with_responses(["one", "two"]);
        assert_eq!(mock.complete(&request("a")).await.unwrap(), "one");
        assert_eq!(mock.complete(&request("b")).await.unwrap(), "two");
        assert_eq!(
            mock.complete(&request("c")).await.unwrap(),
            DEFAULT_MOCK_CONTENT
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockBackend::new();
        mock.push(MockResponse::Fail("timeout".into()));
        let err = mock.complete(&request("a")).await.unwrap_err();
        assert!(matches!(err, Error::Backend(ref r) if r == "timeout"));
    }

    #[tokio::test]
    async fn test_mock_clones_share_log() {
        let mock = MockBackend::new();
        let handle = mock.clone();
        mock.complete(&request("hello")).await.unwrap();
        assert_eq!(handle.requests()[0].last_user_message(), Some("hello"));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }

    #[test]
    fn test_mock_with_model() {
        let mock = MockBackend::new().with_model("gpt-4o");
        assert_eq!(mock.model(), "gpt-4o");
        assert_eq!(mock.host(), "mock://localhost");
    }
}
