//! Test utilities for sift-core
//!
//! This module provides a mock OpenAI-compatible server that can be used for
//! development and integration tests. Replies are scripted per test; every
//! request body is recorded for assertions.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Content returned when no reply is scripted; valid for both extraction schemas
pub const DEFAULT_REPLY: &str =
    r#"{"isLedgerEntry": false, "isFinancialDocument": false, "confidence": 0.0}"#;

/// One scripted chat completion reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this assistant message content
    Content(String),
    /// Error status with an empty body
    Status(u16),
}

impl MockReply {
    pub fn content(content: impl Into<String>) -> Self {
        MockReply::Content(content.into())
    }

    pub fn status(code: u16) -> Self {
        MockReply::Status(code)
    }
}

#[derive(Default)]
struct ServerState {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<Value>>,
    authorization: Mutex<Option<String>>,
}

/// Mock OpenAI-compatible server for testing and development
pub struct MockOpenAIServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOpenAIServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a reply for the next chat completion
    pub fn push(&self, reply: MockReply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    /// Request bodies received so far, in order
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Authorization header of the most recent chat completion
    pub fn last_authorization(&self) -> Option<String> {
        self.state.authorization.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOpenAIServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [
            {"id": "gpt-4o-mini", "object": "model"},
            {"id": "gpt-4o", "object": "model"}
        ]
    }))
}

async fn handle_chat(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *state.authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let model = body["model"].as_str().unwrap_or("mock").to_string();
    state.requests.lock().unwrap().push(body);

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| MockReply::content(DEFAULT_REPLY));

    match reply {
        MockReply::Content(content) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        MockReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}
