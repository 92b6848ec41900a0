//! Mock OpenAI API for testing
//!
//! Provides wiremock-based mocks for the OpenAI endpoints keychat talks to:
//! - GET /v1/models - Key validation probe
//! - POST /v1/chat/completions - Chat completions (streaming and non-streaming)
//!
//! Streaming and blocking chat mocks are told apart by the `stream` flag in
//! the request body, so one server can script both legs of a fallback.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::mocks::openai::MockOpenAI;
//!
//! #[tokio::test]
//! async fn test_with_openai_mock() {
//!     let mock = MockOpenAI::start().await;
//!     mock.mock_chat_stream(&["Hi", " there!"]).await;
//!
//!     // Use format!("{}/v1", mock.uri()) as the API URL
//! }
//! ```

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Counter for generating unique IDs
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_id(prefix: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, counter)
}

/// Mock OpenAI server wrapper
pub struct MockOpenAI {
    server: MockServer,
}

impl MockOpenAI {
    /// Start a new mock OpenAI server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Requests received so far as parsed JSON bodies, for the chat endpoint
    pub async fn chat_requests(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/v1/chat/completions")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Number of requests received on the models endpoint
    pub async fn models_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/v1/models")
            .count()
    }

    // =========================================================================
    // GET /v1/models - Key validation
    // =========================================================================

    /// Accept `key` on the models endpoint and reject anything else with 401
    pub async fn mock_models_for_key(&self, key: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("Authorization", format!("Bearer {}", key).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(OpenAITestData::models_list()))
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                OpenAITestData::error_body("Incorrect API key provided", "invalid_api_key"),
            ))
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// Answer the models endpoint with a fixed status and text body
    pub async fn mock_models_status(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /v1/chat/completions - Chat Completions
    // =========================================================================

    /// Stream the given fragments as chat chunks, then `[DONE]`
    pub async fn mock_chat_stream(&self, fragments: &[&str]) {
        let events: Vec<Value> = fragments
            .iter()
            .map(|f| OpenAITestData::chunk(f))
            .collect();
        self.mock_chat_stream_raw(Self::format_sse_stream(&events)).await;
    }

    /// Stream a raw SSE body
    pub async fn mock_chat_stream_raw(&self, body: String) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .insert_header("Content-Type", "text/event-stream")
                    .insert_header("Cache-Control", "no-cache"),
            )
            .mount(&self.server)
            .await;
    }

    /// Fail the streaming request with a status
    pub async fn mock_chat_stream_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(status).set_body_json(
                OpenAITestData::error_body("The server had an error", "server_error"),
            ))
            .mount(&self.server)
            .await;
    }

    /// Answer the blocking request with a chat completion
    pub async fn mock_chat_completion(&self, content: &str) {
        self.mock_chat_completion_json(OpenAITestData::completion(content))
            .await;
    }

    /// Answer the blocking request with an arbitrary document
    pub async fn mock_chat_completion_json(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Fail the blocking request with a status
    pub async fn mock_chat_completion_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(status).set_body_json(
                OpenAITestData::error_body("Rate limit reached", "rate_limit_exceeded"),
            ))
            .mount(&self.server)
            .await;
    }

    /// Format events as an SSE body terminated by `[DONE]`
    pub fn format_sse_stream(events: &[Value]) -> String {
        let mut body = String::new();
        for event in events {
            body.push_str(&format!("data: {}\n\n", event));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }
}

/// Canned OpenAI payloads
pub struct OpenAITestData;

impl OpenAITestData {
    pub fn models_list() -> Value {
        json!({
            "object": "list",
            "data": [
                {"id": "gpt-4o-mini", "object": "model", "owned_by": "openai"},
                {"id": "gpt-4o", "object": "model", "owned_by": "openai"}
            ]
        })
    }

    pub fn error_body(message: &str, code: &str) -> Value {
        json!({
            "error": {"message": message, "type": "invalid_request_error", "code": code}
        })
    }

    pub fn chunk(content: &str) -> Value {
        json!({
            "id": generate_id("chatcmpl"),
            "object": "chat.completion.chunk",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    }

    pub fn completion(content: &str) -> Value {
        json!({
            "id": generate_id("chatcmpl"),
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
    }
}
