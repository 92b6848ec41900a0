//! OpenAI chat client
//!
//! Sends chat completion requests to an OpenAI-compatible API, either as an
//! SSE stream or as a single JSON document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{debug, error, info, instrument};

use super::headers::build_default_headers;
use super::transport::{ChatTransport, EventStream};
use crate::chat::normalize::CompletionShape;
use crate::chat::types::ChatRequest;
use crate::config::Config;
use crate::credential::Credential;
use crate::error::{AppError, AppResult};
use crate::streaming::decode_event_stream;

/// OpenAI client bound to one credential
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    chat_timeout: Duration,
    key_fingerprint: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(client: reqwest::Client, config: &Config, credential: &Credential) -> AppResult<Self> {
        Ok(Self {
            client,
            base_url: config.openai_api_url.clone(),
            headers: build_default_headers(credential.expose(), &config.user_agent)?,
            chat_timeout: config.chat_timeout(),
            key_fingerprint: credential.fingerprint(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// POST the request and fail on any non-success status
    async fn post(&self, request: &ChatRequest) -> AppResult<reqwest::Response> {
        let url = self.chat_url();

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .timeout(self.chat_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send request to OpenAI");
                AppError::from(e)
            })?;

        let status = response.status();
        debug!(url = %url, status = %status, "Received response from OpenAI");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "OpenAI request failed");
            return Err(AppError::from_status(status.as_u16(), text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for OpenAIClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len(), key = %self.key_fingerprint))]
    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<EventStream> {
        info!("Opening streaming chat completion");
        let response = self.post(&request.streaming()).await?;
        Ok(decode_event_stream(response.bytes_stream()))
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len(), key = %self.key_fingerprint))]
    async fn complete_chat(&self, request: &ChatRequest) -> AppResult<CompletionShape> {
        info!("Sending blocking chat completion");
        let response = self.post(&request.blocking()).await?;

        let body = response.text().await?;
        let shape: CompletionShape = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body_len = body.len(), "Failed to parse completion response");
            AppError::Json(e)
        })?;

        Ok(shape)
    }
}
