//! API key validator
//!
//! Checks a key with one read-only call to the models-listing endpoint and
//! classifies the outcome. Nothing escapes as an error: every attempt produces
//! a `ValidationResult`.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::credential::{Credential, API_KEY_ENV};
use crate::error::{AppError, AppResult};
use crate::provider::headers::build_probe_headers;
use crate::telemetry;

/// Maximum characters kept from a non-JSON response body
pub const BODY_PREVIEW_CHARS: usize = 2000;

/// Outcome category of a validation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Valid,
    Unauthorized,
    Forbidden,
    RateLimited,
    RequestFailed,
    Timeout,
    Network,
    MissingCredential,
}

impl KeyStatus {
    /// Classify a received HTTP status
    pub fn from_status_code(code: u16) -> Self {
        match code {
            200 => KeyStatus::Valid,
            401 => KeyStatus::Unauthorized,
            403 => KeyStatus::Forbidden,
            429 => KeyStatus::RateLimited,
            _ => KeyStatus::RequestFailed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Valid => "valid",
            KeyStatus::Unauthorized => "unauthorized",
            KeyStatus::Forbidden => "forbidden",
            KeyStatus::RateLimited => "rate_limited",
            KeyStatus::RequestFailed => "request_failed",
            KeyStatus::Timeout => "timeout",
            KeyStatus::Network => "network",
            KeyStatus::MissingCredential => "missing_credential",
        }
    }

    /// Headline shown to the user
    pub fn label(&self, status_code: Option<u16>) -> String {
        match self {
            KeyStatus::Valid => format!("Key is valid (HTTP {})", status_code.unwrap_or(200)),
            KeyStatus::Unauthorized => {
                "Unauthorized (HTTP 401): The API key is invalid or revoked.".to_string()
            }
            KeyStatus::Forbidden => {
                "Forbidden (HTTP 403): The key may lack permissions.".to_string()
            }
            KeyStatus::RateLimited => {
                "Rate limited (HTTP 429): Too many requests for this key.".to_string()
            }
            KeyStatus::RequestFailed => match status_code {
                Some(code) => format!("Request failed (HTTP {})", code),
                None => "Request failed.".to_string(),
            },
            KeyStatus::Timeout => "Request timed out.".to_string(),
            KeyStatus::Network => "Network error.".to_string(),
            KeyStatus::MissingCredential => {
                format!("Please provide an API key (or set {}).", API_KEY_ENV)
            }
        }
    }

    /// Remediation hint, if there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            KeyStatus::Valid => None,
            KeyStatus::Unauthorized => Some("Confirm the key hasn't expired or been revoked."),
            KeyStatus::Forbidden => {
                Some("Check that the key's project or organization has access to this API.")
            }
            KeyStatus::RateLimited => Some("Wait a moment and retry, or check the key's quota."),
            KeyStatus::RequestFailed => Some("Inspect the server response below for details."),
            KeyStatus::Timeout | KeyStatus::Network => Some(
                "Check internet access, or whether your environment blocks outbound HTTPS.",
            ),
            KeyStatus::MissingCredential => {
                Some("Export OPENAI_API_KEY='sk-...' or paste the key when prompted.")
            }
        }
    }
}

/// Captured response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyPreview {
    Json(Value),
    Text(String),
}

impl BodyPreview {
    /// Build a preview from a response body
    pub fn capture(content_type: Option<&str>, body: &str) -> Self {
        let is_json = content_type
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        if is_json {
            match serde_json::from_str(body) {
                Ok(value) => return BodyPreview::Json(value),
                Err(e) => debug!(error = %e, "JSON response body did not parse, keeping text"),
            }
        }

        BodyPreview::Text(body.chars().take(BODY_PREVIEW_CHARS).collect())
    }

    /// JSON document for display; anything but an object is wrapped as `{"text": ...}`
    pub fn to_json(&self) -> Value {
        match self {
            BodyPreview::Json(value) if value.is_object() => value.clone(),
            BodyPreview::Json(value) => json!({ "text": value }),
            BodyPreview::Text(text) => json!({ "text": text }),
        }
    }
}

/// Result of one validation attempt
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub status: KeyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<BodyPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn failed(status: KeyStatus, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            status_code: None,
            body_preview: None,
            error: Some(error.into()),
        }
    }

    fn received(status_code: u16, body_preview: BodyPreview) -> Self {
        let status = KeyStatus::from_status_code(status_code);
        Self {
            ok: status == KeyStatus::Valid,
            status,
            status_code: Some(status_code),
            body_preview: Some(body_preview),
            error: None,
        }
    }

    /// Headline for this result
    pub fn label(&self) -> String {
        self.status.label(self.status_code)
    }
}

/// Curl command equivalent to the validation call; never includes the key
pub fn curl_equivalent(base_url: &str) -> String {
    format!(
        "curl {}/models -H \"Authorization: Bearer ${}\"",
        base_url.trim_end_matches('/'),
        API_KEY_ENV
    )
}

/// Key validator bound to one API base URL
pub struct KeyValidator {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl KeyValidator {
    /// Create a new validator
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.openai_api_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.validate_timeout(),
        }
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    /// Validate a raw key; a blank key makes no request
    pub async fn validate(&self, key: &str) -> ValidationResult {
        match Credential::new(key) {
            Ok(credential) => self.validate_credential(&credential).await,
            Err(e) => {
                telemetry::record_validation(KeyStatus::MissingCredential.as_str(), 0.0);
                ValidationResult::failed(KeyStatus::MissingCredential, e.user_message())
            }
        }
    }

    /// Validate a resolved credential
    #[instrument(skip(self, credential), fields(key = %credential.fingerprint()))]
    pub async fn validate_credential(&self, credential: &Credential) -> ValidationResult {
        let started = Instant::now();

        let result = match build_probe_headers(credential.expose(), &self.user_agent) {
            Ok(headers) => self.probe(headers).await,
            Err(e) => ValidationResult::failed(KeyStatus::RequestFailed, e.user_message()),
        };

        let elapsed = started.elapsed().as_secs_f64();
        telemetry::record_validation(result.status.as_str(), elapsed);
        info!(
            status = result.status.as_str(),
            status_code = ?result.status_code,
            duration_ms = %format!("{:.2}", elapsed * 1000.0),
            "Key validation completed"
        );

        result
    }

    async fn probe(&self, headers: HeaderMap) -> ValidationResult {
        let url = self.models_url();
        debug!(url = %url, "Probing models endpoint");

        match self.fetch(&url, headers).await {
            Ok((status_code, preview)) => ValidationResult::received(status_code, preview),
            Err(AppError::Timeout) => {
                warn!(url = %url, "Validation request timed out");
                ValidationResult::failed(KeyStatus::Timeout, "Request timed out.")
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Validation request failed");
                ValidationResult::failed(KeyStatus::Network, e.to_string())
            }
        }
    }

    async fn fetch(&self, url: &str, headers: HeaderMap) -> AppResult<(u16, BodyPreview)> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Models endpoint response status");

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok((
            status.as_u16(),
            BodyPreview::capture(content_type.as_deref(), &body),
        ))
    }
}
