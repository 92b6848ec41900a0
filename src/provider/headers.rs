//! Header construction for provider requests
//!
//! Only the headers the provider needs are sent: bearer authorization, the
//! user agent and, for requests with a body, the JSON content type.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

use crate::error::{AppError, AppResult};

/// Headers for read-only probes (no request body)
pub fn build_probe_headers(api_key: &str, user_agent: &str) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .map_err(|_| AppError::MalformedCredential)?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|_| AppError::Config(format!("Invalid user agent: {:?}", user_agent)))?,
    );

    Ok(headers)
}

/// Headers for JSON requests
pub fn build_default_headers(api_key: &str, user_agent: &str) -> AppResult<HeaderMap> {
    let mut headers = build_probe_headers(api_key, user_agent)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
