//! API credential handling
//!
//! The key is opaque: it is never shape-checked, only proven valid or invalid
//! by the provider. It is never logged; logs carry a short fingerprint instead.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Environment variable consulted first when resolving a key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// A caller-supplied API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting blank input before any network call
    pub fn new(key: impl Into<String>) -> AppResult<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(AppError::MissingCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Resolve a key, preferring the environment value over the interactive fallback
    ///
    /// `prompt` is only invoked when the environment value is absent or blank.
    pub fn resolve<F>(env_value: Option<String>, prompt: F) -> AppResult<Self>
    where
        F: FnOnce() -> AppResult<String>,
    {
        if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
            return Self::new(value);
        }
        Self::new(prompt()?)
    }

    /// The raw secret, for building the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..8].to_string()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted {}>)", self.fingerprint())
    }
}
