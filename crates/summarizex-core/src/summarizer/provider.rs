//! Summarization provider abstraction
//!
//! A provider turns one [`CompletionRequest`] into text. It knows nothing
//! about retries, chunking or progress; it only reports whether a failure is
//! worth retrying.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API key for the summarization provider.
///
/// Cheap to clone; the key itself never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Returns `None` for an empty or whitespace-only key.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(Arc::from(key)))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(***)")
    }
}

/// One prompt sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Upper bound on the answer length the prompt asks for
    pub max_output_words: usize,
}

/// Provider failure, classified for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Worth retrying: rate limits, server errors, dropped connections, timeouts
    #[error("{0}")]
    Transient(String),

    /// Retrying cannot help: bad key, malformed request, content rejected
    #[error("{0}")]
    Terminal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ProviderError::Transient(msg) | ProviderError::Terminal(msg) => msg,
        }
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: u16, body: &str) -> ProviderError {
    let message = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };
    match status {
        408 | 429 | 500 | 502 | 503 | 504 => ProviderError::Transient(message),
        _ => ProviderError::Terminal(message),
    }
}

/// Text generation backend
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Run a single completion. Called once per attempt by the summarizer.
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError>;

    /// Get the provider name (e.g., "gemini")
    fn provider_name(&self) -> &'static str;

    /// Get the model identifier
    fn model_id(&self) -> &str;
}

/// Endpoint and generation parameters for the shipped provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL, without the `/models/...` suffix
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: gemini::DEFAULT_ENDPOINT.to_string(),
            model: gemini::DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}
