//! Google Gemini provider
//!
//! Uses the Generative Language `generateContent` endpoint with the key in the
//! `x-goog-api-key` header.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    classify_status, CompletionRequest, Credential, ProviderError, ProviderSettings,
    SummaryProvider,
};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Output tokens budgeted per requested word
const TOKENS_PER_WORD: u32 = 2;

/// Gemini API provider
pub struct GeminiProvider {
    client: reqwest::Client,
    settings: ProviderSettings,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    pub fn with_client(client: reqwest::Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn headers(credential: &Credential) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(credential.expose())
            .map_err(|_| ProviderError::Terminal("Invalid API key format".to_string()))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Token cap for an answer of at most `words` words, never above the
    /// configured maximum.
    fn token_budget(&self, words: usize) -> u32 {
        u32::try_from(words)
            .unwrap_or(u32::MAX)
            .saturating_mul(TOKENS_PER_WORD)
            .clamp(1, self.settings.max_output_tokens.max(1))
    }

    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            system_instruction: (!request.system.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system.clone(),
                }],
            }),
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.token_budget(request.max_output_words),
            },
        }
    }
}

#[async_trait]
impl SummaryProvider for GeminiProvider {
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(self.url())
            .headers(Self::headers(credential)?)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        debug!(
            model = %self.settings.model,
            status = status.as_u16(),
            bytes = text.len(),
            "Gemini response received"
        );

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &error_message(&text)));
        }

        parse_response(&text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_builder() {
        ProviderError::Terminal(format!("Invalid request: {}", e))
    } else {
        ProviderError::Transient(format!("Request failed: {}", e))
    }
}

/// Pull `error.message` out of an error body, or return the body as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Concatenate the text parts of the first candidate.
fn parse_response(body: &str) -> Result<String, ProviderError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Terminal(format!("Malformed response: {}", e)))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Terminal(format!(
            "Request blocked by content policy: {}",
            reason
        )));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(String::new());
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT") {
                return Err(ProviderError::Terminal(format!(
                    "Response blocked by content policy: {}",
                    reason
                )));
            }
        }
    }

    Ok(text)
}

// Gemini API types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
