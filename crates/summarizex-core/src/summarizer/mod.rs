//! Summary generation.
//!
//! [`Summarizer`] turns extracted text into a summary through a
//! [`SummaryProvider`]. Inputs over the configured size are summarized in
//! chunks first and the chunk summaries are then combined in one final pass.

pub mod prompt;
pub mod provider;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::SummaryError;
use crate::options::SummaryOptions;
use crate::progress::{ProgressSink, Stage};

pub use prompt::{word_count, ChunkingConfig, LengthBand, PromptTable};
pub use provider::gemini::GeminiProvider;
pub use provider::{
    classify_status, CompletionRequest, Credential, ProviderError, ProviderSettings,
    SummaryProvider,
};
pub use retry::RetryPolicy;

/// Generates summaries for extracted document text.
///
/// Shared by every in-flight document. The only mutable state is the API key,
/// which each [`Summarizer::generate`] call reads once when it starts.
pub struct Summarizer {
    provider: Arc<dyn SummaryProvider>,
    prompts: PromptTable,
    chunking: ChunkingConfig,
    retry: RetryPolicy,
    request_timeout: Duration,
    length_tolerance: f32,
    credential: RwLock<Option<Credential>>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn SummaryProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            prompts: config.prompts.clone(),
            chunking: config.chunking.clone(),
            retry: config.retry.clone(),
            request_timeout: config.request_timeout(),
            length_tolerance: config.length_tolerance,
            credential: RwLock::new(None),
        }
    }

    /// Summarizer backed by Gemini with the configured provider settings.
    pub fn with_gemini(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(GeminiProvider::new(config.provider.clone())),
            config,
        )
    }

    /// Replace the API key. An empty key clears it.
    ///
    /// Calls already running keep the key they started with.
    pub async fn set_api_key(&self, key: &str) {
        let credential = Credential::new(key);
        let configured = credential.is_some();
        *self.credential.write().await = credential;
        info!(
            provider = self.provider.provider_name(),
            configured, "API key updated"
        );
    }

    pub async fn has_api_key(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Generate a summary of `text` at the requested length and style.
    ///
    /// Fails with [`SummaryError::EmptyInput`] or
    /// [`SummaryError::MissingCredential`] before any request is made.
    pub async fn generate(
        &self,
        text: &str,
        options: &SummaryOptions,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        let credential = self
            .credential
            .read()
            .await
            .clone()
            .ok_or(SummaryError::MissingCredential)?;

        if cancel.is_cancelled() {
            return Err(SummaryError::Cancelled);
        }

        let chars = text.chars().count();
        info!(
            name = %progress.document_name(),
            provider = self.provider.provider_name(),
            model = self.provider.model_id(),
            chars,
            length = %options.length,
            style = %options.style,
            "Generating summary"
        );

        progress.emit(Stage::SendingRequest, "sending request", None);

        let summary = if self.chunking.needs_chunking(text) {
            self.map_reduce(text, options, &credential, progress, cancel)
                .await?
        } else {
            let request = self.prompts.summary_request(text, options);
            self.complete_with_retry(&credential, &request, cancel)
                .await?
        };

        // A call can finish after the token fired; its result is discarded
        if cancel.is_cancelled() {
            return Err(SummaryError::Cancelled);
        }

        let band = self.prompts.length(options.length);
        let words = word_count(&summary);
        if !band.accepts(words, self.length_tolerance) {
            warn!(
                name = %progress.document_name(),
                words,
                min_words = band.min_words,
                max_words = band.max_words,
                "Summary length outside requested band"
            );
        }

        progress.emit(Stage::Done, "done", Some(1.0));
        info!(name = %progress.document_name(), words, "Summary generated");

        Ok(summary)
    }

    async fn map_reduce(
        &self,
        text: &str,
        options: &SummaryOptions,
        credential: &Credential,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let chunks = self.chunking.split(text);
        let total = chunks.len();
        debug!(
            name = %progress.document_name(),
            chunks = total,
            max_input_chars = self.chunking.max_input_chars,
            "Input over size limit, summarizing in parts"
        );

        let mut partials = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SummaryError::Cancelled);
            }
            let n = i + 1;
            progress.emit(
                Stage::SummarizingPart,
                format!("summarizing part {} of {}", n, total),
                Some(i as f32 / (total + 1) as f32),
            );
            let request = self.prompts.chunk_request(chunk, n, total);
            partials.push(self.complete_with_retry(credential, &request, cancel).await?);
        }

        if cancel.is_cancelled() {
            return Err(SummaryError::Cancelled);
        }
        progress.emit(
            Stage::CombiningResults,
            "combining results",
            Some(total as f32 / (total + 1) as f32),
        );

        let combined_chars: usize = partials.iter().map(|p| p.chars().count()).sum();
        if combined_chars > self.chunking.max_input_chars {
            let per_part = (self.chunking.max_input_chars / total.max(1)).max(1);
            warn!(
                name = %progress.document_name(),
                combined_chars,
                per_part,
                "Part summaries exceed size limit, truncating before combining"
            );
            for partial in partials.iter_mut() {
                if partial.chars().count() > per_part {
                    *partial = partial.chars().take(per_part).collect();
                }
            }
        }

        let request = self.prompts.combine_request(&partials, options);
        self.complete_with_retry(credential, &request, cancel).await
    }

    /// One provider call with timeout, cancellation and transient retries.
    ///
    /// Returns the trimmed, non-empty completion text.
    async fn complete_with_retry(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let attempts = self.retry.attempts();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
                result = tokio::time::timeout(
                    self.request_timeout,
                    self.provider.complete(credential, request),
                ) => result,
            };

            let message = match outcome {
                Ok(Ok(text)) => {
                    let text = text.trim();
                    if text.is_empty() {
                        warn!(attempt = attempt + 1, "Provider returned an empty completion");
                        return Err(SummaryError::EmptyResult);
                    }
                    return Ok(text.to_string());
                }
                Ok(Err(ProviderError::Terminal(message))) => {
                    warn!(attempt = attempt + 1, "Provider rejected request: {}", message);
                    return Err(SummaryError::ProviderRejected(message));
                }
                Ok(Err(ProviderError::Transient(message))) => message,
                Err(_) => format!(
                    "Request timed out after {} ms",
                    self.request_timeout.as_millis()
                ),
            };

            warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                "Transient provider failure: {}",
                message
            );
            last_error = message;

            if attempt + 1 < attempts {
                let delay = self.retry.backoff(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::error!(attempts, "Giving up after transient failures: {}", last_error);
        Err(SummaryError::TransientFailureExhausted {
            attempts,
            message: last_error,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::provider::{CompletionRequest, Credential, ProviderError, SummaryProvider};

    /// Provider double that replays a script, then falls back to a fixed answer.
    pub struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        fallback: String,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        keys: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new(script: Vec<Result<String, ProviderError>>, fallback: &str) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback: fallback.to_string(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                keys: Mutex::new(Vec::new()),
            })
        }

        pub fn always(answer: &str) -> Arc<Self> {
            Self::new(Vec::new(), answer)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn keys(&self) -> Vec<String> {
            self.keys.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SummaryProvider for ScriptedProvider {
        async fn complete(
            &self,
            credential: &Credential,
            request: &CompletionRequest,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.keys
                .lock()
                .unwrap()
                .push(credential.expose().to_string());
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }
    }

    /// `n` words of filler text.
    pub fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }
}
