//! Pipeline configuration.
//!
//! Every tunable of the extractor and summarizer lives here with a documented
//! default. Missing fields in a config file take their default value.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ocr::OcrConfig;
use crate::summarizer::{ChunkingConfig, PromptTable, ProviderSettings, RetryPolicy};

/// Configuration for one pipeline session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When to switch to map-reduce summarization (default 24 000 chars)
    pub chunking: ChunkingConfig,
    /// Retry schedule for transient provider failures
    pub retry: RetryPolicy,
    /// Upper bound on a single provider call (default 60 s)
    pub request_timeout_ms: u64,
    /// How far outside the length band a summary may fall before a warning
    pub length_tolerance: f32,
    pub provider: ProviderSettings,
    pub prompts: PromptTable,
    pub ocr: OcrConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            retry: RetryPolicy::default(),
            request_timeout_ms: 60_000,
            length_tolerance: 0.5,
            provider: ProviderSettings::default(),
            prompts: PromptTable::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load from `path`, or use defaults when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = ?path, "No pipeline config file, using defaults");
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!(path = ?path, "Loaded pipeline config");
                config
            }
            Err(e) => {
                tracing::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SummaryLength;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunking.max_input_chars, 24_000);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.retry.max_delay_ms, 8_000);
        assert_eq!(config.retry.jitter_ms, 250);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{"retry": {"max_attempts": 2}, "chunking": {"max_input_chars": 5000}}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.chunking.max_input_chars, 5000);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(
            config.prompts.length(SummaryLength::Medium),
            PromptTable::default().length(SummaryLength::Medium)
        );
    }

    #[test]
    fn test_missing_or_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(PipelineConfig::load(&missing), PipelineConfig::default());

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, "{ not json").unwrap();
        assert_eq!(PipelineConfig::load(&invalid), PipelineConfig::default());
        assert!(PipelineConfig::from_file(&invalid).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.json");
        let mut config = PipelineConfig::default();
        config.request_timeout_ms = 5_000;
        config.provider.model = "gemini-test".to_string();

        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path), config);
    }
}
