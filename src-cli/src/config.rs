//! CLI configuration and persisted settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use summarizex_core::{PipelineConfig, SummaryLength, SummaryStyle};

/// Environment variable consulted when `--api-key` is not given
pub const API_KEY_ENV: &str = "SUMMARIZEX_API_KEY";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root config directory (~/.config/summarizex)
    pub config_dir: PathBuf,
    /// User settings (API key, default length and style)
    pub settings_path: PathBuf,
    /// Pipeline tuning (chunking, retries, provider, prompts, OCR)
    pub pipeline_path: PathBuf,
}

impl Config {
    /// Load configuration or use defaults
    pub fn load_or_default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("summarizex");
        Self::in_dir(config_dir)
    }

    /// Configuration rooted at an explicit directory
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            settings_path: config_dir.join("settings.json"),
            pipeline_path: config_dir.join("pipeline.json"),
            config_dir,
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::load(&self.pipeline_path)
    }
}

/// Settings persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub length: SummaryLength,
    pub style: SummaryStyle,
}

impl Settings {
    /// Read settings, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings {}", path.display()))?;
        restrict_permissions(path)
    }

    /// Pick the API key: explicit value (flag or environment) first, then the
    /// stored one. Blank values count as absent.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .into_iter()
            .chain(self.api_key.as_deref())
            .map(str::trim)
            .find(|k| !k.is_empty())
            .map(str::to_string)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
