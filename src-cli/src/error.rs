//! Command error types for CLI output
//!
//! Provides structured errors that serialize to `{"code": "...", "message": "..."}`
//! for `--json` output.

use serde::Serialize;
use summarizex_core::{ErrorKind, SessionError};

/// Errors returned by CLI commands
///
/// Each variant serializes with a snake_case `code` field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CommandError {
    // Validation errors
    InvalidInput { message: String },
    FileNotFound { message: String, path: String },

    // Configuration errors
    MissingApiKey { message: String },

    // Operation errors
    /// Extraction or summarization failed for at least one document
    PipelineError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
    },
    Interrupted { message: String },
    StorageError { message: String },
    InternalError { message: String },
}

impl CommandError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::FileNotFound {
            message: format!("File not found: {}", path),
            path,
        }
    }

    pub fn missing_api_key() -> Self {
        Self::MissingApiKey {
            message: "No API key configured. Run `summarizex set-key <KEY>` or set SUMMARIZEX_API_KEY."
                .to_string(),
        }
    }

    /// `failed` of `total` documents did not finish.
    pub fn documents_failed(failed: usize, total: usize) -> Self {
        Self::PipelineError {
            message: format!("{} of {} documents failed", failed, total),
            kind: None,
        }
    }

    pub fn interrupted() -> Self {
        Self::Interrupted {
            message: "Interrupted; in-flight work was cancelled".to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "{}", message),
            Self::FileNotFound { message, .. } => write!(f, "{}", message),
            Self::MissingApiKey { message } => write!(f, "{}", message),
            Self::PipelineError { message, .. } => write!(f, "{}", message),
            Self::Interrupted { message } => write!(f, "{}", message),
            Self::StorageError { message } => write!(f, "{}", message),
            Self::InternalError { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CommandError {}

// Conversion from anyhow::Error (config and settings plumbing)
impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", err))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<SessionError> for CommandError {
    fn from(err: SessionError) -> Self {
        Self::PipelineError {
            message: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Result type alias for commands
pub type CommandResult<T> = Result<T, CommandError>;

/// Extension trait for converting Results to CommandResult
pub trait ResultExt<T> {
    fn storage_err(self) -> CommandResult<T>;
    fn internal_err(self) -> CommandResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn storage_err(self) -> CommandResult<T> {
        self.map_err(|e| CommandError::storage(e.to_string()))
    }

    fn internal_err(self) -> CommandResult<T> {
        self.map_err(|e| CommandError::internal(e.to_string()))
    }
}
