//! Failure taxonomy shared by the extractor, summarizer and session.
//!
//! Every failure carries a stable [`ErrorKind`] plus a human-readable message.
//! The kind is what callers match on; the message is what gets displayed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{DocumentId, DocumentStatus};

/// Stable classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    CorruptFile,
    OcrFailure,
    EmptyInput,
    MissingCredential,
    TransientFailureExhausted,
    ProviderRejected,
    EmptyResult,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::CorruptFile => "corrupt_file",
            ErrorKind::OcrFailure => "ocr_failure",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::TransientFailureExhausted => "transient_failure_exhausted",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from [`crate::Extractor::process`].
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),

    #[error("Could not read file: {0}")]
    CorruptFile(String),

    #[error("Text recognition failed: {0}")]
    OcrFailure(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ExtractionError::CorruptFile(_) => ErrorKind::CorruptFile,
            ExtractionError::OcrFailure(_) => ErrorKind::OcrFailure,
            ExtractionError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Errors from [`crate::Summarizer::generate`].
#[derive(Debug, Clone, Error)]
pub enum SummaryError {
    #[error("No text to summarize")]
    EmptyInput,

    #[error("No API key configured")]
    MissingCredential,

    #[error("Summarization failed after {attempts} attempts: {message}")]
    TransientFailureExhausted { attempts: u32, message: String },

    #[error("Summarization request rejected: {0}")]
    ProviderRejected(String),

    #[error("The model returned an empty summary")]
    EmptyResult,

    #[error("Summarization cancelled")]
    Cancelled,
}

impl SummaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::EmptyInput => ErrorKind::EmptyInput,
            SummaryError::MissingCredential => ErrorKind::MissingCredential,
            SummaryError::TransientFailureExhausted { .. } => ErrorKind::TransientFailureExhausted,
            SummaryError::ProviderRejected(_) => ErrorKind::ProviderRejected,
            SummaryError::EmptyResult => ErrorKind::EmptyResult,
            SummaryError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Errors from [`crate::Session`] operations.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Document {0} was removed before its result arrived")]
    Discarded(DocumentId),

    #[error("Cannot move document from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Document {0} has no extracted text")]
    MissingText(DocumentId),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl SessionError {
    /// Pipeline failure kind, if this error came from the extractor or summarizer.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Extraction(e) => Some(e.kind()),
            SessionError::Summary(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::TransientFailureExhausted).unwrap();
        assert_eq!(json, "\"transient_failure_exhausted\"");
        assert_eq!(
            ErrorKind::OcrFailure.to_string(),
            serde_json::to_string(&ErrorKind::OcrFailure)
                .unwrap()
                .trim_matches('"')
        );
    }

    #[test]
    fn test_session_error_exposes_pipeline_kind() {
        let err = SessionError::from(SummaryError::MissingCredential);
        assert_eq!(err.kind(), Some(ErrorKind::MissingCredential));
        assert_eq!(err.to_string(), "No API key configured");

        let err = SessionError::from(ExtractionError::CorruptFile("bad xref".into()));
        assert_eq!(err.kind(), Some(ErrorKind::CorruptFile));
        assert!(err.to_string().contains("bad xref"));

        let err = SessionError::MissingText(DocumentId::new());
        assert_eq!(err.kind(), None);
    }
}
