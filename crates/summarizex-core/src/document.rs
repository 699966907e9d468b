//! Document descriptor and its lifecycle.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, SessionError};
use crate::options::SummaryLength;

/// Opaque document identity, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// Source format of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "declared")]
pub enum DocumentKind {
    Pdf,
    Image,
    /// Anything else; carries the declared MIME type or extension.
    Unsupported(String),
}

impl DocumentKind {
    /// Classify a file by MIME type (when known) or by extension.
    pub fn detect(name: &str, mime: Option<&str>) -> Self {
        if let Some(mime) = mime.map(str::trim).filter(|m| !m.is_empty()) {
            let mime = mime.to_ascii_lowercase();
            if mime.starts_with("image/") {
                return DocumentKind::Image;
            }
            if mime == "application/pdf" {
                return DocumentKind::Pdf;
            }
            return DocumentKind::Unsupported(mime);
        }

        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "pdf" {
            DocumentKind::Pdf
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            DocumentKind::Image
        } else if extension.is_empty() {
            DocumentKind::Unsupported("unknown".to_string())
        } else {
            DocumentKind::Unsupported(extension)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
            DocumentKind::Unsupported(declared) => declared,
        }
    }
}

/// Where a document is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Extracting,
    Extracted,
    Summarizing,
    Completed,
    Error,
}

impl DocumentStatus {
    /// Extraction or summarization is running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DocumentStatus::Extracting | DocumentStatus::Summarizing)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Extracting => write!(f, "extracting"),
            DocumentStatus::Extracted => write!(f, "extracted"),
            DocumentStatus::Summarizing => write!(f, "summarizing"),
            DocumentStatus::Completed => write!(f, "completed"),
            DocumentStatus::Error => write!(f, "error"),
        }
    }
}

/// Last failure recorded on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    pub kind: ErrorKind,
    pub message: String,
}

/// A user-supplied file and everything derived from it this session.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub kind: DocumentKind,
    #[serde(skip)]
    pub file: Bytes,
    pub created_at: DateTime<Utc>,
    status: DocumentStatus,
    text: Option<String>,
    summary: Option<String>,
    error: Option<DocumentError>,
    summary_length: Option<SummaryLength>,
}

impl Document {
    /// A freshly selected file. Extraction starts immediately, so the
    /// initial status is `Extracting`.
    pub fn new(name: impl Into<String>, kind: DocumentKind, file: impl Into<Bytes>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            kind,
            file: file.into(),
            created_at: Utc::now(),
            status: DocumentStatus::Extracting,
            text: None,
            summary: None,
            error: None,
            summary_length: None,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn error(&self) -> Option<&DocumentError> {
        self.error.as_ref()
    }

    pub fn summary_length(&self) -> Option<SummaryLength> {
        self.summary_length
    }

    fn invalid(&self, to: DocumentStatus) -> SessionError {
        SessionError::InvalidTransition {
            from: self.status,
            to,
        }
    }

    /// `Extracting -> Extracted`. The text is fixed for this document from
    /// here on.
    pub fn finish_extraction(&mut self, text: String) -> Result<(), SessionError> {
        match self.status {
            DocumentStatus::Extracting => {
                self.text = Some(text);
                self.status = DocumentStatus::Extracted;
                Ok(())
            }
            DocumentStatus::Extracted
            | DocumentStatus::Summarizing
            | DocumentStatus::Completed
            | DocumentStatus::Error => Err(self.invalid(DocumentStatus::Extracted)),
        }
    }

    /// `Extracted | Completed | Error -> Summarizing`.
    ///
    /// The previous summary is kept until a new one replaces it.
    pub fn begin_summary(&mut self, length: SummaryLength) -> Result<(), SessionError> {
        match self.status {
            DocumentStatus::Extracted | DocumentStatus::Completed | DocumentStatus::Error => {
                if self.text.is_none() {
                    return Err(SessionError::MissingText(self.id));
                }
                self.status = DocumentStatus::Summarizing;
                self.error = None;
                self.summary_length = Some(length);
                Ok(())
            }
            DocumentStatus::Extracting | DocumentStatus::Summarizing => {
                Err(self.invalid(DocumentStatus::Summarizing))
            }
        }
    }

    /// `Summarizing -> Completed`.
    pub fn finish_summary(&mut self, summary: String) -> Result<(), SessionError> {
        match self.status {
            DocumentStatus::Summarizing => {
                self.summary = Some(summary);
                self.status = DocumentStatus::Completed;
                Ok(())
            }
            DocumentStatus::Extracting
            | DocumentStatus::Extracted
            | DocumentStatus::Completed
            | DocumentStatus::Error => Err(self.invalid(DocumentStatus::Completed)),
        }
    }

    /// `Extracting | Summarizing -> Error`.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) -> Result<(), SessionError> {
        match self.status {
            DocumentStatus::Extracting | DocumentStatus::Summarizing => {
                self.error = Some(DocumentError {
                    kind,
                    message: message.into(),
                });
                self.status = DocumentStatus::Error;
                Ok(())
            }
            DocumentStatus::Extracted | DocumentStatus::Completed | DocumentStatus::Error => {
                Err(self.invalid(DocumentStatus::Error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted_doc() -> Document {
        let mut doc = Document::new("report.pdf", DocumentKind::Pdf, vec![1, 2, 3]);
        doc.finish_extraction("Some text".to_string()).unwrap();
        doc
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(DocumentKind::detect("a.PDF", None), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("scan.jpeg", None), DocumentKind::Image);
        assert_eq!(
            DocumentKind::detect("whatever", Some("image/webp")),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::detect("file.bin", Some("application/pdf")),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect("notes.docx", None),
            DocumentKind::Unsupported("docx".to_string())
        );
        assert_eq!(
            DocumentKind::detect("README", None),
            DocumentKind::Unsupported("unknown".to_string())
        );
        assert_eq!(
            DocumentKind::detect("a.pdf", Some("text/plain")),
            DocumentKind::Unsupported("text/plain".to_string())
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Document::new("a.pdf", DocumentKind::Pdf, Vec::new());
        let b = Document::new("a.pdf", DocumentKind::Pdf, Vec::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut doc = Document::new("report.pdf", DocumentKind::Pdf, vec![1]);
        assert_eq!(doc.status(), DocumentStatus::Extracting);
        assert!(doc.status().is_in_progress());

        doc.finish_extraction("Body".to_string()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Extracted);
        assert_eq!(doc.text(), Some("Body"));

        doc.begin_summary(SummaryLength::Short).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Summarizing);
        assert_eq!(doc.summary_length(), Some(SummaryLength::Short));

        doc.finish_summary("Summary".to_string()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Completed);
        assert!(!doc.status().is_in_progress());
        assert_eq!(doc.summary(), Some("Summary"));
    }

    #[test]
    fn test_text_is_set_once() {
        let mut doc = extracted_doc();
        let err = doc.finish_extraction("Other".to_string()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: DocumentStatus::Extracted,
                to: DocumentStatus::Extracted
            }
        ));
        assert_eq!(doc.text(), Some("Some text"));
    }

    #[test]
    fn test_regenerate_keeps_stale_summary_until_success() {
        let mut doc = extracted_doc();
        doc.begin_summary(SummaryLength::Medium).unwrap();
        doc.finish_summary("First".to_string()).unwrap();

        doc.begin_summary(SummaryLength::Long).unwrap();
        assert_eq!(doc.summary(), Some("First"));
        doc.finish_summary("Second".to_string()).unwrap();
        assert_eq!(doc.summary(), Some("Second"));
        assert_eq!(doc.summary_length(), Some(SummaryLength::Long));
    }

    #[test]
    fn test_regenerate_from_error_clears_error() {
        let mut doc = extracted_doc();
        doc.begin_summary(SummaryLength::Medium).unwrap();
        doc.fail(ErrorKind::TransientFailureExhausted, "503").unwrap();
        assert_eq!(doc.status(), DocumentStatus::Error);
        assert_eq!(doc.error().unwrap().message, "503");

        doc.begin_summary(SummaryLength::Medium).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Summarizing);
        assert!(doc.error().is_none());
    }

    #[test]
    fn test_failed_extraction_cannot_be_summarized() {
        let mut doc = Document::new("scan.png", DocumentKind::Image, vec![0]);
        doc.fail(ErrorKind::CorruptFile, "bad image").unwrap();
        let err = doc.begin_summary(SummaryLength::Short).unwrap_err();
        assert!(matches!(err, SessionError::MissingText(id) if id == doc.id));
        assert_eq!(doc.status(), DocumentStatus::Error);
    }

    #[test]
    fn test_rejects_out_of_order_transitions() {
        let mut doc = Document::new("report.pdf", DocumentKind::Pdf, vec![1]);
        assert!(doc.begin_summary(SummaryLength::Short).is_err());
        assert!(doc.finish_summary("x".to_string()).is_err());

        let mut doc = extracted_doc();
        assert!(doc.fail(ErrorKind::OcrFailure, "late").is_err());
        assert_eq!(doc.status(), DocumentStatus::Extracted);
    }
}
