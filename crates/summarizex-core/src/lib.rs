//! SummarizeX Core - Document extraction and summarization pipeline
//!
//! This crate contains everything below the user interface:
//! - Text extraction from PDFs (lopdf) and images (OCR via tesseract)
//! - Summary generation through a remote LLM (Gemini via reqwest)
//! - Map-reduce summarization of long documents (text-splitter)
//! - The per-session document lifecycle
//!
//! It never reads the environment or persistent storage; the caller supplies
//! configuration, files and the API key.

pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod ocr;
pub mod options;
pub mod progress;
pub mod session;
pub mod summarizer;

pub use config::PipelineConfig;
pub use document::{Document, DocumentError, DocumentId, DocumentKind, DocumentStatus};
pub use error::{ErrorKind, ExtractionError, SessionError, SummaryError};
pub use extractor::Extractor;
pub use ocr::{OcrConfig, OcrEngine, OcrEngineFactory, OcrError, TesseractEngine};
pub use options::{SummaryLength, SummaryOptions, SummaryStyle};
pub use progress::{ProgressEvent, ProgressSink, Stage};
pub use session::{Session, SessionStats};
pub use summarizer::{
    Credential, GeminiProvider, ProviderError, ProviderSettings, Summarizer, SummaryProvider,
};
