//! Document text extraction.
//!
//! One [`Extractor`] serves the whole session. PDFs go through the embedded
//! text layer page by page; images get a single OCR pass through the pooled
//! [`OcrEngine`], which is created on first use and released by
//! [`Extractor::cleanup`].
//!
//! Parsing and recognition run on tokio's blocking pool so progress events
//! keep flowing to the caller while the work continues.

pub mod pdf;

use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::document::{Document, DocumentKind};
use crate::error::ExtractionError;
use crate::ocr::{OcrConfig, OcrEngine, OcrEngineFactory, TesseractEngine};
use crate::progress::{ProgressSink, Stage};

pub use pdf::PAGE_SEPARATOR;

/// Converts a document's raw payload into plain text.
pub struct Extractor {
    factory: Box<dyn OcrEngineFactory>,
    /// Pooled engine, created lazily and shared by every image extraction
    engine: Mutex<Option<Arc<dyn OcrEngine>>>,
}

impl Extractor {
    pub fn new(factory: impl OcrEngineFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            engine: Mutex::new(None),
        }
    }

    /// Extractor backed by the tesseract command-line engine.
    pub fn with_tesseract(config: OcrConfig) -> Self {
        Self::new(TesseractEngine::factory(config))
    }

    /// Extract the text of `document`.
    ///
    /// Unsupported kinds fail before any progress is emitted. An extraction
    /// that finds no text returns an empty string rather than an error.
    pub async fn process(
        &self,
        document: &Document,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, ExtractionError> {
        let result = match &document.kind {
            DocumentKind::Unsupported(declared) => {
                tracing::debug!(doc_id = %document.id, declared = %declared, "Unsupported document kind");
                return Err(ExtractionError::UnsupportedFormat(declared.clone()));
            }
            _ if document.file.is_empty() => {
                return Err(ExtractionError::CorruptFile("File is empty".to_string()));
            }
            DocumentKind::Pdf => {
                self.log_start(document);
                self.extract_pdf(document, progress, cancel).await
            }
            DocumentKind::Image => {
                self.log_start(document);
                self.extract_image(document, progress, cancel).await
            }
        };

        match &result {
            Ok(text) => tracing::info!(
                doc_id = %document.id,
                chars = text.len(),
                "Extraction complete"
            ),
            Err(ExtractionError::Cancelled) => {
                tracing::info!(doc_id = %document.id, "Extraction cancelled")
            }
            Err(e) => tracing::error!(doc_id = %document.id, error = %e, "Extraction failed"),
        }

        result
    }

    fn log_start(&self, document: &Document) {
        tracing::info!(
            doc_id = %document.id,
            name = %document.name,
            kind = document.kind.as_str(),
            bytes = document.file.len(),
            "Extracting document"
        );
    }

    async fn extract_pdf(
        &self,
        document: &Document,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, ExtractionError> {
        let bytes = document.file.clone();
        let progress = progress.clone();
        let task_cancel = cancel.clone();

        // The task notices the token between pages; parsing itself cannot be
        // interrupted, so a cancelled call returns without waiting for it
        let parsing = tokio::task::spawn_blocking(move || {
            pdf::extract_pages(&bytes, &progress, &task_cancel)
        });

        let pages = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),

            joined = parsing => joined
                .map_err(|e| ExtractionError::CorruptFile(format!("PDF parser crashed: {}", e)))??,
        };

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        Ok(pdf::join_pages(&pages))
    }

    async fn extract_image(
        &self,
        document: &Document,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, ExtractionError> {
        let bytes = document.file.clone();
        let image: DynamicImage =
            tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
                .await
                .map_err(|e| ExtractionError::CorruptFile(format!("Image decoder crashed: {}", e)))?
                .map_err(|e| ExtractionError::CorruptFile(format!("Failed to decode image: {}", e)))?;

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let engine = self.engine().await?;

        progress.emit(Stage::RecognizingText, "recognizing text", None);
        tracing::debug!(
            doc_id = %document.id,
            engine = engine.name(),
            width = image.width(),
            height = image.height(),
            "Running OCR"
        );

        // The bitmap moves into the task and is freed when recognition ends
        let recognition = tokio::task::spawn_blocking(move || engine.recognize(&image));

        let text = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),

            joined = recognition => joined
                .map_err(|e| ExtractionError::OcrFailure(format!("OCR task crashed: {}", e)))?
                .map_err(|e| ExtractionError::OcrFailure(e.to_string()))?,
        };

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        progress.emit(Stage::TextRecognized, "text recognized", Some(1.0));

        Ok(text.trim().to_string())
    }

    /// Get the pooled engine, creating it on first use.
    async fn engine(&self) -> Result<Arc<dyn OcrEngine>, ExtractionError> {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        let engine = self
            .factory
            .create()
            .map_err(|e| ExtractionError::OcrFailure(e.to_string()))?;
        tracing::info!(engine = engine.name(), "OCR engine initialized");
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Release the pooled OCR engine.
    ///
    /// Idempotent: with no engine alive this does nothing. A later image
    /// extraction creates a fresh engine.
    pub async fn cleanup(&self) {
        let engine = self.engine.lock().await.take();
        if let Some(engine) = engine {
            engine.terminate();
            tracing::info!(engine = engine.name(), "OCR engine released");
        }
    }
}
