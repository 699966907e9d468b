//! Session controller
//!
//! Owns the documents selected in one session and drives each through
//! extraction and summarization. Documents move independently; the only
//! state they share is the extractor's OCR engine and the summarizer's key.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::document::{Document, DocumentId, DocumentKind, DocumentStatus};
use crate::error::SessionError;
use crate::extractor::Extractor;
use crate::options::SummaryOptions;
use crate::progress::ProgressSink;
use crate::summarizer::Summarizer;

/// Document counts as shown in the statistics panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: usize,
    pub completed: usize,
    /// Extracting or summarizing
    pub in_progress: usize,
    pub errors: usize,
}

struct Entry {
    document: Document,
    /// Insertion order, for newest-first listing
    seq: u64,
    /// Token of the call currently running for this document
    in_flight: Option<CancellationToken>,
}

#[derive(Default)]
struct Documents {
    entries: HashMap<DocumentId, Entry>,
    next_seq: u64,
}

pub struct Session {
    extractor: Arc<Extractor>,
    summarizer: Arc<Summarizer>,
    documents: RwLock<Documents>,
    /// Parent of every per-call token; cancelled on shutdown
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(extractor: Arc<Extractor>, summarizer: Arc<Summarizer>) -> Self {
        Self {
            extractor,
            summarizer,
            documents: RwLock::new(Documents::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Session with the Tesseract OCR engine and the Gemini provider.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(Extractor::with_tesseract(config.ocr.clone())),
            Arc::new(Summarizer::with_gemini(config)),
        )
    }

    /// Register a selected file. Its status starts at `extracting`.
    pub async fn add_document(
        &self,
        name: impl Into<String>,
        kind: DocumentKind,
        file: impl Into<Bytes>,
    ) -> DocumentId {
        let document = Document::new(name, kind, file);
        let id = document.id;
        info!(doc_id = %id, name = %document.name, kind = document.kind.as_str(), "Document added");

        let mut documents = self.documents.write().await;
        let seq = documents.next_seq;
        documents.next_seq += 1;
        documents.entries.insert(
            id,
            Entry {
                document,
                seq,
                in_flight: None,
            },
        );
        id
    }

    /// Run extraction for a document in `extracting` state and record the
    /// outcome on it.
    pub async fn extract(
        &self,
        id: DocumentId,
        progress: &ProgressSink,
    ) -> Result<String, SessionError> {
        let (document, cancel) = {
            let mut documents = self.documents.write().await;
            let entry = documents
                .entries
                .get_mut(&id)
                .ok_or(SessionError::DocumentNotFound(id))?;
            if entry.document.status() != DocumentStatus::Extracting || entry.in_flight.is_some() {
                return Err(SessionError::InvalidTransition {
                    from: entry.document.status(),
                    to: DocumentStatus::Extracted,
                });
            }
            let cancel = self.shutdown.child_token();
            entry.in_flight = Some(cancel.clone());
            (entry.document.clone(), cancel)
        };

        let result = self.extractor.process(&document, progress, &cancel).await;

        let mut documents = self.documents.write().await;
        let Some(entry) = documents.entries.get_mut(&id) else {
            info!(doc_id = %id, "Document removed during extraction, discarding result");
            return Err(SessionError::Discarded(id));
        };
        entry.in_flight = None;

        match result {
            Ok(text) => {
                entry.document.finish_extraction(text.clone())?;
                Ok(text)
            }
            Err(e) => {
                warn!(doc_id = %id, kind = %e.kind(), "Extraction failed: {}", e);
                entry.document.fail(e.kind(), e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Generate (or regenerate) the summary of an extracted document.
    ///
    /// A previous summary stays on the document until the new one succeeds.
    pub async fn summarize(
        &self,
        id: DocumentId,
        options: &SummaryOptions,
        progress: &ProgressSink,
    ) -> Result<String, SessionError> {
        let (text, cancel) = {
            let mut documents = self.documents.write().await;
            let entry = documents
                .entries
                .get_mut(&id)
                .ok_or(SessionError::DocumentNotFound(id))?;
            entry.document.begin_summary(options.length)?;
            let text = entry
                .document
                .text()
                .map(str::to_string)
                .ok_or(SessionError::MissingText(id))?;
            let cancel = self.shutdown.child_token();
            entry.in_flight = Some(cancel.clone());
            (text, cancel)
        };

        let result = self
            .summarizer
            .generate(&text, options, progress, &cancel)
            .await;

        let mut documents = self.documents.write().await;
        let Some(entry) = documents.entries.get_mut(&id) else {
            info!(doc_id = %id, "Document removed during summarization, discarding result");
            return Err(SessionError::Discarded(id));
        };
        entry.in_flight = None;

        match result {
            Ok(summary) => {
                entry.document.finish_summary(summary.clone())?;
                Ok(summary)
            }
            Err(e) => {
                warn!(doc_id = %id, kind = %e.kind(), "Summarization failed: {}", e);
                entry.document.fail(e.kind(), e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Extract and then summarize a freshly added document.
    pub async fn process(
        &self,
        id: DocumentId,
        options: &SummaryOptions,
        progress: &ProgressSink,
    ) -> Result<String, SessionError> {
        self.extract(id, progress).await?;
        self.summarize(id, options, progress).await
    }

    /// Remove a document, cancelling whatever is running for it.
    pub async fn delete(&self, id: DocumentId) -> Result<(), SessionError> {
        let entry = self
            .documents
            .write()
            .await
            .entries
            .remove(&id)
            .ok_or(SessionError::DocumentNotFound(id))?;
        if let Some(cancel) = entry.in_flight {
            cancel.cancel();
        }
        info!(doc_id = %id, name = %entry.document.name, "Document deleted");
        Ok(())
    }

    /// Remove every document, cancelling all running work.
    pub async fn clear(&self) {
        let mut documents = self.documents.write().await;
        let count = documents.entries.len();
        for (_, entry) in documents.entries.drain() {
            if let Some(cancel) = entry.in_flight {
                cancel.cancel();
            }
        }
        info!(count, "Cleared all documents");
    }

    pub async fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents
            .read()
            .await
            .entries
            .get(&id)
            .map(|e| e.document.clone())
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Vec<Document> {
        let documents = self.documents.read().await;
        let mut entries: Vec<&Entry> = documents.entries.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.document.clone()).collect()
    }

    pub async fn stats(&self) -> SessionStats {
        let documents = self.documents.read().await;
        let mut stats = SessionStats {
            total: documents.entries.len(),
            ..SessionStats::default()
        };
        for entry in documents.entries.values() {
            let status = entry.document.status();
            if status.is_in_progress() {
                stats.in_progress += 1;
            }
            match status {
                DocumentStatus::Completed => stats.completed += 1,
                DocumentStatus::Error => stats.errors += 1,
                _ => {}
            }
        }
        stats
    }

    pub async fn set_api_key(&self, key: &str) {
        self.summarizer.set_api_key(key).await;
    }

    pub async fn has_api_key(&self) -> bool {
        self.summarizer.has_api_key().await
    }

    /// Cancel all running work and release the OCR engine. Safe to call more
    /// than once.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.extractor.cleanup().await;
        info!("Session shut down");
    }
}
