//! Command implementations
//!
//! Each document runs as its own task against a shared [`Session`]; progress
//! events go to stderr as they arrive, results are reported once all tasks
//! have finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use summarizex_core::{
    Document, DocumentError, DocumentId, DocumentKind, DocumentStatus, ProgressEvent,
    ProgressSink, Session, SessionError, SessionStats, SummaryOptions,
};
use tokio::sync::mpsc;

use crate::config::{Config, Settings};
use crate::error::{CommandError, CommandResult, ResultExt};

/// Outcome for one input file
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: DocumentId,
    pub name: String,
    pub path: PathBuf,
    pub kind: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DocumentError>,
}

impl DocumentReport {
    fn new(path: &Path, document: &Document, include_text: bool) -> Self {
        Self {
            id: document.id,
            name: document.name.clone(),
            path: path.to_path_buf(),
            kind: document.kind.as_str().to_string(),
            status: document.status(),
            text: if include_text {
                document.text().map(str::to_string)
            } else {
                None
            },
            summary: document.summary().map(str::to_string),
            error: document.error().cloned(),
        }
    }

    pub fn failed(&self) -> bool {
        self.status == DocumentStatus::Error
    }
}

/// Full result of a `summarize` or `extract` run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub documents: Vec<DocumentReport>,
    pub stats: SessionStats,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.documents.iter().filter(|d| d.failed()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Extract,
    Summarize(SummaryOptions),
}

/// Read every file up front so a bad path fails before any work starts.
async fn add_files(
    session: &Session,
    files: &[PathBuf],
) -> CommandResult<Vec<(PathBuf, DocumentId)>> {
    let mut loaded = Vec::with_capacity(files.len());
    for path in files {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::file_not_found(path.display().to_string()));
            }
            result => result
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
                .storage_err()?,
        };
        loaded.push((path.clone(), bytes));
    }

    let mut added = Vec::with_capacity(loaded.len());
    for (path, bytes) in loaded {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let kind = DocumentKind::detect(&name, None);
        let id = session.add_document(name, kind, bytes).await;
        added.push((path, id));
    }
    Ok(added)
}

/// Progress sink for one document, printing to stderr when `show` is set.
fn progress_printer(name: &str, show: bool) -> (ProgressSink, Option<tokio::task::JoinHandle<()>>) {
    if !show {
        return (ProgressSink::disabled(name), None);
    }
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.fraction {
                Some(f) => eprintln!(
                    "[{}] {} ({:.0}%)",
                    event.document_name,
                    event.message,
                    f * 100.0
                ),
                None => eprintln!("[{}] {}", event.document_name, event.message),
            }
        }
    });
    (ProgressSink::new(name, tx), Some(printer))
}

async fn run_documents(
    session: Arc<Session>,
    files: &[PathBuf],
    mode: Mode,
    show_progress: bool,
) -> CommandResult<RunReport> {
    let added = add_files(&session, files).await?;

    let tasks = added.iter().map(|(path, id)| {
        let session = session.clone();
        let id = *id;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        async move {
            let (sink, printer) = progress_printer(&name, show_progress);
            let result: Result<String, SessionError> = match mode {
                Mode::Extract => session.extract(id, &sink).await,
                Mode::Summarize(options) => session.process(id, &options, &sink).await,
            };
            // Closing the sink lets the printer drain and exit
            drop(sink);
            if let Some(printer) = printer {
                let _ = printer.await;
            }
            if let Err(e) = &result {
                tracing::debug!(doc_id = %id, "Document did not finish: {}", e);
            }
        }
    });

    tokio::select! {
        _ = join_all(tasks) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling in-flight documents");
            session.shutdown().await;
            return Err(CommandError::interrupted());
        }
    }

    let mut documents = Vec::with_capacity(added.len());
    for (path, id) in &added {
        if let Some(document) = session.get(*id).await {
            documents.push(DocumentReport::new(
                path,
                &document,
                mode == Mode::Extract,
            ));
        }
    }
    let stats = session.stats().await;
    session.shutdown().await;

    Ok(RunReport { documents, stats })
}

/// `summarize`: extract then summarize every file.
pub async fn summarize(
    session: Arc<Session>,
    files: &[PathBuf],
    options: SummaryOptions,
    show_progress: bool,
) -> CommandResult<RunReport> {
    if !session.has_api_key().await {
        return Err(CommandError::missing_api_key());
    }
    run_documents(session, files, Mode::Summarize(options), show_progress).await
}

/// `extract`: text extraction only; no API key needed.
pub async fn extract(
    session: Arc<Session>,
    files: &[PathBuf],
    show_progress: bool,
) -> CommandResult<RunReport> {
    run_documents(session, files, Mode::Extract, show_progress).await
}

/// `set-key`: persist the API key.
pub fn set_key(config: &Config, key: &str) -> CommandResult<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(CommandError::invalid_input("API key must not be empty"));
    }
    config.ensure_dirs()?;
    let mut settings = Settings::load(&config.settings_path)?;
    settings.api_key = Some(key.to_string());
    settings.save(&config.settings_path)?;
    tracing::info!(path = ?config.settings_path, "API key saved");
    Ok(())
}

/// `forget-key`: remove the stored API key.
pub fn forget_key(config: &Config) -> CommandResult<()> {
    let mut settings = Settings::load(&config.settings_path)?;
    if settings.api_key.take().is_none() {
        return Ok(());
    }
    settings.save(&config.settings_path)?;
    tracing::info!(path = ?config.settings_path, "API key removed");
    Ok(())
}

/// Plain-text rendering of a report for stdout.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    for document in &report.documents {
        out.push_str(&format!("== {} ==\n", document.name));
        if let Some(error) = &document.error {
            out.push_str(&format!("error ({}): {}\n", error.kind, error.message));
        } else if let Some(summary) = &document.summary {
            out.push_str(summary);
            out.push('\n');
        } else if let Some(text) = &document.text {
            if text.is_empty() {
                out.push_str("(no text found)\n");
            } else {
                out.push_str(text);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "{} documents: {} completed, {} in progress, {} errors\n",
        report.stats.total, report.stats.completed, report.stats.in_progress, report.stats.errors
    ));
    out
}
