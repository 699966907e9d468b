//! Progress reporting for extraction and summarization calls.
//!
//! Each call receives its own [`ProgressSink`]. Events are observational only;
//! nothing in the pipeline reads them back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sub-stage of an extraction or summarization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// PDF page N of M is being parsed
    ParsingPage,
    /// OCR pass over an image has started
    RecognizingText,
    /// OCR pass over an image has finished
    TextRecognized,
    /// Request to the summarization provider is being sent
    SendingRequest,
    /// Map phase: chunk N of M is being summarized
    SummarizingPart,
    /// Reduce phase: chunk summaries are being merged
    CombiningResults,
    /// Summary is ready
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ParsingPage => write!(f, "parsing_page"),
            Stage::RecognizingText => write!(f, "recognizing_text"),
            Stage::TextRecognized => write!(f, "text_recognized"),
            Stage::SendingRequest => write!(f, "sending_request"),
            Stage::SummarizingPart => write!(f, "summarizing_part"),
            Stage::CombiningResults => write!(f, "combining_results"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    /// Completion in `0.0..=1.0`, or `None` when indeterminate
    pub fraction: Option<f32>,
    pub document_name: String,
}

/// Per-call progress channel.
///
/// Sending never blocks and never fails the call: if the receiver is gone the
/// event is dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    document_name: Arc<str>,
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(document_name: &str, tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            document_name: Arc::from(document_name),
            tx: Some(tx),
        }
    }

    /// Create a sink and the receiver that observes it.
    pub fn channel(document_name: &str) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(document_name, tx), rx)
    }

    /// A sink that discards every event.
    pub fn disabled(document_name: &str) -> Self {
        Self {
            document_name: Arc::from(document_name),
            tx: None,
        }
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn emit(&self, stage: Stage, message: impl Into<String>, fraction: Option<f32>) {
        let Some(tx) = &self.tx else {
            return;
        };
        let event = ProgressEvent {
            stage,
            message: message.into(),
            fraction: fraction.map(|f| f.clamp(0.0, 1.0)),
            document_name: self.document_name.to_string(),
        };
        let _ = tx.send(event);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::drain;
    use super::*;

    #[test]
    fn test_emit_tags_document_and_clamps_fraction() {
        let (sink, mut rx) = ProgressSink::channel("report.pdf");
        sink.emit(Stage::ParsingPage, "parsing page 1 of 2", Some(1.5));
        sink.emit(Stage::Done, "done", None);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].document_name, "report.pdf");
        assert_eq!(events[0].fraction, Some(1.0));
        assert_eq!(events[1].stage, Stage::Done);
        assert_eq!(events[1].fraction, None);
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (sink, rx) = ProgressSink::channel("scan.png");
        drop(rx);
        sink.emit(Stage::RecognizingText, "recognizing text", None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::SummarizingPart.to_string(), "summarizing_part");
    }
}
