//! Text-layer extraction from PDF bytes.

use lopdf::Document;
use tokio_util::sync::CancellationToken;

use crate::error::ExtractionError;
use crate::progress::{ProgressSink, Stage};

/// Paragraph boundary placed between page texts.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the embedded text layer of every page, in page order.
///
/// Blocking; call from the blocking pool. Emits one `ParsingPage` event per
/// page and stops early (without emitting) once `cancel` fires.
pub fn extract_pages(
    pdf_bytes: &[u8],
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> Result<Vec<String>, ExtractionError> {
    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| ExtractionError::CorruptFile(format!("Failed to parse PDF: {}", e)))?;

    // get_pages() is keyed by page number, so iteration is already in order
    let pages: Vec<u32> = doc.get_pages().keys().cloned().collect();
    let page_count = pages.len();

    let mut page_texts = Vec::with_capacity(page_count);
    for (i, page_num) in pages.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let n = i + 1;
        progress.emit(
            Stage::ParsingPage,
            format!("parsing page {} of {}", n, page_count),
            Some(n as f32 / page_count as f32),
        );

        // Scanned pages have no text layer and simply contribute nothing
        let page_text = doc.extract_text(&[*page_num]).unwrap_or_else(|e| {
            tracing::debug!(page = *page_num, "No text layer on page: {}", e);
            String::new()
        });
        page_texts.push(page_text);
    }

    tracing::debug!(
        page_count,
        chars = page_texts.iter().map(String::len).sum::<usize>(),
        "Extracted PDF text layer"
    );

    Ok(page_texts)
}

/// Join page texts with [`PAGE_SEPARATOR`], trimming trailing whitespace per
/// page and skipping pages that end up empty.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref().trim_end())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}


#[cfg(test)]
mod tests {
    use super::fixtures::multipage_pdf;
    use super::*;
    use crate::progress::test_support::drain;

    #[test]
    fn test_join_pages_trims_and_skips_blank_pages() {
        assert_eq!(join_pages(&["A", "", "C"]), "A\n\nC");
        assert_eq!(join_pages(&["A \n", "  \n\n", "C\n"]), "A\n\nC");
        assert_eq!(join_pages::<&str>(&[]), "");
        assert_eq!(join_pages(&["\n", " "]), "");
    }

    #[test]
    fn test_extract_pages_in_order_with_progress() {
        let pdf = multipage_pdf(&["Page One", "Page Two", "Page Three"]);
        let (sink, mut rx) = ProgressSink::channel("three.pdf");

        let pages = extract_pages(&pdf, &sink, &CancellationToken::new()).unwrap();

        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("One"));
        assert!(pages[1].contains("Two"));
        assert!(pages[2].contains("Three"));

        let events = drain(&mut rx);
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "parsing page 1 of 3",
                "parsing page 2 of 3",
                "parsing page 3 of 3"
            ]
        );
        assert_eq!(events[2].fraction, Some(1.0));
    }

    #[test]
    fn test_extract_pages_invalid_pdf() {
        let sink = ProgressSink::disabled("bad.pdf");
        let err = extract_pages(b"this is not a valid pdf file", &sink, &CancellationToken::new())
            .unwrap_err();
        assert!(
            matches!(&err, ExtractionError::CorruptFile(msg) if msg.contains("Failed to parse PDF")),
            "Expected CorruptFile, got: {:?}",
            err
        );
    }

    #[test]
    fn test_extract_pages_stops_when_cancelled() {
        let pdf = multipage_pdf(&["A", "B"]);
        let (sink, mut rx) = ProgressSink::channel("cancelled.pdf");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extract_pages(&pdf, &sink, &cancel).unwrap_err();
        assert!(matches!(err, ExtractionError::Cancelled));
        assert!(drain(&mut rx).is_empty());
    }
}
