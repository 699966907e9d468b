//! Prompt construction and input chunking.
//!
//! [`PromptTable`] is the single place where summary length and style keys
//! turn into instructions. Everything else passes the keys through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use text_splitter::TextSplitter;

use crate::options::{SummaryLength, SummaryOptions, SummaryStyle};

use super::provider::CompletionRequest;

const SYSTEM_INSTRUCTION: &str = "You are an expert document analyst. Summarize faithfully: \
use only information present in the text, keep names, figures and dates exact, and never \
add commentary about the summarization itself.";

/// Target size of a summary, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBand {
    pub min_words: usize,
    pub max_words: usize,
}

impl LengthBand {
    pub fn target_words(&self) -> usize {
        (self.min_words + self.max_words) / 2
    }

    /// Whether `words` falls in the band widened by `tolerance` (a fraction,
    /// e.g. `0.5` accepts half the minimum up to one and a half the maximum).
    pub fn accepts(&self, words: usize, tolerance: f32) -> bool {
        let tolerance = tolerance.max(0.0) as f64;
        let low = self.min_words as f64 * (1.0 - tolerance).max(0.0);
        let high = self.max_words as f64 * (1.0 + tolerance);
        let words = words as f64;
        words >= low.floor() && words <= high.ceil()
    }
}

/// Lookup table from option keys to prompt fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTable {
    pub lengths: BTreeMap<SummaryLength, LengthBand>,
    pub styles: BTreeMap<SummaryStyle, String>,
    /// Words asked for per chunk in the map phase of long documents
    pub chunk_summary_words: usize,
}

impl Default for PromptTable {
    fn default() -> Self {
        let lengths = SummaryLength::ALL
            .into_iter()
            .map(|l| (l, default_band(l)))
            .collect();
        let styles = SummaryStyle::ALL
            .into_iter()
            .map(|s| (s, default_style(s).to_string()))
            .collect();
        Self {
            lengths,
            styles,
            chunk_summary_words: 200,
        }
    }
}

fn default_band(length: SummaryLength) -> LengthBand {
    match length {
        SummaryLength::Short => LengthBand {
            min_words: 50,
            max_words: 120,
        },
        SummaryLength::Medium => LengthBand {
            min_words: 150,
            max_words: 300,
        },
        SummaryLength::Long => LengthBand {
            min_words: 400,
            max_words: 700,
        },
    }
}

fn default_style(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Paragraph => {
            "Write the summary as clear, flowing prose paragraphs without headings or lists."
        }
        SummaryStyle::Bullets => {
            "Write the summary as a bulleted list of key points, one idea per bullet, each starting with \"- \"."
        }
        SummaryStyle::Executive => {
            "Write an executive summary: a one-sentence overview, then the key findings, then recommended actions or implications."
        }
    }
}

impl PromptTable {
    /// Length band for `length`; keys missing from a user-supplied table fall
    /// back to the defaults.
    pub fn length(&self, length: SummaryLength) -> LengthBand {
        self.lengths
            .get(&length)
            .copied()
            .unwrap_or_else(|| default_band(length))
    }

    pub fn style(&self, style: SummaryStyle) -> &str {
        self.styles
            .get(&style)
            .map(String::as_str)
            .unwrap_or_else(|| default_style(style))
    }

    /// Final summary request at the requested length and style.
    pub fn summary_request(&self, text: &str, options: &SummaryOptions) -> CompletionRequest {
        let band = self.length(options.length);
        let prompt = format!(
            "Summarize the following document in between {} and {} words (about {} words).\n\
             {}\n\n\
             Document:\n\"\"\"\n{}\n\"\"\"",
            band.min_words,
            band.max_words,
            band.target_words(),
            self.style(options.style),
            text
        );
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt,
            max_output_words: band.max_words,
        }
    }

    /// Map-phase request for one chunk of a long document.
    pub fn chunk_request(&self, chunk: &str, part: usize, total: usize) -> CompletionRequest {
        let prompt = format!(
            "The following is part {} of {} of a longer document. Summarize this part in at most {} words, \
             keeping every fact that could matter for an overall summary. Write plain prose.\n\n\
             Part {} of {}:\n\"\"\"\n{}\n\"\"\"",
            part, total, self.chunk_summary_words, part, total, chunk
        );
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt,
            max_output_words: self.chunk_summary_words,
        }
    }

    /// Reduce-phase request combining the chunk summaries.
    pub fn combine_request(&self, partials: &[String], options: &SummaryOptions) -> CompletionRequest {
        let band = self.length(options.length);
        let joined = partials
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Part {}:\n{}", i + 1, p))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Below are summaries of consecutive parts of one document. Combine them into a single \
             coherent summary of the whole document in between {} and {} words (about {} words).\n\
             {}\n\n\
             Part summaries:\n\"\"\"\n{}\n\"\"\"",
            band.min_words,
            band.max_words,
            band.target_words(),
            self.style(options.style),
            joined
        );
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt,
            max_output_words: band.max_words,
        }
    }
}

/// Size limits that decide when map-reduce kicks in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Inputs longer than this many characters are summarized in chunks
    pub max_input_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 24_000,
        }
    }
}

impl ChunkingConfig {
    pub fn needs_chunking(&self, text: &str) -> bool {
        text.chars().count() > self.max_input_chars
    }

    /// Split `text` into chunks of at most `max_input_chars` characters,
    /// preferring paragraph, then line, sentence and word boundaries.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let splitter = TextSplitter::new(self.max_input_chars.max(1));
        splitter
            .chunks(text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_resolves() {
        let table = PromptTable::default();
        for length in SummaryLength::ALL {
            let band = table.length(length);
            assert!(band.min_words < band.max_words);
        }
        for style in SummaryStyle::ALL {
            assert!(!table.style(style).is_empty());
        }
        assert!(table.length(SummaryLength::Short).max_words < table.length(SummaryLength::Long).min_words);
    }

    #[test]
    fn test_partial_table_falls_back_to_defaults() {
        let table: PromptTable = serde_json::from_str(
            r#"{"lengths": {"short": {"min_words": 10, "max_words": 20}}, "styles": {}}"#,
        )
        .unwrap();
        assert_eq!(table.length(SummaryLength::Short).max_words, 20);
        assert_eq!(
            table.length(SummaryLength::Long),
            PromptTable::default().length(SummaryLength::Long)
        );
        assert_eq!(
            table.style(SummaryStyle::Bullets),
            PromptTable::default().style(SummaryStyle::Bullets)
        );
        assert_eq!(table.chunk_summary_words, 200);
    }

    #[test]
    fn test_summary_request_carries_band_and_style() {
        let table = PromptTable::default();
        let options = SummaryOptions {
            length: SummaryLength::Short,
            style: SummaryStyle::Bullets,
        };
        let request = table.summary_request("The quarterly report.", &options);
        assert!(request.prompt.contains("between 50 and 120 words"));
        assert!(request.prompt.contains(table.style(SummaryStyle::Bullets)));
        assert!(request.prompt.contains("The quarterly report."));
        assert_eq!(request.max_output_words, 120);
    }

    #[test]
    fn test_length_band_tolerance() {
        let band = LengthBand {
            min_words: 100,
            max_words: 200,
        };
        assert_eq!(band.target_words(), 150);
        assert!(band.accepts(150, 0.0));
        assert!(!band.accepts(99, 0.0));
        assert!(band.accepts(60, 0.5));
        assert!(band.accepts(300, 0.5));
        assert!(!band.accepts(301, 0.5));
    }

    #[test]
    fn test_split_respects_limit_and_paragraphs() {
        let config = ChunkingConfig { max_input_chars: 60 };
        let text = "First paragraph about revenue.\n\nSecond paragraph about costs.\n\nThird paragraph about outlook and risks.";
        assert!(config.needs_chunking(text));

        let chunks = config.split(text);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 60));
        assert!(chunks[0].starts_with("First paragraph"));
        assert!(chunks.last().unwrap().ends_with("risks."));
    }

    #[test]
    fn test_short_text_is_not_chunked() {
        let config = ChunkingConfig::default();
        assert!(!config.needs_chunking("short"));
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\nthree\tfour "), 4);
        assert_eq!(word_count(""), 0);
    }
}
