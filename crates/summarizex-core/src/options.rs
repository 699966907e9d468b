//! User-facing summarization options.
//!
//! These are keys only. What each key means for the prompt is decided by
//! [`crate::summarizer::PromptTable`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Paragraph,
    Bullets,
    Executive,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

impl SummaryStyle {
    pub const ALL: [SummaryStyle; 3] = [Self::Paragraph, Self::Bullets, Self::Executive];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Paragraph => "paragraph",
            SummaryStyle::Bullets => "bullets",
            SummaryStyle::Executive => "executive",
        }
    }
}

impl std::fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown summary length '{}' (short, medium, long)", s))
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown summary style '{}' (paragraph, bullets, executive)",
                    s
                )
            })
    }
}

/// Length and style requested for one summarization call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub length: SummaryLength,
    pub style: SummaryStyle,
}
