//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use summarizex_core::{SummaryLength, SummaryStyle};

use crate::config::API_KEY_ENV;

#[derive(Parser, Debug)]
#[command(name = "summarizex")]
#[command(about = "Summarize PDFs and scanned images with an LLM")]
#[command(version)]
pub struct Cli {
    /// API key for the summarization provider (overrides the stored key)
    #[arg(long, env = API_KEY_ENV, global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Print a JSON report instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and summarize files concurrently
    Summarize {
        /// PDF or image files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Summary length: short, medium, long (defaults to the stored setting)
        #[arg(long)]
        length: Option<SummaryLength>,

        /// Summary style: paragraph, bullets, executive (defaults to the stored setting)
        #[arg(long)]
        style: Option<SummaryStyle>,
    },

    /// Extract text only
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Store the API key in the settings file
    SetKey {
        key: String,
    },

    /// Remove the stored API key
    ForgetKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::try_parse_from([
            "summarizex",
            "summarize",
            "a.pdf",
            "b.png",
            "--length",
            "short",
            "--style",
            "Bullets",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Summarize {
                files,
                length,
                style,
            } => {
                assert_eq!(files, vec![PathBuf::from("a.pdf"), PathBuf::from("b.png")]);
                assert_eq!(length, Some(SummaryLength::Short));
                assert_eq!(style, Some(SummaryStyle::Bullets));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_length_and_missing_files() {
        assert!(Cli::try_parse_from(["summarizex", "summarize", "a.pdf", "--length", "tiny"]).is_err());
        assert!(Cli::try_parse_from(["summarizex", "extract"]).is_err());
    }

    #[test]
    fn test_api_key_flag_is_global() {
        let cli = Cli::try_parse_from(["summarizex", "extract", "a.pdf", "--api-key", "k"]).unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
