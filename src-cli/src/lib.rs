pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::sync::Arc;

use summarizex_core::{Session, SummaryOptions};

use crate::cli::{Cli, Command};
use crate::commands::RunReport;
use crate::config::{Config, Settings};
use crate::error::{CommandError, CommandResult, ResultExt};

/// Initialize tracing/logging with the given directives
///
/// Logs go to stderr so stdout carries only results.
pub fn init_logging(directives: &[&str]) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in directives {
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log directive '{}': {}", directive, e),
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one CLI invocation.
pub async fn run(cli: Cli) -> CommandResult<()> {
    let config = match &cli.config_dir {
        Some(dir) => Config::in_dir(dir),
        None => Config::load_or_default(),
    };

    match cli.command {
        Command::Summarize {
            files,
            length,
            style,
        } => {
            let settings = Settings::load(&config.settings_path)?;
            let options = SummaryOptions {
                length: length.unwrap_or(settings.length),
                style: style.unwrap_or(settings.style),
            };
            let session = open_session(&config, &settings, cli.api_key.as_deref()).await;
            tracing::info!(
                files = files.len(),
                length = %options.length,
                style = %options.style,
                "Summarizing"
            );
            let report = commands::summarize(session, &files, options, !cli.json).await?;
            print_report(&report, cli.json)
        }
        Command::Extract { files } => {
            let settings = Settings::load(&config.settings_path)?;
            let session = open_session(&config, &settings, cli.api_key.as_deref()).await;
            let report = commands::extract(session, &files, !cli.json).await?;
            print_report(&report, cli.json)
        }
        Command::SetKey { key } => {
            commands::set_key(&config, &key)?;
            if !cli.json {
                eprintln!("API key saved to {}", config.settings_path.display());
            }
            Ok(())
        }
        Command::ForgetKey => {
            commands::forget_key(&config)?;
            if !cli.json {
                eprintln!("API key removed");
            }
            Ok(())
        }
    }
}

async fn open_session(config: &Config, settings: &Settings, explicit_key: Option<&str>) -> Arc<Session> {
    let session = Session::from_config(&config.pipeline());
    if let Some(key) = settings.resolve_api_key(explicit_key) {
        session.set_api_key(&key).await;
    }
    Arc::new(session)
}

fn print_report(report: &RunReport, json: bool) -> CommandResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report).internal_err()?);
    } else {
        print!("{}", commands::render_text(report));
    }

    match report.failures() {
        0 => Ok(()),
        failed => Err(CommandError::documents_failed(failed, report.documents.len())),
    }
}
