//! doiline - resumable Crossref metadata fetcher
//!
//! Fetches metadata for a list of DOIs in checkpointed batches, so an
//! interrupted run picks up where it stopped.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "doiline")]
#[command(about = "Resumable batch fetcher for Crossref DOI metadata")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./doiline.toml or ~/.config/doiline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch metadata for every DOI not yet in the checkpoint
    Fetch(cmd::fetch::FetchArgs),
    /// Show how much of the input is already fetched
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(doiline_core::ProgressContext::new());

    // Batches take seconds each, so info stays on even with a progress line
    let multi = progress.is_tty().then(|| progress.multi());
    doiline_core::init_logging(false, cli.debug, multi);

    match dispatch(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli, progress: &doiline_core::SharedProgress) -> Result<ExitCode> {
    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, progress),
        Command::Status(args) => cmd::status::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::print_table(
                "Setting",
                &[
                    ("Output directory", config.output.dir.display().to_string()),
                    ("Checkpoint", config.output.checkpoint.display().to_string()),
                    ("Gzip level", config.output.gzip_level.to_string()),
                    ("Crossref URL", config.crossref.base_url.clone()),
                    (
                        "Mailto",
                        config
                            .crossref
                            .mailto
                            .clone()
                            .unwrap_or_else(|| "not set".to_string()),
                    ),
                    ("Batch size", config.fetch.batch_size.to_string()),
                    ("Max retries", config.fetch.max_retries.to_string()),
                    ("Identifier field", config.fetch.id_field.clone()),
                    ("Dedupe", config.fetch.dedupe.to_string()),
                ],
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
