//! Fetch subcommand - pull metadata for unprocessed DOIs from Crossref

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use doiline_core::{SharedProgress, ThreadSleeper, fmt_num, install_signal_handlers};
use doiline_crossref::{CrossrefClient, Fetcher};

use super::{PathArgs, print_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Attempts per batch before giving up until the next run
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Contact email for Crossref's polite pool
    #[arg(long)]
    pub mailto: Option<String>,

    /// Maximum number of batches to process
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let mut pipeline = args.paths.to_pipeline(config);
    if let Some(max_retries) = args.max_retries {
        pipeline.max_retries = max_retries;
    }
    if args.mailto.is_some() {
        pipeline.mailto = args.mailto;
    }
    pipeline.max_batches = args.limit;

    if pipeline.mailto.is_none() {
        log::warn!("No mailto configured; Crossref may throttle anonymous requests");
    }

    install_signal_handlers().context("Failed to register signal handlers")?;

    let client = CrossrefClient::new(&pipeline.base_url, pipeline.mailto.clone())?;
    let fetcher = Fetcher::new(client, pipeline.retry_policy(), ThreadSleeper);
    let summary = doiline_crossref::run(&pipeline, &fetcher, progress)?;

    if summary.total_identifiers == 0 {
        progress.println("No DOIs in input, nothing to process");
        return Ok(ExitCode::SUCCESS);
    }
    if summary.nothing_to_do() {
        progress.println("All DOIs have been processed");
        return Ok(ExitCode::SUCCESS);
    }

    print_table(
        "Crossref fetch",
        &[
            ("DOIs in input", fmt_num(summary.total_identifiers)),
            ("Remaining at start", fmt_num(summary.remaining_identifiers)),
            (
                "Batches",
                format!("{}/{}", summary.processed_batches, summary.total_batches),
            ),
            ("Written", summary.written_batches.to_string()),
            ("Empty", summary.empty_batches.to_string()),
            ("Write failures", summary.failed_writes.to_string()),
            ("Records", fmt_num(summary.records_written)),
            (
                "Output",
                format!(
                    "{} (from #{})",
                    pipeline.output_dir.display(),
                    summary.first_sequence
                ),
            ),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    if summary.interrupted {
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}
