//! Main runner: load, filter, then fetch → write → checkpoint per batch

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use doiline_core::{ProgressContext, Sleeper, fmt_num, is_shutdown_requested};

use crate::api::Registry;
use crate::batcher::Batcher;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::source::read_identifiers;
use crate::writer::{BatchWriter, cleanup_tmp_files, next_sequence};

/// Pipeline execution summary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Identifiers read from the input, duplicates included
    pub total_identifiers: usize,
    /// Identifiers left after removing checkpointed ones
    pub remaining_identifiers: usize,
    pub total_batches: usize,
    pub processed_batches: usize,
    /// Batches that produced an artifact
    pub written_batches: usize,
    /// Batches with nothing to write (registry exhausted or nothing resolved)
    pub empty_batches: usize,
    pub failed_writes: usize,
    pub records_written: usize,
    /// First sequence number assigned this run
    pub first_sequence: u64,
    pub elapsed: Duration,
    /// Stopped early on a shutdown request
    pub interrupted: bool,
}

impl Summary {
    /// True when the run found nothing left to fetch.
    pub fn nothing_to_do(&self) -> bool {
        self.total_batches == 0
    }

    fn log(&self) {
        log::info!("=== Crossref Fetch Summary ===");
        log::info!(
            "Identifiers: {} total, {} remaining at start",
            fmt_num(self.total_identifiers),
            fmt_num(self.remaining_identifiers)
        );
        log::info!(
            "Batches: {}/{} processed ({} written, {} empty, {} write failures)",
            self.processed_batches,
            self.total_batches,
            self.written_batches,
            self.empty_batches,
            self.failed_writes
        );
        log::info!("Records: {}", fmt_num(self.records_written));
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Run the fetch pipeline.
///
/// Fatal errors (`Err`): unreadable or malformed input, unreadable
/// checkpoint, output directory setup, checkpoint persistence. Fetch and
/// write failures of a single batch are logged and the loop moves on; those
/// DOIs stay out of the checkpoint and are retried on the next run.
pub fn run<R: Registry, S: Sleeper>(
    config: &Config,
    fetcher: &Fetcher<R, S>,
    progress: &ProgressContext,
) -> Result<Summary> {
    let start = Instant::now();
    config.validate()?;

    log::info!("Reading DOIs from {}", config.input.display());
    let raw = read_identifiers(&config.input, &config.id_field)
        .context("Failed to load identifiers")?;

    let mut summary = Summary {
        total_identifiers: raw.len(),
        ..Default::default()
    };
    if raw.is_empty() {
        log::warn!("No DOIs found in {}, nothing to process", config.input.display());
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }

    let store = CheckpointStore::new(&config.checkpoint);
    let mut checkpoint = store
        .load()
        .with_context(|| format!("Failed to read checkpoint {}", store.path().display()))?;

    let first_sequence = next_sequence(&config.output_dir).with_context(|| {
        format!("Failed to scan {}", config.output_dir.display())
    })?;
    let batcher = Batcher::new(config.batch_size, first_sequence).with_dedupe(config.dedupe);
    let mut batches = batcher.partition(&raw, &checkpoint);
    summary.remaining_identifiers = batches.iter().map(|b| b.len()).sum();
    summary.first_sequence = first_sequence;

    if batches.is_empty() {
        log::info!("All DOIs have been processed, nothing to do");
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }
    if let Some(limit) = config.max_batches {
        batches.truncate(limit);
    }
    summary.total_batches = batches.len();

    std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;
    cleanup_tmp_files(&config.output_dir).context("Failed to clean stale tmp files")?;

    log::info!(
        "{} DOIs remaining in {} batches of up to {} (starting at #{first_sequence})",
        fmt_num(summary.remaining_identifiers),
        batches.len(),
        config.batch_size
    );

    let writer = BatchWriter::new(&config.output_dir).with_level(config.gzip_level);
    let pb = progress.batch_line("crossref", batches.len());
    let total = batches.len();

    for batch in &batches {
        if is_shutdown_requested() {
            log::warn!(
                "Shutdown requested, stopping before batch {}/{total}",
                batch.position
            );
            summary.interrupted = true;
            break;
        }

        pb.set_message(format!("{} DOIs", batch.len()));
        log::info!(
            "Processing batch {}/{total} (#{}) with {} DOIs",
            batch.position,
            batch.sequence,
            batch.len()
        );

        let outcome = fetcher.fetch(batch, &pb);
        if let FetchOutcome::Exhausted {
            attempts,
            last_error,
        } = &outcome
        {
            log::warn!(
                "{}: giving up after {attempts} attempts ({} DOIs deferred to next run): {last_error}",
                batch.label(),
                batch.len()
            );
        }

        let pairs = outcome.into_pairs();
        if pairs.is_empty() {
            log::warn!("No metadata fetched for {}", batch.label());
            summary.empty_batches += 1;
        } else {
            match writer.write(&pairs, batch.sequence, &mut checkpoint) {
                Ok(n) => {
                    summary.written_batches += 1;
                    summary.records_written += n;
                }
                Err(e) => {
                    log::error!(
                        "Error saving {} ({} records) to {}: {e}",
                        batch.label(),
                        pairs.len(),
                        writer.path_for(batch.sequence).display()
                    );
                    summary.failed_writes += 1;
                }
            }
        }

        // Unconditional: disk never lags memory by more than one batch
        store
            .save(&checkpoint)
            .with_context(|| format!("Failed to save checkpoint {}", store.path().display()))?;
        log::debug!("Checkpoint holds {} DOIs", checkpoint.len());

        summary.processed_batches += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    summary.elapsed = start.elapsed();
    summary.log();
    if !summary.interrupted {
        log::info!("Processing complete");
    }
    Ok(summary)
}
