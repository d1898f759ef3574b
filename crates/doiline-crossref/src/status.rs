//! Offline progress report: what a `fetch` run would do next

use anyhow::{Context, Result};

use crate::batcher::Batcher;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::source::read_identifiers;
use crate::writer::next_sequence;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Identifiers in the input, duplicates included
    pub total_identifiers: usize,
    /// Entries in the checkpoint file
    pub checkpointed: usize,
    /// Input identifiers still to fetch
    pub remaining: usize,
    pub pending_batches: usize,
    /// Sequence number the next written batch will get
    pub next_sequence: u64,
}

impl Status {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Compare input against checkpoint without touching the network or
/// writing anything.
pub fn status(config: &Config) -> Result<Status> {
    config.validate()?;
    let raw = read_identifiers(&config.input, &config.id_field)
        .context("Failed to load identifiers")?;
    let checkpoint = CheckpointStore::new(&config.checkpoint)
        .load()
        .context("Failed to read checkpoint")?;
    let next_sequence = next_sequence(&config.output_dir)?;

    let batches = Batcher::new(config.batch_size, next_sequence)
        .with_dedupe(config.dedupe)
        .partition(&raw, &checkpoint);

    Ok(Status {
        total_identifiers: raw.len(),
        checkpointed: checkpoint.len(),
        remaining: batches.iter().map(|b| b.len()).sum(),
        pending_batches: batches.len(),
        next_sequence,
    })
}
