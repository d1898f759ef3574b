//! Batcher: normalize, drop checkpointed DOIs, split into fixed-size batches

use rustc_hash::FxHashSet;

use crate::checkpoint::CheckpointSet;
use crate::doi::Doi;

/// Ordered group of DOIs fetched together in one registry request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position within this run
    pub position: usize,
    /// Sequence number used for the output file name
    pub sequence: u64,
    pub dois: Vec<Doi>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.dois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dois.is_empty()
    }

    /// Log/progress label, e.g. `batch 3 (#41)`
    pub fn label(&self) -> String {
        format!("batch {} (#{})", self.position, self.sequence)
    }
}

/// Partitioning settings for one run.
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    pub batch_size: usize,
    /// Sequence number of the first batch
    pub first_sequence: u64,
    /// Collapse repeated DOIs (first occurrence wins). Off by default: a DOI
    /// listed twice in the input is fetched twice.
    pub dedupe: bool,
}

impl Batcher {
    pub fn new(batch_size: usize, first_sequence: u64) -> Self {
        Self {
            batch_size,
            first_sequence,
            dedupe: false,
        }
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// DOIs still to fetch, in input order.
    pub fn remaining<S: AsRef<str>>(&self, raw: &[S], checkpoint: &CheckpointSet) -> Vec<Doi> {
        let mut seen = FxHashSet::default();
        raw.iter()
            .map(|s| Doi::normalize(s.as_ref()))
            .filter(|doi| !doi.is_empty() && !checkpoint.contains(doi))
            .filter(|doi| !self.dedupe || seen.insert(doi.clone()))
            .collect()
    }

    /// Split the remaining DOIs into consecutive batches of `batch_size`,
    /// the last one possibly shorter. Empty when nothing is left to do.
    pub fn partition<S: AsRef<str>>(&self, raw: &[S], checkpoint: &CheckpointSet) -> Vec<Batch> {
        let size = self.batch_size.max(1);
        self.remaining(raw, checkpoint)
            .chunks(size)
            .enumerate()
            .map(|(i, chunk)| Batch {
                position: i + 1,
                sequence: self.first_sequence + i as u64,
                dois: chunk.to_vec(),
            })
            .collect()
    }
}
