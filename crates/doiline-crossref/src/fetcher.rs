//! Fetcher: one batch → resolved (DOI, record) pairs, with bounded retry

use doiline_core::{FetchError, RetryPolicy, Sleeper, retry_with_backoff};
use indicatif::ProgressBar;

use crate::api::Registry;
use crate::batcher::Batch;
use crate::doi::Doi;
use crate::record::MetadataRecord;

/// Result of fetching one batch. Never an error: a batch that could not be
/// fetched simply contributes nothing and is picked up again next run.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Lookup succeeded; pairs may be fewer than the batch's DOIs.
    Resolved {
        pairs: Vec<(Doi, MetadataRecord)>,
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted { attempts: u32, last_error: FetchError },
}

impl FetchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Resolved { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Resolved pairs; empty when exhausted.
    pub fn into_pairs(self) -> Vec<(Doi, MetadataRecord)> {
        match self {
            Self::Resolved { pairs, .. } => pairs,
            Self::Exhausted { .. } => Vec::new(),
        }
    }
}

/// Batch fetcher over a [`Registry`].
pub struct Fetcher<R, S> {
    registry: R,
    policy: RetryPolicy,
    sleeper: S,
}

impl<R: Registry, S: Sleeper> Fetcher<R, S> {
    pub fn new(registry: R, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            registry,
            policy,
            sleeper,
        }
    }

    /// Look up the whole batch, retrying the full request on any failure.
    ///
    /// Response shape is resolved here: records without a DOI are dropped,
    /// and echoed DOIs are lower-cased before pairing.
    pub fn fetch(&self, batch: &Batch, pb: &ProgressBar) -> FetchOutcome {
        let label = batch.label();
        let mut attempts = 0u32;
        let result = retry_with_backoff(&label, &self.policy, &self.sleeper, pb, || {
            attempts += 1;
            self.registry.lookup(&batch.dois)
        });

        match result {
            Ok(response) => {
                let pairs = response.into_pairs();
                if pairs.len() < batch.len() {
                    log::debug!(
                        "{label}: resolved {}/{} DOIs (attempt {attempts})",
                        pairs.len(),
                        batch.len()
                    );
                }
                FetchOutcome::Resolved { pairs, attempts }
            }
            Err(exhausted) => FetchOutcome::Exhausted {
                attempts: exhausted.attempts,
                last_error: exhausted.last_error,
            },
        }
    }
}
