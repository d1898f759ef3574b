//! Doiline Crossref - resumable DOI metadata fetcher
//!
//! Reads DOIs from a JSONL file, skips those already recorded in the
//! checkpoint, and fetches the rest from the Crossref REST API in bounded
//! batches. Each batch lands in its own `batch_{n}.jsonl.gz`; the
//! checkpoint is rewritten after every batch so an interrupted run resumes
//! where it stopped.
//!
//! # Example
//!
//! ```ignore
//! use doiline_core::{ProgressContext, ThreadSleeper};
//! use doiline_crossref::{Config, CrossrefClient, Fetcher, run};
//!
//! let config = Config {
//!     input: "dois.jsonl".into(),
//!     ..Default::default()
//! };
//! let client = CrossrefClient::new(&config.base_url, config.mailto.clone())?;
//! let fetcher = Fetcher::new(client, config.retry_policy(), ThreadSleeper);
//! let summary = run(&config, &fetcher, &ProgressContext::hidden())?;
//! println!("{} records written", summary.records_written);
//! ```

pub mod api;
pub mod batcher;
pub mod checkpoint;
pub mod config;
pub mod doi;
pub mod fetcher;
pub mod record;
pub mod runner;
pub mod source;
pub mod status;
pub mod writer;

// Re-exports
pub use api::{CrossrefClient, Registry};
pub use batcher::{Batch, Batcher};
pub use checkpoint::{CheckpointSet, CheckpointStore};
pub use config::Config;
pub use doi::Doi;
pub use fetcher::{FetchOutcome, Fetcher};
pub use record::{MetadataRecord, WorksResponse};
pub use runner::{Summary, run};
pub use status::{Status, status};
pub use writer::{BatchWriter, next_sequence};
