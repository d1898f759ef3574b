//! Crossref pipeline configuration

use std::path::PathBuf;

use doiline_core::RetryPolicy;
use doiline_core::retry::DEFAULT_MAX_ATTEMPTS;

/// Crossref accepts at most this many DOIs in one filter query
pub const MAX_BATCH_SIZE: usize = 1000;

/// Runtime configuration for the Crossref pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// JSONL file listing the DOIs to fetch
    pub input: PathBuf,
    /// Field holding the DOI in each input line
    pub id_field: String,
    /// Directory for `batch_{n}.jsonl.gz` artifacts
    pub output_dir: PathBuf,
    /// Processed-DOI checkpoint file
    pub checkpoint: PathBuf,
    /// DOIs per registry request
    pub batch_size: usize,
    /// Attempts per batch, first try included
    pub max_retries: u32,
    /// Stop after this many batches (for testing)
    pub max_batches: Option<usize>,
    /// Collapse repeated DOIs before batching
    pub dedupe: bool,
    /// Gzip level for batch artifacts (0-9)
    pub gzip_level: u32,
    /// Crossref REST API base URL
    pub base_url: String,
    /// Contact address for Crossref's polite pool
    pub mailto: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("processed_dois.jsonl"),
            id_field: "doi".to_string(),
            output_dir: PathBuf::from("doi_metadata"),
            checkpoint: PathBuf::from("processed_dois.txt"),
            batch_size: 100,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            max_batches: None,
            dedupe: false,
            gzip_level: 6,
            base_url: "https://api.crossref.org/".to_string(),
            mailto: None,
        }
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_size >= 1, "batch size must be at least 1");
        anyhow::ensure!(
            self.batch_size <= MAX_BATCH_SIZE,
            "batch size {} exceeds Crossref limit of {MAX_BATCH_SIZE}",
            self.batch_size
        );
        anyhow::ensure!(self.max_retries >= 1, "max retries must be at least 1");
        anyhow::ensure!(self.gzip_level <= 9, "gzip level must be 0-9");
        anyhow::ensure!(!self.id_field.is_empty(), "identifier field name is empty");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.id_field, "doi");
        assert_eq!(config.output_dir, PathBuf::from("doi_metadata"));
        assert_eq!(config.checkpoint, PathBuf::from("processed_dois.txt"));
        assert!(config.base_url.starts_with("https://"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = Config {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_batch_rejected() {
        let config = Config {
            batch_size: MAX_BATCH_SIZE + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retries_rejected() {
        let config = Config {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_uses_max_retries() {
        let config = Config {
            max_retries: 3,
            ..Default::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 3);
    }
}
