//! Batch writer: gzip JSONL artifact per batch, atomic tmp→rename
//!
//! Artifacts are named `batch_{sequence}.jsonl.gz` and never rewritten.
//! Sequence numbers keep increasing across runs: a run starts one past the
//! highest artifact already in the output directory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::checkpoint::CheckpointSet;
use crate::doi::Doi;
use crate::record::MetadataRecord;

const PREFIX: &str = "batch_";
const SUFFIX: &str = ".jsonl.gz";

/// Final artifact name for a batch
pub fn batch_filename(sequence: u64) -> String {
    format!("{PREFIX}{sequence}{SUFFIX}")
}

/// Sequence number from an artifact name, e.g. `batch_12.jsonl.gz` → 12
fn parse_sequence(filename: &str) -> Option<u64> {
    filename
        .strip_prefix(PREFIX)?
        .strip_suffix(SUFFIX)?
        .parse()
        .ok()
}

/// Next free sequence number in `output_dir` (1 when empty or missing).
pub fn next_sequence(output_dir: &Path) -> io::Result<u64> {
    let dir = glob::Pattern::escape(&output_dir.to_string_lossy());
    let pattern = format!("{dir}/{PREFIX}*{SUFFIX}");
    let paths = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let max = paths
        .filter_map(Result::ok)
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).and_then(parse_sequence))
        .max()
        .unwrap_or(0);
    Ok(max + 1)
}

/// Remove stale .tmp files left behind by an interrupted write
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Writes batch artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    output_dir: PathBuf,
    level: Compression,
}

impl BatchWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            level: Compression::default(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }

    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.output_dir.join(batch_filename(sequence))
    }

    /// Write one batch's results and fold their DOIs into `checkpoint`.
    ///
    /// Empty `results` is a no-op: no file, `Ok(0)`. On any error nothing
    /// is added to the checkpoint and the partial file is removed, however
    /// many lines made it to disk.
    pub fn write(
        &self,
        results: &[(Doi, MetadataRecord)],
        sequence: u64,
        checkpoint: &mut CheckpointSet,
    ) -> io::Result<usize> {
        if results.is_empty() {
            log::debug!("No metadata to save for batch #{sequence}");
            return Ok(0);
        }

        let final_path = self.path_for(sequence);
        if final_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", final_path.display()),
            ));
        }
        let tmp_path = self.output_dir.join(format!("{}.tmp", batch_filename(sequence)));

        let written = File::create(&tmp_path)
            .and_then(|file| write_records(file, results, self.level))
            .and_then(|file| file.sync_all())
            .and_then(|()| fs::rename(&tmp_path, &final_path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        checkpoint.extend(results.iter().map(|(doi, _)| doi.clone()));
        log::info!(
            "Saved {} records to {}",
            results.len(),
            final_path.display()
        );
        Ok(results.len())
    }
}

/// One JSON document per line; the DOI is not repeated, the record carries
/// its own. Returns the sink once the gzip trailer is flushed.
fn write_records<W: Write>(
    sink: W,
    results: &[(Doi, MetadataRecord)],
    level: Compression,
) -> io::Result<W> {
    let mut encoder = GzEncoder::new(BufWriter::new(sink), level);
    for (_, record) in results {
        serde_json::to_writer(&mut encoder, record)?;
        encoder.write_all(b"\n")?;
    }
    encoder
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())
}
