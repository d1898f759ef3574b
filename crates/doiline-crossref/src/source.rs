//! Identifier source: DOIs from a JSONL file
//!
//! Each non-empty line is a JSON object carrying the identifier field
//! (`doi` by default). Other fields, such as the `filename` written by the
//! upstream PDF pass, are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Read every raw identifier from `path`, in file order.
///
/// Any unreadable file, malformed line, or line without a string `field`
/// is an error: the run must not start on a partial identifier list.
pub fn read_identifiers(path: &Path, field: &str) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut ids = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.with_context(|| format!("{}:{lineno}: read failed", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{lineno}: invalid JSON", path.display()))?;
        let id = value
            .get(field)
            .and_then(serde_json::Value::as_str)
            .with_context(|| {
                format!(
                    "{}:{lineno}: missing string field '{field}'",
                    path.display()
                )
            })?;
        ids.push(id.to_string());
    }

    log::info!("Read {} identifiers from {}", ids.len(), path.display());
    Ok(ids)
}
