//! Checkpoint store: DOIs already fetched and durably written
//!
//! The artifact is plain text, one normalized DOI per line, no header.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::doi::Doi;

/// Set of DOIs whose metadata already sits in some batch artifact.
///
/// Owned by the runner; only [`crate::writer::BatchWriter`] adds to it, and
/// only after the batch artifact is in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckpointSet {
    set: FxHashSet<Doi>,
}

impl CheckpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, doi: &Doi) -> bool {
        self.set.contains(doi)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Doi> {
        self.set.iter()
    }

    /// Visible within the crate so that only the batch writer folds
    /// results in.
    pub(crate) fn extend<I: IntoIterator<Item = Doi>>(&mut self, dois: I) {
        self.set.extend(dois);
    }
}

impl FromIterator<Doi> for CheckpointSet {
    fn from_iter<I: IntoIterator<Item = Doi>>(iter: I) -> Self {
        Self {
            set: iter.into_iter().collect(),
        }
    }
}

/// Durable home of the [`CheckpointSet`]
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint. A missing file is an empty set, not an error.
    pub fn load(&self) -> std::io::Result<CheckpointSet> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No checkpoint at {}, starting fresh", self.path.display());
                return Ok(CheckpointSet::new());
            }
            Err(e) => return Err(e),
        };
        let set: CheckpointSet = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Doi::normalize)
            .collect();
        log::info!(
            "Loaded {} processed DOIs from {}",
            set.len(),
            self.path.display()
        );
        Ok(set)
    }

    /// Overwrite the checkpoint: write `<path>.tmp`, fsync, rename over the
    /// old file. A failure leaves the previous artifact untouched.
    pub fn save(&self, checkpoint: &CheckpointSet) -> std::io::Result<()> {
        let tmp_path = self.tmp_path();
        let result =
            write_sorted(&tmp_path, checkpoint).and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        log::debug!(
            "Saved {} processed DOIs to {}",
            checkpoint.len(),
            self.path.display()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Sorted output keeps successive checkpoints diffable.
fn write_sorted(path: &Path, checkpoint: &CheckpointSet) -> std::io::Result<()> {
    let mut dois: Vec<&Doi> = checkpoint.iter().collect();
    dois.sort_unstable();

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for doi in dois {
        writeln!(writer, "{doi}")?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(ids: &[&str]) -> CheckpointSet {
        ids.iter().map(|s| Doi::normalize(s)).collect()
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("processed_dois.txt"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("processed_dois.txt"));
        let original = set(&["10.1/b", "10.1/a", "10.2/c"]);
        store.save(&original).unwrap();
        assert_eq!(store.load().unwrap(), original);
    }

    #[test]
    fn saved_file_is_one_doi_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_dois.txt");
        let store = CheckpointStore::new(&path);
        store.save(&set(&["10.1/b", "10.1/a"])).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "10.1/a\n10.1/b\n");
    }

    #[test]
    fn load_skips_blank_lines_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_dois.txt");
        std::fs::write(&path, "10.1/A\n\n  \n10.1/b  \n").unwrap();
        let loaded = CheckpointStore::new(&path).load().unwrap();
        assert_eq!(loaded, set(&["10.1/a", "10.1/b"]));
    }

    #[test]
    fn save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("processed_dois.txt"));
        store.save(&set(&["10.1/a", "10.1/b"])).unwrap();
        store.save(&set(&["10.1/c"])).unwrap();
        assert_eq!(store.load().unwrap(), set(&["10.1/c"]));
    }

    #[test]
    fn save_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("processed_dois.txt"));
        store.save(&set(&["10.1/a"])).unwrap();
        assert!(!dir.path().join("processed_dois.txt.tmp").exists());
    }

    #[test]
    fn failed_save_keeps_prior_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_dois.txt");
        let store = CheckpointStore::new(&path);
        store.save(&set(&["10.1/a"])).unwrap();

        // A directory squatting on the tmp path makes File::create fail
        std::fs::create_dir(dir.path().join("processed_dois.txt.tmp")).unwrap();
        assert!(store.save(&set(&["10.1/a", "10.1/b"])).is_err());
        assert_eq!(store.load().unwrap(), set(&["10.1/a"]));
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("gone").join("processed_dois.txt"));
        assert!(store.save(&set(&["10.1/a"])).is_err());
    }
}
