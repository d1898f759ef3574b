//! Normalized DOI identifier

use std::fmt;

use serde::{Deserialize, Serialize};

/// A DOI, trimmed and lower-cased.
///
/// DOIs are case-insensitive, so the lower-cased form is the identity key
/// for deduplication and checkpointing. The only way to build one is
/// [`Doi::normalize`], so every value in the pipeline is already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
