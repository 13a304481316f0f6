//! Reference corpus of translated example pairs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{TranslateError, TranslateResult};

/// A known (source, target) translation pair.
///
/// Serialized as `{"kql": ..., "sql": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(rename = "kql", alias = "source_query")]
    pub source_query: String,
    #[serde(rename = "sql", alias = "target_query")]
    pub target_query: String,
}

impl CorpusEntry {
    pub fn new(source_query: impl Into<String>, target_query: impl Into<String>) -> Self {
        Self {
            source_query: source_query.into(),
            target_query: target_query.into(),
        }
    }
}

/// Read-only collection of example pairs, in load order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of example pairs.
    pub fn from_json(json: &str) -> TranslateResult<Self> {
        let entries: Vec<CorpusEntry> =
            serde_json::from_str(json).map_err(|e| TranslateError::Corpus(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Load a JSON array of example pairs from disk.
    pub fn load(path: impl AsRef<Path>) -> TranslateResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            TranslateError::Corpus(format!("cannot read {}: {}", path.display(), e))
        })?;
        let corpus = Self::from_json(&json)?;
        tracing::info!(entries = corpus.len(), path = %path.display(), "loaded corpus");
        Ok(corpus)
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CorpusEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<CorpusEntry>> for Corpus {
    fn from(entries: Vec<CorpusEntry>) -> Self {
        Self::new(entries)
    }
}
