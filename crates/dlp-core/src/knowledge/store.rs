//! Immutable, load-once knowledge base with substring retrieval.
//!
//! Entries live in a single arena (`Vec<KnowledgeEntry>`) in declaration order; a key
//! index sits beside it for exact lookups. Declaration order is significant: it is the
//! order in which matched entries are handed to the prompt builder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Marker text used as retrieval context when no key matched the query.
pub const NO_DOCUMENTS_FOUND: &str = "No relevant documents found in the knowledge base.";

/// A single curated topic: lower-case key and the explanatory text returned on match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: String,
    pub text: String,
}

/// Errors raised while building or loading a knowledge base.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("knowledge key must not be empty (entry #{index})")]
    EmptyKey { index: usize },
    #[error("duplicate knowledge key: {0}")]
    DuplicateKey(String),
    #[error("failed to read knowledge file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse knowledge file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a lookup. `NoMatch` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalResult<'a> {
    NoMatch,
    /// Non-empty, in knowledge base declaration order.
    Matches(Vec<&'a KnowledgeEntry>),
}

impl<'a> RetrievalResult<'a> {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matches(_))
    }

    /// Matched keys in declaration order (empty for `NoMatch`).
    pub fn keys(&self) -> Vec<&'a str> {
        match self {
            Self::NoMatch => Vec::new(),
            Self::Matches(entries) => entries.iter().map(|e| e.key.as_str()).collect(),
        }
    }

    /// First matched entry in declaration order.
    pub fn first(&self) -> Option<&'a KnowledgeEntry> {
        match self {
            Self::NoMatch => None,
            Self::Matches(entries) => entries.first().copied(),
        }
    }
}

/// Read-only mapping from topic key to text. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Builds a knowledge base from `(key, text)` pairs in the given order.
    /// Keys are lower-cased; blank or duplicate (after lower-casing) keys are rejected.
    pub fn new<K, V, I>(pairs: I) -> Result<Self, KnowledgeError>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (i, (key, text)) in pairs.into_iter().enumerate() {
            let key = key.into().to_lowercase();
            if key.trim().is_empty() {
                return Err(KnowledgeError::EmptyKey { index: i });
            }
            if index.contains_key(&key) {
                return Err(KnowledgeError::DuplicateKey(key));
            }
            index.insert(key.clone(), entries.len());
            entries.push(KnowledgeEntry {
                key,
                text: text.into(),
            });
        }
        Ok(Self { entries, index })
    }

    /// Loads an ordered JSON array of `{ "key": ..., "text": ... }` objects.
    pub fn load_json_path<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Vec<KnowledgeEntry> =
            serde_json::from_str(&raw).map_err(|source| KnowledgeError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let kb = Self::new(parsed.into_iter().map(|e| (e.key, e.text)))?;
        tracing::info!(
            target: "dlp::knowledge",
            path = %path.display(),
            entries = kb.len(),
            "Knowledge base loaded from file"
        );
        Ok(kb)
    }

    /// Scans every key against the lower-cased query (contiguous substring match).
    /// All matches are returned in declaration order, not query order.
    pub fn lookup(&self, query: &str) -> RetrievalResult<'_> {
        let normalized = query.to_lowercase();
        let matched: Vec<&KnowledgeEntry> = self
            .entries
            .iter()
            .filter(|e| normalized.contains(e.key.as_str()))
            .collect();
        if matched.is_empty() {
            RetrievalResult::NoMatch
        } else {
            RetrievalResult::Matches(matched)
        }
    }

    /// Exact (case-insensitive) key lookup.
    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.index
            .get(&key.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
