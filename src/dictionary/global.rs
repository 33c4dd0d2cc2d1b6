//! Global dictionary snapshots
//!
//! A snapshot is an immutable, versioned, ordered list of unique words. New
//! versions only ever append, so index `i` in version `v` names the same word
//! in every later version. Snapshots are shared as `Arc<GlobalDictionary>`
//! and read concurrently without locking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::fingerprint::DictionaryFingerprint;
use super::index::{WordIndex, WordSlot};

/// Errors raised while building, loading or upgrading a global dictionary
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("duplicate word {word:?} at positions {first} and {second}")]
    DuplicateWord {
        word: String,
        first: usize,
        second: usize,
    },
    #[error("dictionary holds {count} words, more than the index space allows")]
    TooManyWords { count: usize },
    #[error("global position {position} out of range (dictionary has {len} words)")]
    OutOfRange { position: usize, len: usize },
    #[error("version {proposed} is not newer than current version {current}")]
    StaleVersion { current: u64, proposed: u64 },
    #[error("version {proposed} does not extend version {current} by appending")]
    NotAppendOnly { current: u64, proposed: u64 },
    #[error("fingerprint mismatch: expected {expected}, found {found}")]
    FingerprintMismatch {
        expected: DictionaryFingerprint,
        found: DictionaryFingerprint,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dictionary file: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk representation of a dictionary version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryFile {
    pub version: u64,
    pub words: Vec<String>,
}

/// Immutable global dictionary snapshot
#[derive(Debug, Clone)]
pub struct GlobalDictionary {
    version: u64,
    words: Vec<String>,
    lookup: HashMap<String, WordIndex>,
    fingerprint: DictionaryFingerprint,
}

impl GlobalDictionary {
    /// Build a snapshot from an ordered list of unique words
    pub fn new(version: u64, words: Vec<String>) -> Result<Self, DictionaryError> {
        let mut lookup = HashMap::with_capacity(words.len());
        for (offset, word) in words.iter().enumerate() {
            let index = WordIndex::global(offset + 1)
                .ok_or_else(|| DictionaryError::TooManyWords { count: words.len() })?;
            if let Some(existing) = lookup.insert(word.clone(), index) {
                return Err(DictionaryError::DuplicateWord {
                    word: word.clone(),
                    first: existing.raw() as usize,
                    second: offset + 1,
                });
            }
        }

        let fingerprint = DictionaryFingerprint::of_words(&words);
        Ok(Self {
            version,
            words,
            lookup,
            fingerprint,
        })
    }

    /// An empty version-0 dictionary; every string goes to the local table
    pub fn empty() -> Self {
        Self {
            version: 0,
            words: Vec::new(),
            lookup: HashMap::new(),
            fingerprint: DictionaryFingerprint::of_words::<String>(&[]),
        }
    }

    /// Parse a dictionary from its JSON file form
    pub fn from_json_str(json: &str) -> Result<Self, DictionaryError> {
        let file: DictionaryFile = serde_json::from_str(json)?;
        Self::new(file.version, file.words)
    }

    /// Load a dictionary from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let dictionary = Self::from_json_str(&contents)?;
        info!(
            "Loaded global dictionary v{} ({} words, {}) from {:?}",
            dictionary.version,
            dictionary.len(),
            dictionary.fingerprint,
            path
        );
        Ok(dictionary)
    }

    /// Build the next version by appending words
    pub fn extend<I>(&self, version: u64, additional: I) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = String>,
    {
        if version <= self.version {
            return Err(DictionaryError::StaleVersion {
                current: self.version,
                proposed: version,
            });
        }
        let mut words = self.words.clone();
        words.extend(additional);
        Self::new(version, words)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn fingerprint(&self) -> DictionaryFingerprint {
        self.fingerprint
    }

    /// Fingerprint of the first `len` words, as an older version would report it
    pub fn prefix_fingerprint(&self, len: usize) -> Option<DictionaryFingerprint> {
        self.words
            .get(..len)
            .map(DictionaryFingerprint::of_words)
    }

    /// Word at 1-based `position`
    pub fn word_at(&self, position: usize) -> Result<&str, DictionaryError> {
        position
            .checked_sub(1)
            .and_then(|offset| self.words.get(offset))
            .map(String::as_str)
            .ok_or_else(|| DictionaryError::OutOfRange {
                position,
                len: self.words.len(),
            })
    }

    /// Word addressed by a positive index, `None` for local or out-of-range indices
    pub fn resolve(&self, index: WordIndex) -> Option<&str> {
        match index.slot() {
            WordSlot::Global(offset) => self.words.get(offset).map(String::as_str),
            WordSlot::Local(_) => None,
        }
    }

    /// Fixed global index of `word`, if present in this version
    pub fn index_of(&self, word: &str) -> Option<WordIndex> {
        self.lookup.get(word).copied()
    }

    /// Whether every word of `self` sits at the same position in `other`
    pub fn is_prefix_of(&self, other: &GlobalDictionary) -> bool {
        self.words.len() <= other.words.len()
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a == b)
    }

    /// Check the snapshot against a pinned fingerprint
    pub fn verify_fingerprint(
        &self,
        expected: &DictionaryFingerprint,
    ) -> Result<(), DictionaryError> {
        if self.fingerprint != *expected {
            return Err(DictionaryError::FingerprintMismatch {
                expected: *expected,
                found: self.fingerprint,
            });
        }
        Ok(())
    }
}

impl Default for GlobalDictionary {
    fn default() -> Self {
        Self::empty()
    }
}
