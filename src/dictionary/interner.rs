//! Encode-side interner
//!
//! One interner lives for exactly one encode session. It maps every string
//! to the global dictionary when possible and otherwise appends it to the
//! session's local word list, handing out `-1, -2, ...` in assignment order.

use std::collections::HashMap;
use thiserror::Error;

use super::global::GlobalDictionary;
use super::index::WordIndex;

/// Largest local dictionary the signed index space can address
pub const MAX_LOCAL_WORDS: usize = i32::MAX as usize;

/// The local word list would exceed its configured size
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("local dictionary is full ({limit} words)")]
pub struct LocalOverflow {
    pub limit: usize,
}

/// Per-session string interner over a borrowed global snapshot
#[derive(Debug)]
pub struct Interner<'g> {
    global: &'g GlobalDictionary,
    /// Global indices above this are treated as absent
    global_limit: usize,
    max_local_words: usize,
    words: Vec<String>,
    lookup: HashMap<String, WordIndex>,
}

impl<'g> Interner<'g> {
    /// Start a fresh session against `global`
    pub fn new(global: &'g GlobalDictionary) -> Self {
        Self {
            global,
            global_limit: global.len(),
            max_local_words: MAX_LOCAL_WORDS,
            words: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Only use the first `limit` global words
    ///
    /// Used when the receiving peer is known to hold an older, shorter
    /// version of the dictionary.
    pub fn with_global_limit(mut self, limit: usize) -> Self {
        self.global_limit = limit.min(self.global.len());
        self
    }

    /// Cap the number of local words this session may assign
    pub fn with_max_local_words(mut self, max: usize) -> Self {
        self.max_local_words = max.min(MAX_LOCAL_WORDS);
        self
    }

    /// Number of global words this session may reference
    pub fn global_limit(&self) -> usize {
        self.global_limit
    }

    /// Global index of `s`, if present within the usable prefix
    pub fn intern_global(&self, s: &str) -> Option<WordIndex> {
        self.global
            .index_of(s)
            .filter(|index| index.raw() as usize <= self.global_limit)
    }

    /// Local index of `s`, assigning the next position on first use
    pub fn intern_local(&mut self, s: &str) -> Result<WordIndex, LocalOverflow> {
        if let Some(&index) = self.lookup.get(s) {
            return Ok(index);
        }

        let overflow = LocalOverflow {
            limit: self.max_local_words,
        };
        if self.words.len() >= self.max_local_words {
            return Err(overflow);
        }
        let index = WordIndex::local(self.words.len() + 1).ok_or(overflow)?;

        self.words.push(s.to_owned());
        self.lookup.insert(s.to_owned(), index);
        Ok(index)
    }

    /// Prefer the global index, fall back to a local one
    pub fn intern(&mut self, s: &str) -> Result<WordIndex, LocalOverflow> {
        match self.intern_global(s) {
            Some(index) => Ok(index),
            None => self.intern_local(s),
        }
    }

    /// Local words assigned so far, in assignment order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Finish the session and take the local word list
    pub fn into_words(self) -> Vec<String> {
        self.words
    }
}
