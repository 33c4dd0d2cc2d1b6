//! Decode-side index resolution
//!
//! The inverse of [`Interner`](super::Interner): positive indices resolve
//! against the receiver's global snapshot, negative ones against the words
//! carried by the message. Anything else is rejected.

use thiserror::Error;

use super::global::GlobalDictionary;
use super::index::{WordIndex, WordSlot};

/// An index that names neither a global nor a local word
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("index {index} resolves to no word (global has {global_len}, local has {local_len})")]
pub struct UnknownIndex {
    pub index: i32,
    pub global_len: usize,
    pub local_len: usize,
}

/// Pairing of a borrowed global snapshot and a message's local words
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    global: &'a GlobalDictionary,
    words: &'a [String],
}

impl<'a> Resolver<'a> {
    pub fn new(global: &'a GlobalDictionary, words: &'a [String]) -> Self {
        Self { global, words }
    }

    /// Resolve a raw wire index
    pub fn resolve_raw(&self, raw: i32) -> Result<&'a str, UnknownIndex> {
        WordIndex::from_raw(raw)
            .and_then(|index| self.lookup(index))
            .ok_or_else(|| self.unknown(raw))
    }

    /// Resolve a typed index
    pub fn resolve(&self, index: WordIndex) -> Result<&'a str, UnknownIndex> {
        self.lookup(index).ok_or_else(|| self.unknown(index.raw()))
    }

    fn lookup(&self, index: WordIndex) -> Option<&'a str> {
        match index.slot() {
            WordSlot::Global(_) => self.global.resolve(index),
            WordSlot::Local(offset) => self.words.get(offset).map(String::as_str),
        }
    }

    fn unknown(&self, index: i32) -> UnknownIndex {
        UnknownIndex {
            index,
            global_len: self.global.len(),
            local_len: self.words.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalDictionary {
        GlobalDictionary::new(1, vec!["a".into(), "b".into()]).unwrap()
    }

    #[test]
    fn test_resolves_both_tables() {
        let g = global();
        let words = vec!["local-1".to_string(), "local-2".to_string()];
        let resolver = Resolver::new(&g, &words);

        assert_eq!(resolver.resolve_raw(1).unwrap(), "a");
        assert_eq!(resolver.resolve_raw(2).unwrap(), "b");
        assert_eq!(resolver.resolve_raw(-1).unwrap(), "local-1");
        assert_eq!(resolver.resolve_raw(-2).unwrap(), "local-2");
    }

    #[test]
    fn test_rejects_zero_and_out_of_range() {
        let g = global();
        let words = vec!["only".to_string()];
        let resolver = Resolver::new(&g, &words);

        for raw in [0, 3, -2, i32::MAX, i32::MIN] {
            let err = resolver.resolve_raw(raw).unwrap_err();
            assert_eq!(
                err,
                UnknownIndex {
                    index: raw,
                    global_len: 2,
                    local_len: 1
                }
            );
        }
    }

    #[test]
    fn test_resolution_stable_across_versions() {
        let v1 = global();
        let v2 = v1.extend(2, vec!["c".to_string()]).unwrap();
        let words: Vec<String> = Vec::new();

        for position in 1..=v1.len() {
            let index = WordIndex::global(position).unwrap();
            assert_eq!(
                Resolver::new(&v1, &words).resolve(index).unwrap(),
                Resolver::new(&v2, &words).resolve(index).unwrap()
            );
        }
        assert!(Resolver::new(&v1, &words).resolve_raw(3).is_err());
        assert_eq!(Resolver::new(&v2, &words).resolve_raw(3).unwrap(), "c");
    }
}
