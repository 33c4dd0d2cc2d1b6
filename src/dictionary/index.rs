//! Signed word indices shared by the global and local dictionaries
//!
//! A single flat namespace covers both tables:
//! - `i > 0` refers to the global dictionary at 1-based position `i`
//! - `-k < 0` refers to the local word list at 1-based position `k`
//! - `0` is reserved and never valid

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which table a word index points into, with a 0-based offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSlot {
    /// Offset into the global dictionary
    Global(usize),
    /// Offset into the message's local word list
    Local(usize),
}

/// A non-zero signed index into the global or local dictionary
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct WordIndex(i32);

impl WordIndex {
    /// Index of the global word at 1-based `position`
    pub fn global(position: usize) -> Option<Self> {
        let raw = i32::try_from(position).ok()?;
        (raw > 0).then_some(Self(raw))
    }

    /// Index of the local word at 1-based `position`
    pub fn local(position: usize) -> Option<Self> {
        let raw = i32::try_from(position).ok()?;
        (raw > 0).then_some(Self(-raw))
    }

    /// Wrap a raw wire value, refusing the reserved `0`
    pub fn from_raw(raw: i32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Raw signed value as carried on the wire
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn is_global(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_local(self) -> bool {
        self.0 < 0
    }

    /// Table and 0-based offset this index addresses
    pub fn slot(self) -> WordSlot {
        // unsigned_abs handles i32::MIN without overflow
        let offset = self.0.unsigned_abs() as usize - 1;
        if self.is_global() {
            WordSlot::Global(offset)
        } else {
            WordSlot::Local(offset)
        }
    }
}

impl TryFrom<i32> for WordIndex {
    type Error = String;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| "word index 0 is reserved".to_string())
    }
}

impl From<WordIndex> for i32 {
    fn from(index: WordIndex) -> Self {
        index.0
    }
}

impl fmt::Display for WordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for WordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot() {
            WordSlot::Global(_) => write!(f, "WordIndex(global {})", self.0),
            WordSlot::Local(_) => write!(f, "WordIndex(local {})", self.0),
        }
    }
}
