//! Content fingerprints for global dictionaries using BLAKE3
//!
//! Two peers holding dictionaries with the same fingerprint agree on every
//! index. Because dictionaries only grow by appending, a peer can also check
//! that its snapshot is a prefix of another by comparing prefix fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest of an ordered word list
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictionaryFingerprint(pub [u8; 32]);

impl DictionaryFingerprint {
    /// Compute the fingerprint of an ordered word list
    ///
    /// Each word is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn of_words<S: AsRef<str>>(words: &[S]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(words.len() as u64).to_le_bytes());
        for word in words {
            let bytes = word.as_ref().as_bytes();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for DictionaryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for DictionaryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DictionaryFingerprint({}...)", &self.to_hex()[..8])
    }
}
