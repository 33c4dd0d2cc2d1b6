//! Dictionary Module - Global and Local Word Tables
//!
//! Strings carried in attribute bags are replaced by signed indices:
//!
//! 1. **Global dictionary** - deployment-wide, versioned, append-only
//! 2. **Local dictionary** - per-message word list for everything else
//! 3. **Interner** - encode side, prefers global indices
//! 4. **Resolver** - decode side, turns indices back into strings
//! 5. **Registry** - lock-free access to the current global snapshot

mod fingerprint;
mod global;
mod index;
mod interner;
mod registry;
mod resolver;

pub use fingerprint::DictionaryFingerprint;
pub use global::{DictionaryError, DictionaryFile, GlobalDictionary};
pub use index::{WordIndex, WordSlot};
pub use interner::{Interner, LocalOverflow, MAX_LOCAL_WORDS};
pub use registry::DictionaryRegistry;
pub use resolver::{Resolver, UnknownIndex};
