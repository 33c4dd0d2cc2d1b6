//! Process-wide holder of the current global dictionary
//!
//! Readers load the current `Arc<GlobalDictionary>` without locking and keep
//! it for the duration of one encode or decode. Upgrades publish a whole new
//! snapshot with a single compare-and-swap; a writer that loses the race
//! re-validates against the winner before retrying.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info};

use super::global::{DictionaryError, GlobalDictionary};

/// Shared, atomically upgradable global dictionary
pub struct DictionaryRegistry {
    current: ArcSwap<GlobalDictionary>,
}

impl DictionaryRegistry {
    /// Create a registry holding the startup snapshot
    pub fn new(initial: GlobalDictionary) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Current snapshot; never blocks
    pub fn snapshot(&self) -> Arc<GlobalDictionary> {
        self.current.load_full()
    }

    /// Version of the current snapshot
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Publish a newer, strictly longer snapshot that extends the current one
    ///
    /// Returns the snapshot that was replaced.
    pub fn upgrade(
        &self,
        next: GlobalDictionary,
    ) -> Result<Arc<GlobalDictionary>, DictionaryError> {
        let next = Arc::new(next);
        loop {
            let current = self.current.load_full();
            Self::check_upgrade(&current, &next)?;

            let previous = self
                .current
                .compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &current) {
                info!(
                    "Global dictionary upgraded v{} -> v{} ({} -> {} words, {} -> {})",
                    current.version(),
                    next.version(),
                    current.len(),
                    next.len(),
                    current.fingerprint(),
                    next.fingerprint()
                );
                return Ok(current);
            }

            debug!(
                "Concurrent dictionary upgrade detected while publishing v{}, retrying",
                next.version()
            );
        }
    }

    fn check_upgrade(
        current: &GlobalDictionary,
        next: &GlobalDictionary,
    ) -> Result<(), DictionaryError> {
        if next.version() <= current.version() {
            return Err(DictionaryError::StaleVersion {
                current: current.version(),
                proposed: next.version(),
            });
        }
        if next.len() <= current.len() || !current.is_prefix_of(next) {
            return Err(DictionaryError::NotAppendOnly {
                current: current.version(),
                proposed: next.version(),
            });
        }
        Ok(())
    }
}

impl Default for DictionaryRegistry {
    fn default() -> Self {
        Self::new(GlobalDictionary::empty())
    }
}

impl std::fmt::Debug for DictionaryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.load();
        f.debug_struct("DictionaryRegistry")
            .field("version", &current.version())
            .field("len", &current.len())
            .field("fingerprint", &current.fingerprint())
            .finish()
    }
}
