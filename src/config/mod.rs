//! Runtime configuration
//!
//! A single JSON document with every field optional:
//!
//! ```json
//! {
//!   "dictionary_path": "dictionary.json",
//!   "dictionary_fingerprint": null,
//!   "log_filter": "info",
//!   "codec": { "max_local_words": 2147483647, "peer_word_count": null }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::codec::CodecOptions;
use crate::dictionary::{DictionaryError, DictionaryFingerprint, GlobalDictionary};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("Invalid dictionary fingerprint {value:?}: {reason}")]
    InvalidFingerprint { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global dictionary file; relative paths are taken from the config file's directory
    pub dictionary_path: PathBuf,
    /// Hex BLAKE3 fingerprint the loaded dictionary must match
    pub dictionary_fingerprint: Option<String>,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
    pub codec: CodecOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dictionary_path: PathBuf::from("dictionary.json"),
            dictionary_fingerprint: None,
            log_filter: "info".to_string(),
            codec: CodecOptions::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_json::from_str(json)?;
        config.codec = config.codec.clamped();
        Ok(config)
    }

    /// Read a config file, anchoring a relative dictionary path next to it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&contents)?;

        if config.dictionary_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.dictionary_path = dir.join(&config.dictionary_path);
            }
        }
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// The pinned fingerprint, if any
    pub fn fingerprint(&self) -> Result<Option<DictionaryFingerprint>, ConfigError> {
        self.dictionary_fingerprint
            .as_deref()
            .map(|value| {
                DictionaryFingerprint::from_hex(value).map_err(|e| ConfigError::InvalidFingerprint {
                    value: value.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Load the global dictionary and check it against the pin
    pub fn load_dictionary(&self) -> Result<GlobalDictionary, ConfigError> {
        let pinned = self.fingerprint()?;
        let dictionary = GlobalDictionary::from_file(&self.dictionary_path)?;
        if let Some(expected) = pinned {
            dictionary.verify_fingerprint(&expected)?;
        }
        Ok(dictionary)
    }
}
