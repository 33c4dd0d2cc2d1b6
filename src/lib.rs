//! attrbag - Dictionary-Coded Attribute Bags
//!
//! The attribute-encoding core of a service-mesh telemetry pipeline:
//! - Attributes are typed name/value pairs collected into a bag per request
//! - Names and strings are interned against a shared, versioned global
//!   dictionary, with a per-message local dictionary for everything else
//! - Bags travel as protobuf-compatible records and decode against whatever
//!   dictionary version the receiver holds, as long as it is a superset
//! - Bags from several call sites merge with last-writer-wins overlay

pub mod bag;
pub mod codec;
pub mod config;
pub mod dictionary;

// Re-export commonly used types
pub use bag::{
    merge, merge_with, AttributeBag, BagError, Duration, MergeOptions, StringMap, Timestamp,
    Value, ValueKind,
};
pub use codec::{
    decode, decode_batch, decode_batch_merged, decode_record, encode, encode_record, Batch,
    BatchEncoder, CodecError, CodecOptions, CompressedRecord, Encoder, WireError,
};
pub use config::{Config, ConfigError};
pub use dictionary::{
    DictionaryError, DictionaryFingerprint, DictionaryRegistry, GlobalDictionary, Interner,
    Resolver, UnknownIndex, WordIndex,
};
