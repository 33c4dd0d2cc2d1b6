//! Codec - Attribute Bags on the Wire
//!
//! Turns an [`AttributeBag`](crate::bag::AttributeBag) into a compact
//! `CompressedRecord` and back:
//!
//! - **Encode** interns every name and string through one session, preferring
//!   global indices and collecting the rest into the record's `words`
//! - **Decode** resolves every index against the receiver's snapshot and the
//!   carried words; any failure rejects the whole record
//! - **Batch** groups records so common local words travel once

mod batch;
mod decode;
mod encode;
mod record;
pub mod wire;

pub use batch::{decode_batch, decode_batch_merged, BatchEncoder};
pub use decode::{decode, decode_record};
pub use encode::{encode, encode_record, Encoder};
pub use record::{Batch, CompressedRecord, MapValue, StringMapEntries};
pub use wire::{Codec, WireError, WireResult};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bag::ValueKind;
use crate::dictionary::{LocalOverflow, UnknownIndex, MAX_LOCAL_WORDS};

/// Errors from encoding or decoding a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error(transparent)]
    UnknownIndex(#[from] UnknownIndex),

    #[error("malformed record: {0}")]
    Malformed(#[from] WireError),

    #[error(transparent)]
    LocalOverflow(#[from] LocalOverflow),

    /// A bag value that would not survive decoding
    #[error("attribute {name:?} holds an invalid {kind} value")]
    InvalidValue { name: String, kind: ValueKind },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Cap on the local dictionary of one record (or one batch)
    pub max_local_words: usize,

    /// Global dictionary size of the receiving peer, if it lags behind
    pub peer_word_count: Option<usize>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_local_words: MAX_LOCAL_WORDS,
            peer_word_count: None,
        }
    }
}

impl CodecOptions {
    /// Clamp values the index space cannot represent
    pub fn clamped(self) -> Self {
        Self {
            max_local_words: self.max_local_words.min(MAX_LOCAL_WORDS),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_from_empty_json() {
        let options: CodecOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CodecOptions::default());
        assert_eq!(options.max_local_words, i32::MAX as usize);
    }

    #[test]
    fn test_options_clamped() {
        let options = CodecOptions {
            max_local_words: usize::MAX,
            peer_word_count: Some(3),
        };
        let clamped = options.clamped();
        assert_eq!(clamped.max_local_words, MAX_LOCAL_WORDS);
        assert_eq!(clamped.peer_word_count, Some(3));
    }

    #[test]
    fn test_error_wraps_sources() {
        let err: CodecError = WireError::InvalidBool(3).into();
        assert_eq!(err.to_string(), "malformed record: invalid boolean value: 3");

        let err: CodecError = LocalOverflow { limit: 1 }.into();
        assert!(matches!(err, CodecError::LocalOverflow(_)));
    }

    mod properties {
        use super::super::*;
        use crate::bag::{AttributeBag, Duration, StringMap, Timestamp, Value};
        use crate::dictionary::GlobalDictionary;
        use proptest::prelude::*;

        const GLOBAL_WORDS: [&str; 6] = [
            "request.path",
            "request.method",
            "GET",
            "POST",
            "response.code",
            "request.headers",
        ];

        fn global() -> GlobalDictionary {
            GlobalDictionary::new(1, GLOBAL_WORDS.iter().map(|w| w.to_string()).collect())
                .unwrap()
        }

        /// Mix of global words and fresh strings
        fn word_strat() -> impl Strategy<Value = String> {
            prop_oneof![
                proptest::sample::select(GLOBAL_WORDS.to_vec()).prop_map(str::to_owned),
                "[a-z.:/-]{0,12}",
            ]
        }

        fn value_strat() -> impl Strategy<Value = Value> {
            let duration = (0i64..1_000_000, 0i32..1_000_000_000, any::<bool>()).prop_map(
                |(seconds, nanos, negative)| {
                    let d = Duration { seconds, nanos };
                    if negative {
                        d.negated()
                    } else {
                        d
                    }
                },
            );
            prop_oneof![
                word_strat().prop_map(Value::String),
                any::<i64>().prop_map(Value::Int64),
                (-1e12f64..1e12).prop_map(Value::Double),
                any::<bool>().prop_map(Value::Bool),
                (any::<i64>(), 0i32..1_000_000_000)
                    .prop_map(|(seconds, nanos)| Value::Timestamp(Timestamp { seconds, nanos })),
                duration.prop_map(Value::Duration),
                proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
                proptest::collection::vec((word_strat(), word_strat()), 0..4)
                    .prop_map(|pairs| Value::StringMap(pairs.into_iter().collect::<StringMap>())),
            ]
        }

        /// Time values whose nanos are out of range or disagree in sign
        fn invalid_time_strat() -> impl Strategy<Value = Value> {
            let nanos = prop_oneof![i32::MIN..0, 1_000_000_000..=i32::MAX];
            prop_oneof![
                (any::<i64>(), nanos)
                    .prop_map(|(seconds, nanos)| Value::Timestamp(Timestamp { seconds, nanos })),
                (1i64..1_000_000, -999_999_999i32..0)
                    .prop_map(|(seconds, nanos)| Value::Duration(Duration { seconds, nanos })),
                (any::<i64>(), 1_000_000_000..=i32::MAX)
                    .prop_map(|(seconds, nanos)| Value::Duration(Duration { seconds, nanos })),
            ]
        }

        fn bag_strat() -> impl Strategy<Value = AttributeBag> {
            bag_of(value_strat())
        }

        /// Bags that may hold values `set` would refuse
        fn unchecked_bag_strat() -> impl Strategy<Value = AttributeBag> {
            bag_of(prop_oneof![6 => value_strat(), 1 => invalid_time_strat()])
        }

        fn bag_of(values: impl Strategy<Value = Value>) -> impl Strategy<Value = AttributeBag> {
            proptest::collection::vec((word_strat(), values), 0..12).prop_map(|entries| {
                let mut bag = AttributeBag::new();
                for (name, value) in entries {
                    bag.replace(name, value);
                }
                bag
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

            #[test]
            fn test_roundtrip(bag in bag_strat()) {
                let g = global();
                let bytes = encode(&bag, &g).unwrap();
                prop_assert_eq!(decode(&bytes, &g).unwrap(), bag);
            }

            #[test]
            fn test_encode_refuses_what_decode_would_reject(bag in unchecked_bag_strat()) {
                let g = global();
                let invalid = bag.iter().any(|(_, value)| !value.is_valid());
                match encode(&bag, &g) {
                    Ok(bytes) => {
                        prop_assert!(!invalid);
                        prop_assert_eq!(decode(&bytes, &g).unwrap(), bag);
                    }
                    Err(err) => {
                        prop_assert!(invalid);
                        let is_invalid_value = matches!(err, CodecError::InvalidValue { .. });
                        prop_assert!(is_invalid_value);
                    }
                }
            }

            #[test]
            fn test_decodes_under_any_extension(bag in bag_strat(), extra in proptest::collection::vec("[A-Z]{1,6}", 0..4)) {
                let g = global();
                let mut extra = extra;
                extra.sort();
                extra.dedup();
                extra.retain(|w| !GLOBAL_WORDS.contains(&w.as_str()));
                let newer = g.extend(2, extra).unwrap();

                let bytes = encode(&bag, &g).unwrap();
                prop_assert_eq!(decode(&bytes, &newer).unwrap(), bag);
            }

            #[test]
            fn test_local_words_are_compact(bag in bag_strat()) {
                let g = global();
                let record = encode_record(&bag, &g).unwrap();

                let mut seen = record.words.clone();
                seen.sort();
                seen.dedup();
                prop_assert_eq!(seen.len(), record.words.len());
                for word in &record.words {
                    prop_assert!(g.index_of(word).is_none());
                }
            }

            #[test]
            fn test_batch_roundtrip(bags in proptest::collection::vec(bag_strat(), 0..4)) {
                let g = global();
                let mut encoder = BatchEncoder::new(&g);
                for bag in &bags {
                    encoder.push(bag).unwrap();
                }
                prop_assert_eq!(decode_batch(&encoder.encode(), &g).unwrap(), bags);
            }
        }
    }
}
