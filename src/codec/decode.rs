//! Record -> bag

use tracing::debug;

use super::record::{check_unique_words, CompressedRecord};
use super::wire::{Codec, WireError};
use super::CodecResult;
use crate::bag::{AttributeBag, StringMap, Value};
use crate::dictionary::{GlobalDictionary, Resolver};

/// Decode wire bytes into a bag
pub fn decode(bytes: &[u8], global: &GlobalDictionary) -> CodecResult<AttributeBag> {
    let record = CompressedRecord::from_bytes(bytes)?;
    debug!(bytes = bytes.len(), "Parsed record");
    resolve_record(&record, Resolver::new(global, &record.words))
}

/// Resolve a record against `global` and its own words
pub fn decode_record(record: &CompressedRecord, global: &GlobalDictionary) -> CodecResult<AttributeBag> {
    check_unique_words(&record.words)?;
    resolve_record(record, Resolver::new(global, &record.words))
}

/// Build a bag from `record`, resolving every index through `resolver`
///
/// Nothing is returned unless every index resolves and every name is unique.
pub(crate) fn resolve_record(
    record: &CompressedRecord,
    resolver: Resolver<'_>,
) -> CodecResult<AttributeBag> {
    let mut bag = BagBuilder::new(record.attribute_count());

    for (&key, &index) in &record.strings {
        let value = resolver.resolve_raw(index)?;
        bag.insert(resolver.resolve_raw(key)?, Value::String(value.to_owned()))?;
    }
    for (&key, &value) in &record.int64s {
        bag.insert(resolver.resolve_raw(key)?, Value::Int64(value))?;
    }
    for (&key, &value) in &record.doubles {
        bag.insert(resolver.resolve_raw(key)?, Value::Double(value))?;
    }
    for (&key, &value) in &record.bools {
        bag.insert(resolver.resolve_raw(key)?, Value::Bool(value))?;
    }
    for (&key, &value) in &record.timestamps {
        bag.insert(resolver.resolve_raw(key)?, Value::Timestamp(value))?;
    }
    for (&key, &value) in &record.durations {
        bag.insert(resolver.resolve_raw(key)?, Value::Duration(value))?;
    }
    for (&key, value) in &record.bytes {
        bag.insert(resolver.resolve_raw(key)?, Value::Bytes(value.clone()))?;
    }
    for (&key, map) in &record.string_maps {
        let name = resolver.resolve_raw(key)?;
        let mut resolved = StringMap::new();
        for (&k, &v) in &map.entries {
            let k = resolver.resolve_raw(k)?;
            if resolved.contains_key(k) {
                return Err(WireError::DuplicateMapKey {
                    attribute: name.to_owned(),
                    key: k.to_owned(),
                }
                .into());
            }
            resolved.insert(k, resolver.resolve_raw(v)?);
        }
        bag.insert(name, Value::StringMap(resolved))?;
    }

    debug!(
        attributes = bag.inner.len(),
        local_words = record.words.len(),
        "Decoded attribute bag"
    );
    Ok(bag.inner)
}

/// Accumulates decoded attributes, refusing a name seen twice
struct BagBuilder {
    inner: AttributeBag,
}

impl BagBuilder {
    fn new(capacity: usize) -> Self {
        Self {
            inner: AttributeBag::with_capacity(capacity),
        }
    }

    fn insert(&mut self, name: &str, value: Value) -> Result<(), WireError> {
        if self.inner.contains(name) {
            return Err(WireError::DuplicateAttribute {
                name: name.to_owned(),
            });
        }
        self.inner.replace(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::{Duration, Timestamp};
    use crate::codec::{encode, encode_record, CodecError, StringMapEntries};
    use crate::dictionary::UnknownIndex;

    fn global() -> GlobalDictionary {
        GlobalDictionary::new(
            1,
            vec!["request.path".into(), "request.method".into(), "GET".into()],
        )
        .unwrap()
    }

    fn full_bag() -> AttributeBag {
        let mut bag = AttributeBag::new();
        bag.set_string("request.path", "/v1/x").unwrap();
        bag.set_string("request.method", "GET").unwrap();
        bag.set_int64("response.code", 200).unwrap();
        bag.set_double("response.latency", 0.125).unwrap();
        bag.set_bool("connection.mtls", false).unwrap();
        bag.set_timestamp("request.time", Timestamp { seconds: 1_700_000_000, nanos: 42 })
            .unwrap();
        bag.set_duration("response.duration", Duration { seconds: -2, nanos: -5 })
            .unwrap();
        bag.set_bytes("source.ip", vec![10, 0, 0, 1]).unwrap();
        bag.set_string_map(
            "request.headers",
            StringMap::new().with("user-agent", "curl").with(":method", "GET"),
        )
        .unwrap();
        bag
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let g = global();
        let bag = full_bag();

        let bytes = encode(&bag, &g).unwrap();
        assert_eq!(decode(&bytes, &g).unwrap(), bag);
    }

    #[test]
    fn test_concrete_scenario_decodes() {
        let g = global();
        let mut record = CompressedRecord {
            words: vec!["/v1/x".into()],
            ..Default::default()
        };
        record.strings.insert(1, -1);
        record.strings.insert(2, 3);

        let bag = decode_record(&record, &g).unwrap();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get_str("request.path"), Some("/v1/x"));
        assert_eq!(bag.get_str("request.method"), Some("GET"));
    }

    #[test]
    fn test_out_of_range_global_index() {
        let g = global();
        let mut record = CompressedRecord::default();
        record.int64s.insert(4, 1);

        assert_eq!(
            decode_record(&record, &g),
            Err(CodecError::UnknownIndex(UnknownIndex {
                index: 4,
                global_len: 3,
                local_len: 0,
            }))
        );
    }

    #[test]
    fn test_out_of_range_local_and_zero() {
        let g = global();
        let mut record = CompressedRecord {
            words: vec!["only".into()],
            ..Default::default()
        };
        record.strings.insert(1, -2);
        assert!(matches!(
            decode_record(&record, &g),
            Err(CodecError::UnknownIndex(UnknownIndex { index: -2, .. }))
        ));

        let mut record = CompressedRecord::default();
        record.bools.insert(0, true);
        assert!(matches!(
            decode_record(&record, &g),
            Err(CodecError::UnknownIndex(UnknownIndex { index: 0, .. }))
        ));
    }

    #[test]
    fn test_name_in_two_kinds_is_malformed() {
        let g = global();
        let mut record = CompressedRecord::default();
        record.int64s.insert(1, 5);
        record.bools.insert(1, true);

        assert_eq!(
            decode_record(&record, &g),
            Err(CodecError::Malformed(WireError::DuplicateAttribute {
                name: "request.path".into()
            }))
        );
    }

    #[test]
    fn test_name_via_global_and_local_is_malformed() {
        let g = global();
        let mut record = CompressedRecord {
            words: vec!["request.path".into()],
            ..Default::default()
        };
        record.int64s.insert(1, 5);
        record.int64s.insert(-1, 6);

        assert!(matches!(
            decode_record(&record, &g),
            Err(CodecError::Malformed(WireError::DuplicateAttribute { .. }))
        ));
    }

    #[test]
    fn test_duplicate_string_map_key_after_resolution() {
        let g = global();
        let mut entries = StringMapEntries::default();
        entries.entries.insert(3, 1);
        entries.entries.insert(-1, 2);
        let mut record = CompressedRecord {
            words: vec!["GET".into()],
            ..Default::default()
        };
        record.string_maps.insert(1, entries);

        assert_eq!(
            decode_record(&record, &g),
            Err(CodecError::Malformed(WireError::DuplicateMapKey {
                attribute: "request.path".into(),
                key: "GET".into(),
            }))
        );
    }

    #[test]
    fn test_repeated_local_word_is_malformed() {
        let g = global();
        let mut record = CompressedRecord {
            words: vec!["/v1/x".into(), "/v1/x".into()],
            ..Default::default()
        };
        record.strings.insert(1, -2);

        assert_eq!(
            decode_record(&record, &g),
            Err(CodecError::Malformed(WireError::DuplicateWord { word: "/v1/x".into() }))
        );
        assert!(matches!(
            decode(&record.to_bytes(), &g),
            Err(CodecError::Malformed(WireError::DuplicateWord { .. }))
        ));
    }

    #[test]
    fn test_malformed_bytes() {
        let g = global();
        assert!(matches!(
            decode(&[0x12, 0x09, 0x08], &g),
            Err(CodecError::Malformed(WireError::Truncated { .. }))
        ));
        assert!(matches!(
            decode(&[0x0B], &g),
            Err(CodecError::Malformed(WireError::InvalidWireType { .. }))
        ));
    }

    #[test]
    fn test_decode_against_newer_dictionary() {
        let old = global();
        let newer = old.extend(2, ["/v1/x".to_string()]).unwrap();

        let bag = full_bag();
        let bytes = encode(&bag, &old).unwrap();
        assert_eq!(decode(&bytes, &newer).unwrap(), bag);
    }

    #[test]
    fn test_decode_never_touches_snapshot() {
        let g = global();
        let before = g.fingerprint();
        let record = encode_record(&full_bag(), &g).unwrap();

        decode_record(&record, &g).unwrap();
        assert_eq!(g.fingerprint(), before);
        assert_eq!(g.len(), 3);
    }
}
