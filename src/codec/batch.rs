//! Batches of records with a shared local dictionary
//!
//! Records produced together (one report flush, one proxy connection) tend to
//! repeat the same non-global strings. A [`BatchEncoder`] interns all of them
//! through one session and ships the words once as `default_words`.

use tracing::{debug, warn};

use super::decode::resolve_record;
use super::encode::{fill_record, Encoder};
use super::record::{Batch, CompressedRecord};
use super::wire::Codec;
use super::CodecResult;
use crate::bag::{merge, AttributeBag};
use crate::dictionary::{GlobalDictionary, Interner, Resolver};

/// Accumulates bags into one [`Batch`]
#[derive(Debug)]
pub struct BatchEncoder<'g> {
    interner: Interner<'g>,
    records: Vec<CompressedRecord>,
}

impl<'g> BatchEncoder<'g> {
    /// Start an empty batch with default options
    pub fn new(global: &'g GlobalDictionary) -> Self {
        Encoder::new(global).batch()
    }

    /// Intern `bag` into the shared session and queue its record
    pub fn push(&mut self, bag: &AttributeBag) -> CodecResult<()> {
        let record = fill_record(bag, &mut self.interner)?;
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Batch {
        let global_word_count = u32::try_from(self.interner.global_limit()).unwrap_or(u32::MAX);
        let batch = Batch {
            records: self.records,
            default_words: self.interner.into_words(),
            global_word_count,
        };
        debug!(
            records = batch.records.len(),
            default_words = batch.default_words.len(),
            global_word_count,
            "Finished batch"
        );
        batch
    }

    pub fn encode(self) -> Vec<u8> {
        self.finish().to_bytes()
    }
}

impl<'g> Encoder<'g> {
    /// Start a batch sharing this encoder's options
    pub fn batch(&self) -> BatchEncoder<'g> {
        BatchEncoder {
            interner: self.interner(),
            records: Vec::new(),
        }
    }
}

/// Decode every record of a batch, in order
pub fn decode_batch(bytes: &[u8], global: &GlobalDictionary) -> CodecResult<Vec<AttributeBag>> {
    let batch = Batch::from_bytes(bytes)?;

    let sender_count = batch.global_word_count as usize;
    if sender_count > global.len() {
        warn!(
            sender_words = sender_count,
            local_words = global.len(),
            local_version = global.version(),
            "Batch was encoded against a larger global dictionary"
        );
    }

    batch
        .records
        .iter()
        .map(|record| {
            let words = if record.words.is_empty() {
                &batch.default_words
            } else {
                &record.words
            };
            resolve_record(record, Resolver::new(global, words))
        })
        .collect()
}

/// Decode a batch and overlay its bags in order
pub fn decode_batch_merged(bytes: &[u8], global: &GlobalDictionary) -> CodecResult<AttributeBag> {
    let bags = decode_batch(bytes, global)?;
    Ok(merge(&bags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, CodecOptions};
    use crate::dictionary::UnknownIndex;

    fn global() -> GlobalDictionary {
        GlobalDictionary::new(
            1,
            vec!["request.path".into(), "request.method".into(), "GET".into()],
        )
        .unwrap()
    }

    fn bag(path: &str, code: i64) -> AttributeBag {
        let mut b = AttributeBag::new();
        b.set_string("request.path", path).unwrap();
        b.set_int64("response.code", code).unwrap();
        b
    }

    #[test]
    fn test_shared_words_carried_once() {
        let g = global();
        let mut encoder = BatchEncoder::new(&g);
        encoder.push(&bag("/v1/x", 200)).unwrap();
        encoder.push(&bag("/v1/x", 503)).unwrap();
        assert_eq!(encoder.len(), 2);

        let batch = encoder.finish();
        assert_eq!(batch.default_words, vec!["/v1/x", "response.code"]);
        assert!(batch.records.iter().all(|r| r.words.is_empty()));
        assert_eq!(batch.global_word_count, 3);
    }

    #[test]
    fn test_batch_roundtrip() {
        let g = global();
        let bags = vec![bag("/v1/x", 200), bag("/v1/y", 404)];

        let mut encoder = BatchEncoder::new(&g);
        for b in &bags {
            encoder.push(b).unwrap();
        }
        let bytes = encoder.encode();

        assert_eq!(decode_batch(&bytes, &g).unwrap(), bags);
    }

    #[test]
    fn test_record_with_own_words_ignores_defaults() {
        let g = global();
        let mut own = CompressedRecord {
            words: vec!["own".into()],
            ..Default::default()
        };
        own.strings.insert(1, -1);
        let batch = Batch {
            records: vec![own],
            default_words: vec!["shared".into()],
            global_word_count: 3,
        };

        let bags = decode_batch(&batch.to_bytes(), &g).unwrap();
        assert_eq!(bags[0].get_str("request.path"), Some("own"));
    }

    #[test]
    fn test_merged_last_record_wins() {
        let g = global();
        let mut encoder = BatchEncoder::new(&g);
        encoder.push(&bag("/v1/x", 200)).unwrap();
        encoder.push(&bag("/v1/y", 503)).unwrap();

        let merged = decode_batch_merged(&encoder.encode(), &g).unwrap();
        assert_eq!(merged.get_str("request.path"), Some("/v1/y"));
        assert_eq!(merged.get_int64("response.code"), Some(503));
    }

    #[test]
    fn test_receiver_with_older_dictionary() {
        let old = global();
        let newer = old.extend(2, ["response.code".to_string()]).unwrap();

        // Peer limit keeps the batch readable by the older receiver
        let encoder = Encoder::new(&newer).with_options(CodecOptions {
            peer_word_count: Some(old.len()),
            ..Default::default()
        });
        let mut batch = encoder.batch();
        batch.push(&bag("/v1/x", 200)).unwrap();
        let bytes = batch.encode();
        assert_eq!(decode_batch(&bytes, &old).unwrap()[0], bag("/v1/x", 200));

        // Without it the receiver still decodes, failing only on the new word
        let mut batch = BatchEncoder::new(&newer);
        batch.push(&bag("/v1/x", 200)).unwrap();
        let bytes = batch.encode();
        assert_eq!(
            decode_batch(&bytes, &old),
            Err(CodecError::UnknownIndex(UnknownIndex {
                index: 4,
                global_len: 3,
                local_len: 1,
            }))
        );
    }

    #[test]
    fn test_empty_batch() {
        let g = global();
        let bytes = BatchEncoder::new(&g).encode();
        assert!(decode_batch(&bytes, &g).unwrap().is_empty());
        assert!(decode_batch_merged(&bytes, &g).unwrap().is_empty());
    }
}
