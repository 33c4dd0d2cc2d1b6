//! Bag -> record

use indexmap::IndexMap;
use tracing::debug;

use super::record::{CompressedRecord, StringMapEntries};
use super::wire::Codec;
use super::{CodecError, CodecOptions, CodecResult};
use crate::bag::{AttributeBag, Value};
use crate::dictionary::{GlobalDictionary, Interner};

/// Encodes bags against one global snapshot
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'g> {
    global: &'g GlobalDictionary,
    options: CodecOptions,
}

impl<'g> Encoder<'g> {
    pub fn new(global: &'g GlobalDictionary) -> Self {
        Self {
            global,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options.clamped();
        self
    }

    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// Size of the global prefix this encoder references
    pub fn global_word_count(&self) -> usize {
        self.interner().global_limit()
    }

    /// Fresh interner honouring the peer limit and local cap
    pub(crate) fn interner(&self) -> Interner<'g> {
        let interner =
            Interner::new(self.global).with_max_local_words(self.options.max_local_words);
        match self.options.peer_word_count {
            Some(limit) => interner.with_global_limit(limit),
            None => interner,
        }
    }

    /// Build the record for `bag` with its own local dictionary
    pub fn encode_record(&self, bag: &AttributeBag) -> CodecResult<CompressedRecord> {
        let mut interner = self.interner();
        let mut record = fill_record(bag, &mut interner)?;
        record.words = interner.into_words();

        debug!(
            attributes = record.attribute_count(),
            local_words = record.words.len(),
            global_version = self.global.version(),
            "Encoded attribute bag"
        );
        Ok(record)
    }

    /// Encode `bag` to wire bytes
    pub fn encode(&self, bag: &AttributeBag) -> CodecResult<Vec<u8>> {
        let bytes = self.encode_record(bag)?.to_bytes();
        debug!(bytes = bytes.len(), "Serialized record");
        Ok(bytes)
    }
}

/// Encode `bag` with default options
pub fn encode(bag: &AttributeBag, global: &GlobalDictionary) -> CodecResult<Vec<u8>> {
    Encoder::new(global).encode(bag)
}

pub fn encode_record(bag: &AttributeBag, global: &GlobalDictionary) -> CodecResult<CompressedRecord> {
    Encoder::new(global).encode_record(bag)
}

/// Intern every attribute of `bag` into a record, leaving `words` empty
///
/// Local words accumulate in `interner`; the caller decides where they go.
pub(crate) fn fill_record(
    bag: &AttributeBag,
    interner: &mut Interner<'_>,
) -> CodecResult<CompressedRecord> {
    let mut record = CompressedRecord::default();

    for (name, value) in bag.iter() {
        if !value.is_valid() {
            return Err(CodecError::InvalidValue {
                name: name.to_owned(),
                kind: value.kind(),
            });
        }
        let key = interner.intern(name)?.raw();
        match value {
            Value::String(s) => {
                let index = interner.intern(s)?.raw();
                record.strings.insert(key, index);
            }
            Value::Int64(v) => {
                record.int64s.insert(key, *v);
            }
            Value::Double(v) => {
                record.doubles.insert(key, *v);
            }
            Value::Bool(v) => {
                record.bools.insert(key, *v);
            }
            Value::Timestamp(v) => {
                record.timestamps.insert(key, *v);
            }
            Value::Duration(v) => {
                record.durations.insert(key, *v);
            }
            Value::Bytes(v) => {
                record.bytes.insert(key, v.clone());
            }
            Value::StringMap(map) => {
                let mut entries = IndexMap::with_capacity(map.len());
                for (k, v) in map.iter() {
                    entries.insert(interner.intern(k)?.raw(), interner.intern(v)?.raw());
                }
                record.string_maps.insert(key, StringMapEntries { entries });
            }
        }
    }
    Ok(record)
}
