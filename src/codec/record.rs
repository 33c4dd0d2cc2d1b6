//! Compressed record and batch messages
//!
//! Field numbers and types follow the published `CompressedAttributes`
//! schema. Every attribute name and string value is a signed word index;
//! `words` carries the message's local dictionary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::wire::{
    key_len, len_delimited_len, varint_len, zigzag_encode32, Codec, DecodeContext, EncodeContext,
    WireError, WireResult, WireType,
};
use crate::bag::{Duration, Timestamp};

// ============================================================================
// Field numbers
// ============================================================================

mod field {
    pub const WORDS: u32 = 1;
    pub const STRINGS: u32 = 2;
    pub const INT64S: u32 = 3;
    pub const DOUBLES: u32 = 4;
    pub const BOOLS: u32 = 5;
    pub const TIMESTAMPS: u32 = 6;
    pub const DURATIONS: u32 = 7;
    pub const BYTES: u32 = 8;
    pub const STRING_MAPS: u32 = 9;

    pub const ENTRY_KEY: u32 = 1;
    pub const ENTRY_VALUE: u32 = 2;

    pub const SECONDS: u32 = 1;
    pub const NANOS: u32 = 2;

    pub const MAP_ENTRIES: u32 = 1;

    pub const BATCH_RECORDS: u32 = 1;
    pub const BATCH_DEFAULT_WORDS: u32 = 2;
    pub const BATCH_GLOBAL_WORD_COUNT: u32 = 3;
}

// ============================================================================
// Map values
// ============================================================================

/// A type that can sit in the value slot of a `map<sint32, V>` entry
pub trait MapValue: Sized + Default {
    const WIRE_TYPE: WireType;

    fn write_value(&self, ctx: &mut EncodeContext);

    /// Encoded size of the value without its key
    fn value_len(&self) -> usize;

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self>;
}

/// `sint32`, used for word indices
impl MapValue for i32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn write_value(&self, ctx: &mut EncodeContext) {
        ctx.write_sint32(*self);
    }

    fn value_len(&self) -> usize {
        varint_len(u64::from(zigzag_encode32(*self)))
    }

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        ctx.read_sint32()
    }
}

/// `int64`
impl MapValue for i64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn write_value(&self, ctx: &mut EncodeContext) {
        ctx.write_int64(*self);
    }

    fn value_len(&self) -> usize {
        varint_len(*self as u64)
    }

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        ctx.read_int64()
    }
}

impl MapValue for f64 {
    const WIRE_TYPE: WireType = WireType::Fixed64;

    fn write_value(&self, ctx: &mut EncodeContext) {
        ctx.write_fixed64(self.to_bits());
    }

    fn value_len(&self) -> usize {
        8
    }

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        ctx.read_double()
    }
}

impl MapValue for bool {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn write_value(&self, ctx: &mut EncodeContext) {
        ctx.write_varint(u64::from(*self));
    }

    fn value_len(&self) -> usize {
        1
    }

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        ctx.read_bool()
    }
}

impl MapValue for Vec<u8> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn write_value(&self, ctx: &mut EncodeContext) {
        ctx.write_len_delimited(self);
    }

    fn value_len(&self) -> usize {
        len_delimited_len(self.len())
    }

    fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        Ok(ctx.read_len_delimited()?.to_vec())
    }
}

/// Embedded messages travel length-delimited
macro_rules! message_map_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapValue for $ty {
                const WIRE_TYPE: WireType = WireType::LengthDelimited;

                fn write_value(&self, ctx: &mut EncodeContext) {
                    ctx.write_varint(self.encoded_len() as u64);
                    self.encode(ctx);
                }

                fn value_len(&self) -> usize {
                    len_delimited_len(self.encoded_len())
                }

                fn read_value(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
                    let mut nested = ctx.read_message()?;
                    <$ty as Codec>::decode(&mut nested)
                }
            }
        )*
    };
}

message_map_value!(Timestamp, Duration, StringMapEntries);

// ============================================================================
// Map fields
// ============================================================================

fn entry_len<V: MapValue>(key: i32, value: &V) -> usize {
    key_len(field::ENTRY_KEY)
        + key.value_len()
        + key_len(field::ENTRY_VALUE)
        + value.value_len()
}

fn map_field_len<V: MapValue>(number: u32, map: &IndexMap<i32, V>) -> usize {
    map.iter()
        .map(|(key, value)| key_len(number) + len_delimited_len(entry_len(*key, value)))
        .sum()
}

/// One length-delimited `{key = 1; value = 2}` entry per map element
fn write_map_field<V: MapValue>(ctx: &mut EncodeContext, number: u32, map: &IndexMap<i32, V>) {
    for (key, value) in map {
        ctx.write_key(number, WireType::LengthDelimited);
        ctx.write_varint(entry_len(*key, value) as u64);
        ctx.write_key(field::ENTRY_KEY, WireType::Varint);
        key.write_value(ctx);
        ctx.write_key(field::ENTRY_VALUE, V::WIRE_TYPE);
        value.write_value(ctx);
    }
}

/// Read one map entry; absent fields take their defaults
fn read_map_entry<V: MapValue>(ctx: &mut DecodeContext<'_>) -> WireResult<(i32, V)> {
    let mut entry = ctx.read_message()?;
    let mut key = 0i32;
    let mut value = V::default();

    while let Some((number, wire_type)) = entry.read_key()? {
        match number {
            field::ENTRY_KEY => {
                entry.check_wire_type(number, WireType::Varint, wire_type)?;
                key = entry.read_sint32()?;
            }
            field::ENTRY_VALUE => {
                entry.check_wire_type(number, V::WIRE_TYPE, wire_type)?;
                value = V::read_value(&mut entry)?;
            }
            _ => entry.skip(wire_type)?,
        }
    }
    Ok((key, value))
}

fn read_map_field<V: MapValue>(
    ctx: &mut DecodeContext<'_>,
    collection: &'static str,
    map: &mut IndexMap<i32, V>,
) -> WireResult<()> {
    let (key, value) = read_map_entry::<V>(ctx)?;
    if map.insert(key, value).is_some() {
        return Err(WireError::DuplicateKey { collection, key });
    }
    Ok(())
}

/// A local dictionary names each string at most once
pub(crate) fn check_unique_words(words: &[String]) -> WireResult<()> {
    let mut seen = HashSet::with_capacity(words.len());
    for word in words {
        if !seen.insert(word.as_str()) {
            return Err(WireError::DuplicateWord { word: word.clone() });
        }
    }
    Ok(())
}

// ============================================================================
// Timestamp / Duration
// ============================================================================

fn seconds_nanos_len(seconds: i64, nanos: i32) -> usize {
    let mut len = 0;
    if seconds != 0 {
        len += key_len(field::SECONDS) + varint_len(seconds as u64);
    }
    if nanos != 0 {
        len += key_len(field::NANOS) + varint_len(i64::from(nanos) as u64);
    }
    len
}

fn write_seconds_nanos(ctx: &mut EncodeContext, seconds: i64, nanos: i32) {
    if seconds != 0 {
        ctx.write_key(field::SECONDS, WireType::Varint);
        ctx.write_int64(seconds);
    }
    if nanos != 0 {
        ctx.write_key(field::NANOS, WireType::Varint);
        ctx.write_int64(i64::from(nanos));
    }
}

fn read_seconds_nanos(ctx: &mut DecodeContext<'_>) -> WireResult<(i64, i32)> {
    let (mut seconds, mut nanos) = (0i64, 0i32);
    while let Some((number, wire_type)) = ctx.read_key()? {
        match number {
            field::SECONDS => {
                ctx.check_wire_type(number, WireType::Varint, wire_type)?;
                seconds = ctx.read_int64()?;
            }
            field::NANOS => {
                ctx.check_wire_type(number, WireType::Varint, wire_type)?;
                nanos = ctx.read_int32()?;
            }
            _ => ctx.skip(wire_type)?,
        }
    }
    Ok((seconds, nanos))
}

impl Codec for Timestamp {
    fn encode(&self, ctx: &mut EncodeContext) {
        write_seconds_nanos(ctx, self.seconds, self.nanos);
    }

    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        let (seconds, nanos) = read_seconds_nanos(ctx)?;
        Timestamp::new(seconds, nanos).ok_or(WireError::InvalidTimestamp { seconds, nanos })
    }

    fn encoded_len(&self) -> usize {
        seconds_nanos_len(self.seconds, self.nanos)
    }
}

impl Codec for Duration {
    fn encode(&self, ctx: &mut EncodeContext) {
        write_seconds_nanos(ctx, self.seconds, self.nanos);
    }

    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        let (seconds, nanos) = read_seconds_nanos(ctx)?;
        Duration::new(seconds, nanos).ok_or(WireError::InvalidDuration { seconds, nanos })
    }

    fn encoded_len(&self) -> usize {
        seconds_nanos_len(self.seconds, self.nanos)
    }
}

// ============================================================================
// String map entries
// ============================================================================

/// A string map with keys and values replaced by word indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringMapEntries {
    pub entries: IndexMap<i32, i32>,
}

impl Codec for StringMapEntries {
    fn encode(&self, ctx: &mut EncodeContext) {
        write_map_field(ctx, field::MAP_ENTRIES, &self.entries);
    }

    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        let mut entries = IndexMap::new();
        while let Some((number, wire_type)) = ctx.read_key()? {
            match number {
                field::MAP_ENTRIES => {
                    ctx.check_wire_type(number, WireType::LengthDelimited, wire_type)?;
                    read_map_field(ctx, "string map entries", &mut entries)?;
                }
                _ => ctx.skip(wire_type)?,
            }
        }
        Ok(Self { entries })
    }

    fn encoded_len(&self) -> usize {
        map_field_len(field::MAP_ENTRIES, &self.entries)
    }
}

// ============================================================================
// Compressed record
// ============================================================================

/// One attribute bag on the wire
///
/// Keys of every map are the attribute names' word indices. String values
/// and string-map keys/values are word indices too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressedRecord {
    /// Local dictionary, `words[k - 1]` is index `-k`
    pub words: Vec<String>,
    pub strings: IndexMap<i32, i32>,
    pub int64s: IndexMap<i32, i64>,
    pub doubles: IndexMap<i32, f64>,
    pub bools: IndexMap<i32, bool>,
    pub timestamps: IndexMap<i32, Timestamp>,
    pub durations: IndexMap<i32, Duration>,
    pub bytes: IndexMap<i32, Vec<u8>>,
    pub string_maps: IndexMap<i32, StringMapEntries>,
}

impl CompressedRecord {
    /// Total number of attributes across all kinds
    pub fn attribute_count(&self) -> usize {
        self.strings.len()
            + self.int64s.len()
            + self.doubles.len()
            + self.bools.len()
            + self.timestamps.len()
            + self.durations.len()
            + self.bytes.len()
            + self.string_maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.attribute_count() == 0
    }
}

fn words_len(number: u32, words: &[String]) -> usize {
    words
        .iter()
        .map(|w| key_len(number) + len_delimited_len(w.len()))
        .sum()
}

impl Codec for CompressedRecord {
    fn encode(&self, ctx: &mut EncodeContext) {
        for word in &self.words {
            ctx.write_string_field(field::WORDS, word);
        }
        write_map_field(ctx, field::STRINGS, &self.strings);
        write_map_field(ctx, field::INT64S, &self.int64s);
        write_map_field(ctx, field::DOUBLES, &self.doubles);
        write_map_field(ctx, field::BOOLS, &self.bools);
        write_map_field(ctx, field::TIMESTAMPS, &self.timestamps);
        write_map_field(ctx, field::DURATIONS, &self.durations);
        write_map_field(ctx, field::BYTES, &self.bytes);
        write_map_field(ctx, field::STRING_MAPS, &self.string_maps);
    }

    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        let mut record = CompressedRecord::default();

        while let Some((number, wire_type)) = ctx.read_key()? {
            if (field::WORDS..=field::STRING_MAPS).contains(&number) {
                ctx.check_wire_type(number, WireType::LengthDelimited, wire_type)?;
            }
            match number {
                field::WORDS => record.words.push(ctx.read_string()?),
                field::STRINGS => read_map_field(ctx, "strings", &mut record.strings)?,
                field::INT64S => read_map_field(ctx, "int64s", &mut record.int64s)?,
                field::DOUBLES => read_map_field(ctx, "doubles", &mut record.doubles)?,
                field::BOOLS => read_map_field(ctx, "bools", &mut record.bools)?,
                field::TIMESTAMPS => read_map_field(ctx, "timestamps", &mut record.timestamps)?,
                field::DURATIONS => read_map_field(ctx, "durations", &mut record.durations)?,
                field::BYTES => read_map_field(ctx, "bytes", &mut record.bytes)?,
                field::STRING_MAPS => {
                    read_map_field(ctx, "string_maps", &mut record.string_maps)?
                }
                _ => ctx.skip(wire_type)?,
            }
        }
        check_unique_words(&record.words)?;
        Ok(record)
    }

    fn encoded_len(&self) -> usize {
        words_len(field::WORDS, &self.words)
            + map_field_len(field::STRINGS, &self.strings)
            + map_field_len(field::INT64S, &self.int64s)
            + map_field_len(field::DOUBLES, &self.doubles)
            + map_field_len(field::BOOLS, &self.bools)
            + map_field_len(field::TIMESTAMPS, &self.timestamps)
            + map_field_len(field::DURATIONS, &self.durations)
            + map_field_len(field::BYTES, &self.bytes)
            + map_field_len(field::STRING_MAPS, &self.string_maps)
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Several records sharing one default local dictionary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub records: Vec<CompressedRecord>,
    /// Local words for every record whose own `words` is empty
    pub default_words: Vec<String>,
    /// Size of the global dictionary the sender encoded against
    pub global_word_count: u32,
}

impl Codec for Batch {
    fn encode(&self, ctx: &mut EncodeContext) {
        for record in &self.records {
            ctx.write_message_field(field::BATCH_RECORDS, record);
        }
        for word in &self.default_words {
            ctx.write_string_field(field::BATCH_DEFAULT_WORDS, word);
        }
        if self.global_word_count != 0 {
            ctx.write_key(field::BATCH_GLOBAL_WORD_COUNT, WireType::Varint);
            ctx.write_varint(u64::from(self.global_word_count));
        }
    }

    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self> {
        let mut batch = Batch::default();

        while let Some((number, wire_type)) = ctx.read_key()? {
            match number {
                field::BATCH_RECORDS => {
                    ctx.check_wire_type(number, WireType::LengthDelimited, wire_type)?;
                    let mut nested = ctx.read_message()?;
                    batch.records.push(CompressedRecord::decode(&mut nested)?);
                }
                field::BATCH_DEFAULT_WORDS => {
                    ctx.check_wire_type(number, WireType::LengthDelimited, wire_type)?;
                    batch.default_words.push(ctx.read_string()?);
                }
                field::BATCH_GLOBAL_WORD_COUNT => {
                    ctx.check_wire_type(number, WireType::Varint, wire_type)?;
                    batch.global_word_count = ctx.read_varint()? as u32;
                }
                _ => ctx.skip(wire_type)?,
            }
        }
        check_unique_words(&batch.default_words)?;
        Ok(batch)
    }

    fn encoded_len(&self) -> usize {
        let records: usize = self
            .records
            .iter()
            .map(|r| key_len(field::BATCH_RECORDS) + len_delimited_len(r.encoded_len()))
            .sum();
        let count = if self.global_word_count != 0 {
            key_len(field::BATCH_GLOBAL_WORD_COUNT) + varint_len(u64::from(self.global_word_count))
        } else {
            0
        };
        records + words_len(field::BATCH_DEFAULT_WORDS, &self.default_words) + count
    }
}

// ============================================================================
// Tests
// ============================================================================
