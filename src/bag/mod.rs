//! Attribute Bags - Typed Name/Value Sets
//!
//! A bag is what producers fill in and consumers read back after decoding:
//!
//! 1. **Values** - a sum type over eight kinds
//! 2. **Store** - one value per name, kinds never silently change
//! 3. **Merge** - last-writer-wins overlay across several bags

mod merge;
mod store;
mod string_map;
mod time;
mod value;

pub use merge::{merge, merge_with, MergeOptions};
pub use store::{AttributeBag, BagError};
pub use string_map::StringMap;
pub use time::{Duration, Timestamp, NANOS_PER_SECOND};
pub use value::{Value, ValueKind};
