//! Overlay merge of attribute bags
//!
//! Bags are applied in order; for each name the value from the last bag that
//! defines it wins, whatever its kind. The result is a new bag and the
//! inputs are never touched.

use super::store::AttributeBag;
use super::value::Value;

/// Knobs for [`merge_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Union string maps key by key instead of replacing them whole
    ///
    /// Only applies when both the earlier and the later value are string
    /// maps; keys from the later map win.
    pub union_string_maps: bool,
}

/// Last-writer-wins merge of an ordered sequence of bags
pub fn merge<'a, I>(bags: I) -> AttributeBag
where
    I: IntoIterator<Item = &'a AttributeBag>,
{
    merge_with(bags, MergeOptions::default())
}

/// Merge with explicit options
pub fn merge_with<'a, I>(bags: I, options: MergeOptions) -> AttributeBag
where
    I: IntoIterator<Item = &'a AttributeBag>,
{
    let mut merged = AttributeBag::new();
    for bag in bags {
        overlay(&mut merged, bag, options);
    }
    merged
}

/// Apply `top` onto `base` in place
fn overlay(base: &mut AttributeBag, top: &AttributeBag, options: MergeOptions) {
    for (name, value) in top.iter() {
        let union = match (base.get(name), value) {
            (Some(Value::StringMap(existing)), Value::StringMap(newer))
                if options.union_string_maps =>
            {
                let mut union = existing.clone();
                union.union_with(newer);
                Some(union)
            }
            _ => None,
        };
        match union {
            Some(union) => base.replace(name, Value::StringMap(union)),
            None => base.replace(name, value.clone()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::StringMap;

    fn bag(entries: &[(&str, Value)]) -> AttributeBag {
        let mut b = AttributeBag::new();
        for (name, value) in entries {
            b.set(*name, value.clone()).unwrap();
        }
        b
    }

    #[test]
    fn test_last_writer_wins() {
        let b1 = bag(&[("request.size", Value::Int64(10)), ("source.name", "a".into())]);
        let b2 = bag(&[("request.size", Value::Int64(20))]);

        let merged = merge([&b1, &b2]);
        assert_eq!(merged.get_int64("request.size"), Some(20));
        assert_eq!(merged.get_str("source.name"), Some("a"));
    }

    #[test]
    fn test_single_bag_is_identity() {
        let b1 = bag(&[("x", Value::Bool(true)), ("y", Value::Double(1.5))]);
        assert_eq!(merge([&b1]), b1);
    }

    #[test]
    fn test_empty_sequence() {
        let none: Vec<AttributeBag> = Vec::new();
        assert!(merge(&none).is_empty());
    }

    #[test]
    fn test_kind_change_across_bags() {
        let b1 = bag(&[("response.code", Value::Int64(200))]);
        let b2 = bag(&[("response.code", "OK".into())]);

        let merged = merge([&b1, &b2]);
        assert_eq!(merged.get_str("response.code"), Some("OK"));
    }

    #[test]
    fn test_inputs_untouched() {
        let b1 = bag(&[("a", Value::Int64(1))]);
        let b2 = bag(&[("a", Value::Int64(2))]);
        let before = (b1.clone(), b2.clone());

        let mut merged = merge([&b1, &b2]);
        merged.set_int64("a", 3).unwrap();

        assert_eq!((b1, b2), before);
    }

    #[test]
    fn test_first_appearance_order() {
        let b1 = bag(&[("a", Value::Int64(1)), ("b", Value::Int64(1))]);
        let b2 = bag(&[("c", Value::Int64(2)), ("a", Value::Int64(2))]);

        let merged = merge([&b1, &b2]);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_string_map_union_on_request() {
        let h1 = StringMap::new().with("a", "1").with("b", "2");
        let h2 = StringMap::new().with("b", "20").with("c", "30");
        let b1 = bag(&[("request.headers", h1.into())]);
        let b2 = bag(&[("request.headers", h2.clone().into())]);

        let replaced = merge([&b1, &b2]);
        assert_eq!(replaced.get_string_map("request.headers"), Some(&h2));

        let unioned = merge_with([&b1, &b2], MergeOptions { union_string_maps: true });
        let headers = unioned.get_string_map("request.headers").unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get("b"), Some("20"));
    }

    #[test]
    fn test_union_does_not_cross_kinds() {
        let b1 = bag(&[("h", Value::Int64(1))]);
        let b2 = bag(&[("h", StringMap::new().with("k", "v").into())]);

        let merged = merge_with([&b1, &b2], MergeOptions { union_string_maps: true });
        assert_eq!(merged.get_string_map("h").map(StringMap::len), Some(1));
    }
}
