//! Fact Post-processor: ordering and page-relative ids.

use std::cmp::Ordering;

use super::model::{Fact, FactRequestArgs, SortOrder};

/// What a sort compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Numeric `length`.
    Length,
    /// `fact` text, compared by UTF-16 code units.
    Alphabet,
}

fn compare(a: &Fact, b: &Fact, key: SortKey) -> Ordering {
    match key {
        SortKey::Length => a.length.cmp(&b.length),
        SortKey::Alphabet => a.fact.encode_utf16().cmp(b.fact.encode_utf16()),
    }
}

/// Sorts `facts` in place by `key`.
///
/// The sort is stable in both directions: facts with equal keys keep their
/// relative order.
pub fn sort_facts(facts: &mut [Fact], key: SortKey, order: SortOrder) {
    match order {
        SortOrder::Asc => facts.sort_by(|a, b| compare(a, b, key)),
        SortOrder::Desc => facts.sort_by(|a, b| compare(b, a, key)),
    }
}

/// Applies the sort requested by `args`, if any.
///
/// Length wins over alphabet; with neither, upstream order is kept.
pub fn apply_sort(facts: &mut [Fact], args: &FactRequestArgs) {
    if let Some((key, order)) = args.sort_mode() {
        sort_facts(facts, key, order);
    }
}

/// Numbers facts `1..=n` within the page, offset by `(page - 1) * limit`.
///
/// ```
/// use catfacts::facts::{Fact, assign_ids};
///
/// let mut facts = vec![Fact::new("a", 1), Fact::new("b", 1)];
/// assign_ids(&mut facts, 3, 5);
/// assert_eq!(facts[0].id, Some(11));
/// assert_eq!(facts[1].id, Some(12));
/// ```
///
/// Ids saturate at `u64::MAX` for absurdly large pages.
pub fn assign_ids(facts: &mut [Fact], page: u64, limit: u64) {
    let offset = page.saturating_sub(1).saturating_mul(limit);
    for (position, fact) in (1u64..).zip(facts.iter_mut()) {
        fact.id = Some(offset.saturating_add(position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(items: &[(&str, u64)]) -> Vec<Fact> {
        items.iter().map(|(text, len)| Fact::new(*text, *len)).collect()
    }

    fn lengths(facts: &[Fact]) -> Vec<u64> {
        facts.iter().map(|f| f.length).collect()
    }

    fn texts(facts: &[Fact]) -> Vec<&str> {
        facts.iter().map(|f| f.fact.as_str()).collect()
    }

    fn ids(facts: &[Fact]) -> Vec<Option<u64>> {
        facts.iter().map(|f| f.id).collect()
    }

    #[test]
    fn length_ascending_and_descending() {
        let mut v = facts(&[("a", 5), ("b", 3), ("c", 4)]);
        sort_facts(&mut v, SortKey::Length, SortOrder::Asc);
        assert_eq!(lengths(&v), [3, 4, 5]);
        sort_facts(&mut v, SortKey::Length, SortOrder::Desc);
        assert_eq!(lengths(&v), [5, 4, 3]);
    }

    #[test]
    fn equal_lengths_keep_relative_order() {
        let mut v = facts(&[("first", 4), ("short", 1), ("second", 4), ("third", 4)]);
        sort_facts(&mut v, SortKey::Length, SortOrder::Asc);
        assert_eq!(texts(&v), ["short", "first", "second", "third"]);

        let mut v = facts(&[("first", 4), ("short", 1), ("second", 4), ("third", 4)]);
        sort_facts(&mut v, SortKey::Length, SortOrder::Desc);
        assert_eq!(texts(&v), ["first", "second", "third", "short"]);
    }

    #[test]
    fn alphabet_sorted_input_is_a_noop_ascending() {
        let mut v = facts(&[("Fact A", 5), ("Fact B", 3), ("Fact C", 4)]);
        sort_facts(&mut v, SortKey::Alphabet, SortOrder::Asc);
        assert_eq!(texts(&v), ["Fact A", "Fact B", "Fact C"]);
        sort_facts(&mut v, SortKey::Alphabet, SortOrder::Desc);
        assert_eq!(texts(&v), ["Fact C", "Fact B", "Fact A"]);
    }

    #[test]
    fn alphabet_compares_case_sensitively() {
        let mut v = facts(&[("b", 1), ("B", 1), ("a", 1)]);
        sort_facts(&mut v, SortKey::Alphabet, SortOrder::Asc);
        assert_eq!(texts(&v), ["B", "a", "b"]);
    }

    #[test]
    fn alphabet_orders_astral_characters_by_utf16_units() {
        // U+1F431 encodes as a surrogate pair starting at 0xD83D, below U+FFFD.
        let mut v = facts(&[("\u{FFFD} replacement", 1), ("\u{1F431} cat", 1), ("zebra", 1)]);
        sort_facts(&mut v, SortKey::Alphabet, SortOrder::Asc);
        assert_eq!(texts(&v), ["zebra", "\u{1F431} cat", "\u{FFFD} replacement"]);
    }

    fn args(length: Option<SortOrder>, alphabet: Option<SortOrder>) -> FactRequestArgs {
        FactRequestArgs {
            limit: 10,
            page: 1,
            max_length: 140,
            sort_by_length: length,
            sort_by_alphabet: alphabet,
        }
    }

    #[test]
    fn apply_sort_prefers_length() {
        let mut v = facts(&[("Fact A", 5), ("Fact B", 3), ("Fact C", 4)]);
        apply_sort(&mut v, &args(Some(SortOrder::Asc), Some(SortOrder::Desc)));
        assert_eq!(texts(&v), ["Fact B", "Fact C", "Fact A"]);
    }

    #[test]
    fn apply_sort_without_request_keeps_order() {
        let mut v = facts(&[("z", 9), ("a", 1), ("m", 5)]);
        apply_sort(&mut v, &args(None, None));
        assert_eq!(texts(&v), ["z", "a", "m"]);
    }

    #[test]
    fn ids_on_first_page() {
        let mut v = facts(&[("a", 1), ("b", 1), ("c", 1)]);
        assign_ids(&mut v, 1, 10);
        assert_eq!(ids(&v), [Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn ids_are_offset_by_page() {
        let mut v = facts(&[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)]);
        assign_ids(&mut v, 2, 5);
        assert_eq!(ids(&v), [Some(6), Some(7), Some(8), Some(9), Some(10)]);
    }

    #[test]
    fn ids_follow_sorted_order() {
        let mut v = facts(&[("Fact A", 5), ("Fact B", 3), ("Fact C", 4)]);
        apply_sort(&mut v, &args(Some(SortOrder::Desc), None));
        assign_ids(&mut v, 1, 10);
        assert_eq!(texts(&v), ["Fact A", "Fact C", "Fact B"]);
        assert_eq!(ids(&v), [Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn ids_past_u32_range() {
        let mut v = facts(&[("a", 1), ("b", 1)]);
        assign_ids(&mut v, 2, 5_000_000_000);
        assert_eq!(ids(&v), [Some(5_000_000_001), Some(5_000_000_002)]);

        assign_ids(&mut v, u64::MAX, u64::MAX);
        assert_eq!(ids(&v), [Some(u64::MAX), Some(u64::MAX)]);
    }

    #[test]
    fn upstream_ids_are_overwritten() {
        let mut v = facts(&[("a", 1)]);
        v[0].id = Some(999);
        assign_ids(&mut v, 1, 10);
        assert_eq!(v[0].id, Some(1));
    }
}
