//! Query Parser: raw query parameters in, [`FactRequestArgs`] out.
//!
//! Parsing never fails. Numeric fields that are missing, unparseable, or not
//! positive take the configured default; sort fields that are not exactly
//! `asc` or `desc` become "no sort".

use crate::config::parse_leading_int;
use crate::http::QueryParams;

use super::model::{FactRequestArgs, SortOrder};

/// Defaults substituted for missing or invalid numeric parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    pub per_page: u64,
    pub page: u64,
    pub max_length: u64,
}

/// Parses `/api/facts` query parameters.
///
/// | Key              | Field              | Notes                                  |
/// |------------------|--------------------|----------------------------------------|
/// | `perPage`        | `limit`            | `limit` is read when `perPage` is absent |
/// | `page`           | `page`             |                                        |
/// | `maxLength`      | `max_length`       |                                        |
/// | `sortByLength`   | `sort_by_length`   | `asc` / `desc`, given once             |
/// | `sortByAlphabet` | `sort_by_alphabet` | `asc` / `desc`, given once             |
///
/// # Examples
///
/// ```
/// use catfacts::facts::{QueryDefaults, SortOrder, parse_query};
/// use catfacts::http::QueryParams;
///
/// let defaults = QueryDefaults { per_page: 10, page: 1, max_length: 140 };
/// let args = parse_query(&QueryParams::parse("perPage=0&page=3&sortByLength=desc"), &defaults);
///
/// assert_eq!(args.limit, 10);
/// assert_eq!(args.page, 3);
/// assert_eq!(args.sort_by_length, Some(SortOrder::Desc));
/// assert_eq!(args.sort_by_alphabet, None);
/// ```
pub fn parse_query(query: &QueryParams, defaults: &QueryDefaults) -> FactRequestArgs {
    let per_page = query.first("perPage").or_else(|| query.first("limit"));

    FactRequestArgs {
        limit: positive_or(per_page, defaults.per_page),
        page: positive_or(query.first("page"), defaults.page),
        max_length: positive_or(query.first("maxLength"), defaults.max_length),
        sort_by_length: sort_order(query, "sortByLength"),
        sort_by_alphabet: sort_order(query, "sortByAlphabet"),
    }
}

// No upper bound: any positive value goes upstream as given.
fn positive_or(raw: Option<&str>, fallback: u64) -> u64 {
    raw.and_then(parse_leading_int)
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(fallback)
}

// A repeated key is a list, never a recognized token.
fn sort_order(query: &QueryParams, key: &str) -> Option<SortOrder> {
    let mut values = query.get_all(key);
    match (values.next(), values.next()) {
        (Some(token), None) => SortOrder::from_token(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: QueryDefaults = QueryDefaults {
        per_page: 10,
        page: 1,
        max_length: 140,
    };

    fn parse(raw: &str) -> FactRequestArgs {
        parse_query(&QueryParams::parse(raw), &DEFAULTS)
    }

    fn defaults_only() -> FactRequestArgs {
        FactRequestArgs {
            limit: 10,
            page: 1,
            max_length: 140,
            sort_by_length: None,
            sort_by_alphabet: None,
        }
    }

    #[test]
    fn empty_query_yields_defaults() {
        assert_eq!(parse(""), defaults_only());
    }

    #[test]
    fn valid_numbers_are_used() {
        let args = parse("perPage=5&page=2&maxLength=60");
        assert_eq!((args.limit, args.page, args.max_length), (5, 2, 60));
    }

    #[test]
    fn limit_is_an_alias_for_per_page() {
        assert_eq!(parse("limit=7").limit, 7);
        assert_eq!(parse("perPage=3&limit=7").limit, 3);
    }

    #[test]
    fn non_positive_or_non_numeric_numbers_fall_back() {
        for raw in [
            "perPage=0&page=0&maxLength=0",
            "perPage=-3&page=-1&maxLength=-140",
            "perPage=abc&page=&maxLength=x12",
            "perPage=-99999999999&page=-4294967296&maxLength=-99999999999999999999",
        ] {
            let args = parse(raw);
            assert_eq!(args.limit, 10, "{raw}");
            assert_eq!(args.page, 1, "{raw}");
            assert_eq!(args.max_length, 140, "{raw}");
        }
    }

    #[test]
    fn large_positive_numbers_pass_through() {
        let args = parse("perPage=5000000000&page=5000000000&maxLength=99999999999999999999");
        assert_eq!(args.limit, 5_000_000_000);
        assert_eq!(args.page, 5_000_000_000);
        assert_eq!(args.max_length, i64::MAX as u64);
    }

    #[test]
    fn leading_digits_are_honored() {
        let args = parse("perPage=15items&page=2.5");
        assert_eq!(args.limit, 15);
        assert_eq!(args.page, 2);
    }

    #[test]
    fn repeated_numeric_key_uses_first_value() {
        assert_eq!(parse("page=4&page=9").page, 4);
    }

    #[test]
    fn recognized_sort_tokens() {
        let args = parse("sortByLength=asc&sortByAlphabet=desc");
        assert_eq!(args.sort_by_length, Some(SortOrder::Asc));
        assert_eq!(args.sort_by_alphabet, Some(SortOrder::Desc));
    }

    #[test]
    fn malformed_sort_tokens_become_none() {
        for token in ["ascending", "descend", "ASC", "Desc", "", " asc"] {
            let raw = format!("sortByLength={token}&sortByAlphabet={token}");
            let args = parse(&raw);
            assert_eq!(args.sort_by_length, None, "{token:?}");
            assert_eq!(args.sort_by_alphabet, None, "{token:?}");
        }
    }

    #[test]
    fn repeated_sort_key_is_ignored() {
        assert_eq!(parse("sortByLength=asc&sortByLength=asc").sort_by_length, None);
    }

    #[test]
    fn both_sorts_are_kept_by_the_parser() {
        let args = parse("sortByLength=desc&sortByAlphabet=asc");
        assert!(args.sort_by_length.is_some());
        assert!(args.sort_by_alphabet.is_some());
    }
}
