//! Data types shared by the parser, the upstream client, and the handler.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::sort::SortKey;

/// Direction of a sort. Serialized as the query tokens `asc` / `desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Recognizes exactly `asc` or `desc`; matching is case-sensitive.
    ///
    /// ```
    /// use catfacts::facts::SortOrder;
    ///
    /// assert_eq!(SortOrder::from_token("desc"), Some(SortOrder::Desc));
    /// assert_eq!(SortOrder::from_token("DESC"), None);
    /// assert_eq!(SortOrder::from_token("ascending"), None);
    /// ```
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn is_ascending(self) -> bool {
        self == Self::Asc
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, defaulted arguments for one `/api/facts` request.
///
/// Both sort fields are kept as parsed; [`sort_mode`](Self::sort_mode)
/// resolves which one is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactRequestArgs {
    pub limit: u64,
    pub page: u64,
    pub max_length: u64,
    pub sort_by_length: Option<SortOrder>,
    pub sort_by_alphabet: Option<SortOrder>,
}

impl FactRequestArgs {
    /// The subset of arguments forwarded upstream.
    pub fn fetch_args(&self) -> FetchArgs {
        FetchArgs {
            limit: self.limit,
            page: self.page,
            max_length: self.max_length,
        }
    }

    /// The sort to apply: length wins over alphabet, `None` keeps upstream order.
    pub fn sort_mode(&self) -> Option<(SortKey, SortOrder)> {
        match (self.sort_by_length, self.sort_by_alphabet) {
            (Some(order), _) => Some((SortKey::Length, order)),
            (None, Some(order)) => Some((SortKey::Alphabet, order)),
            (None, None) => None,
        }
    }
}

/// Pagination arguments sent to the upstream facts API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchArgs {
    pub limit: u64,
    pub page: u64,
    pub max_length: u64,
}

impl FetchArgs {
    /// Cache key `"<page>-<limit>-<max_length>"`.
    ///
    /// ```
    /// use catfacts::facts::FetchArgs;
    ///
    /// let args = FetchArgs { limit: 10, page: 2, max_length: 140 };
    /// assert_eq!(args.cache_key(), "2-10-140");
    /// ```
    pub fn cache_key(&self) -> String {
        format!("{}-{}-{}", self.page, self.limit, self.max_length)
    }
}

// Upstream numbers may arrive as integers, integral floats or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Deserializes a non-negative integer written as `5`, `5.0` or `"5"`.
pub(crate) fn numeric<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Numeric::deserialize(deserializer)? {
        Numeric::Int(n) => Ok(n),
        Numeric::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        Numeric::Float(f) => Err(de::Error::custom(format!("not a whole number: {f}"))),
        Numeric::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("not a whole number: {s:?}"))),
    }
}

/// A single fact.
///
/// `id` is assigned after sorting and overwrites anything upstream sent.
/// Fields other than `fact`, `length`, and `id` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub fact: String,
    #[serde(deserialize_with = "numeric")]
    pub length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Fact {
    pub fn new(fact: impl Into<String>, length: u64) -> Self {
        Self {
            fact: fact.into(),
            length,
            id: None,
            extra: Map::new(),
        }
    }
}

/// One page of facts as returned to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactPage {
    pub current_page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub facts: Vec<Fact>,
}
