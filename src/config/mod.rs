//! Environment-sourced configuration.
//!
//! [`Env`] reads typed values with fallbacks and remembers which keys were
//! consulted. [`Env::with_dotenv`] layers a `.env` file underneath the
//! process environment. [`AppConfig::from_env`] turns those values into the settings the
//! server, the upstream client, and the query parser need.
//!
//! | Variable                   | Default                       |
//! |----------------------------|-------------------------------|
//! | `CAT_FACT_API_BASE_URL`    | `https://catfact.ninja/facts` |
//! | `DEFAULT_FACTS_PER_PAGE`   | `10`                          |
//! | `DEFAULT_FACTS_MAX_LENGTH` | `140`                         |
//! | `DEFAULT_FACTS_PAGE`       | `1`                           |
//! | `USE_CACHE`                | `true`                        |
//! | `UPSTREAM_TIMEOUT_SECS`    | `10`                          |
//! | `BIND_ADDR`                | `127.0.0.1:3000`              |

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::facts::QueryDefaults;

pub const DEFAULT_BASE_URL: &str = "https://catfact.ninja/facts";
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const DEFAULT_MAX_LENGTH: u64 = 140;
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_USE_CACHE: bool = true;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Errors raised while building [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid upstream base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream base URL must use http or https, got {scheme:?}")]
    UnsupportedScheme { scheme: String },

    #[error("failed to read dotenv file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Parses a base-10 integer from the start of `raw`.
///
/// Leading whitespace and one `+`/`-` sign are accepted, parsing stops at the
/// first non-digit, so `"12abc"` yields `12` and `"abc"` yields `None`.
/// Magnitudes beyond `i64` saturate.
pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest.as_bytes()[..digits]
        .iter()
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    Some(if negative { -magnitude } else { magnitude })
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Typed reader over a key/value environment.
///
/// # Examples
///
/// ```
/// use catfacts::config::Env;
///
/// let mut env = Env::from_lookup(|key| match key {
///     "PORT" => Some("8080".to_owned()),
///     "DEBUG" => Some("TRUE".to_owned()),
///     _ => None,
/// });
///
/// assert_eq!(env.get_int("PORT", 80), 8080);
/// assert!(env.get_bool("DEBUG", false));
/// assert_eq!(env.get_string("NAME", "svc"), "svc");
/// assert_eq!(env.keys(), ["PORT", "DEBUG", "NAME"]);
/// ```
pub struct Env {
    lookup: Lookup,
    keys: Vec<String>,
}

impl Env {
    /// Reads from the process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
            keys: Vec::new(),
        }
    }

    /// Falls back to the `KEY=value` pairs of the dotenv file at `path` for
    /// keys the current lookup does not set. A missing file changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dotenv`] when the file exists but cannot be
    /// read or parsed.
    pub fn with_dotenv(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file: HashMap<String, String> = match dotenvy::from_path_iter(path.as_ref()) {
            Ok(pairs) => pairs.collect::<Result<_, _>>()?,
            Err(e) if e.not_found() => return Ok(self),
            Err(e) => return Err(e.into()),
        };
        let primary = self.lookup;
        Ok(Self {
            lookup: Box::new(move |key| primary(key).or_else(|| file.get(key).cloned())),
            keys: self.keys,
        })
    }

    /// Keys consulted so far, in read order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    // Missing and empty values both count as unset.
    fn raw(&mut self, key: &str) -> Option<String> {
        self.keys.push(key.to_owned());
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    pub fn get_string(&mut self, key: &str, fallback: &str) -> String {
        self.raw(key).unwrap_or_else(|| fallback.to_owned())
    }

    pub fn get_int(&mut self, key: &str, fallback: i64) -> i64 {
        self.raw(key)
            .and_then(|value| parse_leading_int(&value))
            .unwrap_or(fallback)
    }

    /// `true`/`1` and `false`/`0`, case-insensitive; anything else is the fallback.
    pub fn get_bool(&mut self, key: &str, fallback: bool) -> bool {
        match self.raw(key).map(|value| value.to_ascii_lowercase()).as_deref() {
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            _ => fallback,
        }
    }

    // Positive integer or the fallback, warning when a configured value is rejected.
    fn get_positive(&mut self, key: &str, fallback: u64) -> u64 {
        let value = self.get_int(key, i64::try_from(fallback).unwrap_or(i64::MAX));
        match u64::try_from(value) {
            Ok(v) if v > 0 => v,
            _ => {
                warn!(key, value, fallback, "configured value must be a positive integer");
                fallback
            }
        }
    }
}

/// Settings for the upstream facts API and the query defaults derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Url,
    pub default_per_page: u64,
    pub default_max_length: u64,
    pub default_page: u64,
    pub use_cache: bool,
    pub timeout: Duration,
}

impl ApiConfig {
    /// The values the query parser substitutes for missing or invalid input.
    pub fn query_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            per_page: self.default_per_page,
            page: self.default_page,
            max_length: self.default_max_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,
}

impl AppConfig {
    /// Builds the configuration from `env`, applying defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the upstream base URL is not an absolute
    /// `http`/`https` URL.
    pub fn from_env(env: &mut Env) -> Result<Self, ConfigError> {
        let raw_url = env.get_string("CAT_FACT_API_BASE_URL", DEFAULT_BASE_URL);
        let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: raw_url.clone(),
            source,
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                scheme: base_url.scheme().to_owned(),
            });
        }

        let api = ApiConfig {
            base_url,
            default_per_page: env.get_positive("DEFAULT_FACTS_PER_PAGE", DEFAULT_PER_PAGE),
            default_max_length: env.get_positive("DEFAULT_FACTS_MAX_LENGTH", DEFAULT_MAX_LENGTH),
            default_page: env.get_positive("DEFAULT_FACTS_PAGE", DEFAULT_PAGE),
            use_cache: env.get_bool("USE_CACHE", DEFAULT_USE_CACHE),
            timeout: Duration::from_secs(
                env.get_positive("UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            ),
        };

        let server = ServerConfig {
            bind_addr: env.get_string("BIND_ADDR", DEFAULT_BIND_ADDR),
        };

        Ok(Self { server, api })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn env(pairs: &[(&str, &str)]) -> Env {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Env::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("  7"), Some(7));
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("3.9"), Some(3));
        assert_eq!(parse_leading_int("-5"), Some(-5));
        assert_eq!(parse_leading_int("+8"), Some(8));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_leading_int("-99999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn get_string_treats_empty_as_unset() {
        let mut e = env(&[("A", ""), ("B", "value")]);
        assert_eq!(e.get_string("A", "fallback"), "fallback");
        assert_eq!(e.get_string("B", "fallback"), "value");
        assert_eq!(e.get_string("C", "fallback"), "fallback");
    }

    #[test]
    fn get_int_falls_back_on_garbage() {
        let mut e = env(&[("N", "not-a-number"), ("M", "15")]);
        assert_eq!(e.get_int("N", 3), 3);
        assert_eq!(e.get_int("M", 3), 15);
    }

    #[test]
    fn get_bool_accepts_words_and_digits() {
        let mut e = env(&[("T", "True"), ("O", "1"), ("F", "FALSE"), ("Z", "0"), ("X", "yes")]);
        assert!(e.get_bool("T", false));
        assert!(e.get_bool("O", false));
        assert!(!e.get_bool("F", true));
        assert!(!e.get_bool("Z", true));
        assert!(e.get_bool("X", true));
        assert!(!e.get_bool("X", false));
    }

    #[test]
    fn keys_are_recorded_in_read_order() {
        let mut e = env(&[]);
        e.get_string("FIRST", "");
        e.get_bool("SECOND", true);
        assert_eq!(e.keys(), ["FIRST", "SECOND"]);
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_env(&mut env(&[])).unwrap();
        assert_eq!(config.api.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.api.default_per_page, 10);
        assert_eq!(config.api.default_max_length, 140);
        assert_eq!(config.api.default_page, 1);
        assert!(config.api.use_cache);
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.server.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn overrides_are_applied() {
        let mut e = env(&[
            ("CAT_FACT_API_BASE_URL", "http://localhost:9000/facts"),
            ("DEFAULT_FACTS_PER_PAGE", "25"),
            ("DEFAULT_FACTS_MAX_LENGTH", "80"),
            ("DEFAULT_FACTS_PAGE", "3"),
            ("USE_CACHE", "false"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]);
        let config = AppConfig::from_env(&mut e).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:9000/facts");
        assert_eq!(
            config.api.query_defaults(),
            QueryDefaults {
                per_page: 25,
                page: 3,
                max_length: 80
            }
        );
        assert!(!config.api.use_cache);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn non_positive_defaults_are_rejected() {
        let mut e = env(&[("DEFAULT_FACTS_PER_PAGE", "0"), ("DEFAULT_FACTS_PAGE", "-4")]);
        let config = AppConfig::from_env(&mut e).unwrap();
        assert_eq!(config.api.default_per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.api.default_page, DEFAULT_PAGE);
    }

    fn dotenv_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("catfacts-{}-{name}.env", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn dotenv_fills_keys_the_environment_leaves_unset() {
        let path = dotenv_file(
            "fills",
            "DEFAULT_FACTS_PER_PAGE=25\nUSE_CACHE=false\nBIND_ADDR=0.0.0.0:9000\n",
        );
        let mut e = env(&[("BIND_ADDR", "127.0.0.1:4000")]).with_dotenv(&path).unwrap();
        let config = AppConfig::from_env(&mut e).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.api.default_per_page, 25);
        assert!(!config.api.use_cache);
        assert_eq!(config.server.bind_addr, "127.0.0.1:4000");
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        let path = std::env::temp_dir().join("catfacts-definitely-missing.env");
        let mut e = env(&[("DEFAULT_FACTS_PAGE", "4")]).with_dotenv(path).unwrap();
        assert_eq!(AppConfig::from_env(&mut e).unwrap().api.default_page, 4);
    }

    #[test]
    fn malformed_dotenv_file_is_an_error() {
        let path = dotenv_file("malformed", "NOT A VALID LINE\n");
        let result = env(&[]).with_dotenv(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn bad_base_url_is_an_error() {
        let err = AppConfig::from_env(&mut env(&[("CAT_FACT_API_BASE_URL", "not a url")]));
        assert!(matches!(err, Err(ConfigError::InvalidBaseUrl { .. })));

        let err = AppConfig::from_env(&mut env(&[("CAT_FACT_API_BASE_URL", "ftp://x/facts")]));
        assert!(matches!(err, Err(ConfigError::UnsupportedScheme { .. })));
    }
}
