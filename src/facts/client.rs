//! Upstream Client: fetches fact pages and optionally caches them.
//!
//! [`FactSource`] is the seam to the outside world; [`HttpFactSource`] is the
//! real implementation backed by `reqwest`. [`FactClient`] owns the cache and
//! decides whether a request is served from it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::cache::MemoryCache;
use crate::config::ApiConfig;

use super::model::{Fact, FactPage, FetchArgs, numeric};

const USER_AGENT: &str = concat!("catfacts/", env!("CARGO_PKG_VERSION"));

/// Reasons an upstream fetch can fail.
///
/// Callers only ever learn *that* a fetch failed; the detail is logged here.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status}")]
    Status { status: u16 },

    #[error("malformed upstream envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Outcome of one upstream fetch.
pub type UpstreamResult = Result<FactPage, UpstreamError>;

/// Anything that can produce a page of facts for the given pagination.
#[async_trait]
pub trait FactSource: Send + Sync {
    async fn fetch(&self, args: &FetchArgs) -> UpstreamResult;
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(deserialize_with = "numeric")]
    current_page: u64,
    #[serde(deserialize_with = "numeric")]
    per_page: u64,
    #[serde(deserialize_with = "numeric")]
    last_page: u64,
    data: Vec<Fact>,
}

/// Converts the upstream JSON envelope into a [`FactPage`].
///
/// ```
/// use catfacts::facts::client::transform_envelope;
///
/// let body = br#"{"current_page":1,"per_page":"10","last_page":34,
///                 "data":[{"fact":"Cats purr.","length":10}]}"#;
/// let page = transform_envelope(body).unwrap();
/// assert_eq!((page.current_page, page.per_page, page.total_pages), (1, 10, 34));
/// assert_eq!(page.facts[0].fact, "Cats purr.");
/// ```
pub fn transform_envelope(body: &[u8]) -> Result<FactPage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    Ok(FactPage {
        current_page: envelope.current_page,
        per_page: envelope.per_page,
        total_pages: envelope.last_page,
        facts: envelope.data,
    })
}

/// [`FactSource`] backed by the paginated REST API at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpFactSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFactSource {
    /// Builds a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialized.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.base_url.clone(), config.timeout)
    }
}

#[async_trait]
impl FactSource for HttpFactSource {
    async fn fetch(&self, args: &FetchArgs) -> UpstreamResult {
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("limit", args.limit),
                ("page", args.page),
                ("max_length", args.max_length),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(transform_envelope(&body)?)
    }
}

/// Upstream client with an optional, exclusively owned page cache.
///
/// With a cache, a hit is returned without touching the source and only
/// successful fetches are stored. Without one, every call goes upstream.
pub struct FactClient {
    source: Arc<dyn FactSource>,
    cache: Option<MemoryCache<FactPage>>,
}

impl FactClient {
    /// A client that always goes upstream.
    pub fn new(source: Arc<dyn FactSource>) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    /// A client that serves repeated requests from `cache`.
    pub fn with_cache(source: Arc<dyn FactSource>, cache: MemoryCache<FactPage>) -> Self {
        Self {
            source,
            cache: Some(cache),
        }
    }

    /// Caching follows `config.use_cache`.
    pub fn from_config(source: Arc<dyn FactSource>, config: &ApiConfig) -> Self {
        if config.use_cache {
            Self::with_cache(source, MemoryCache::new())
        } else {
            Self::new(source)
        }
    }

    pub fn cache(&self) -> Option<&MemoryCache<FactPage>> {
        self.cache.as_ref()
    }

    /// Fetches a page, through the cache when one is configured.
    pub async fn fetch(&self, args: &FetchArgs) -> UpstreamResult {
        match &self.cache {
            Some(cache) => self.fetch_cached(cache, args).await,
            None => self.fetch_uncached(args).await,
        }
    }

    /// Fetches a page straight from the source.
    pub async fn fetch_uncached(&self, args: &FetchArgs) -> UpstreamResult {
        let result = self.source.fetch(args).await;
        if let Err(e) = &result {
            warn!(
                error = %e,
                page = args.page,
                limit = args.limit,
                max_length = args.max_length,
                "upstream fetch failed"
            );
        }
        result
    }

    async fn fetch_cached(&self, cache: &MemoryCache<FactPage>, args: &FetchArgs) -> UpstreamResult {
        let key = args.cache_key();
        if let Some(page) = cache.get(&key) {
            debug!(key = %key, "fact cache hit");
            return Ok(page);
        }

        debug!(key = %key, "fact cache miss");
        let page = self.fetch_uncached(args).await?;
        cache.insert(key, page.clone());
        debug!(entries = cache.len(), "fact cache populated");
        Ok(page)
    }
}
