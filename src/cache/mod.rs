//! In-memory caching.
//!
//! [`MemoryCache`] wraps a [`moka`] concurrent cache built without a capacity
//! or time-to-live, so entries stay for the lifetime of the cache and the map
//! grows with the number of distinct keys ever stored.
//!
//! Two tasks missing the same cold key may both populate it; the last write wins.

use moka::sync::Cache;

/// A thread-safe, unbounded, string-keyed cache.
///
/// # Examples
///
/// ```
/// use catfacts::cache::MemoryCache;
///
/// let cache = MemoryCache::new();
/// assert_eq!(cache.get("1-10-140"), None::<u32>);
/// cache.insert("1-10-140", 7);
/// assert_eq!(cache.get("1-10-140"), Some(7));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct MemoryCache<V> {
    entries: Cache<String, V>,
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    /// Number of stored entries, after flushing moka's pending bookkeeping.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
