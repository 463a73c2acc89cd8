//! Response cache wrapping every provider call.
//!
//! Keys are derived from a call's identity (the fully-qualified method name)
//! plus a SHA-256 digest of its arguments serialized as sorted-key JSON, so
//! keys stay short and backend-safe whatever the arguments look like. The
//! receiver is never part of the key.
//!
//! Values are stored as JSON with a per-entry TTL, so one cache instance can
//! serve providers with different freshness requirements.
//!
//! ```ignore
//! let key = cache.key("GoogleBooksClient::get_book_data", &json!({ "isbn": isbn }))?;
//! let volume = cache
//!     .get_or_fetch(&key, policy, || async { client.fetch_volume(isbn).await })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// Default time-to-live for cached provider responses (4 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// Default upper bound on cached entries.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Errors raised by the cache itself.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to serialize cache arguments or value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Cached value for {key} could not be decoded: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How long results of one kind of call are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Lifetime of a cached non-empty result
    pub ttl: Duration,
    /// When set, empty results and failures store a "no result" marker for
    /// this (shorter) duration instead of being retried on every call
    pub negative_ttl: Option<Duration>,
}

impl CachePolicy {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            negative_ttl: None,
        }
    }

    pub fn with_negative_ttl(mut self, negative_ttl: Duration) -> Self {
        self.negative_ttl = Some(negative_ttl);
        self
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache key for one call: identity plus argument digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from a call identity and its arguments.
    ///
    /// Calls without arguments (unit, `null` or an empty map) use the bare
    /// identity.
    pub fn new<A: Serialize + ?Sized>(identity: &str, args: &A) -> Result<Self, CacheError> {
        let value = serde_json::to_value(args).map_err(CacheError::Serialize)?;
        let no_args = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if no_args {
            return Ok(Self(identity.to_string()));
        }

        // serde_json's map is ordered, so objects serialize with sorted keys
        let canonical = serde_json::to_string(&value).map_err(CacheError::Serialize)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Self(format!("{identity}:{digest:x}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn prefixed(self, prefix: &str) -> Self {
        if prefix.is_empty() {
            self
        } else {
            Self(format!("{prefix}:{}", self.0))
        }
    }
}

/// Snapshot of cache activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

/// A stored value. `None` marks a remembered "no result".
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<Arc<serde_json::Value>>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared in-memory cache for provider and orchestrator results.
///
/// Cloning is cheap; clones share the same entries and counters.
/// Concurrent readers and writers are safe; each key is updated atomically.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, CacheEntry>,
    prefix: String,
    counters: Arc<Counters>,
}

impl ResponseCache {
    /// Create a cache bounded to `max_entries` entries.
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            entries,
            prefix: String::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Prefix every key (e.g. to share a backend between deployments).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Derive the key for a call; see [`CacheKey::new`].
    pub fn key<A: Serialize + ?Sized>(&self, identity: &str, args: &A) -> Result<CacheKey, CacheError> {
        Ok(CacheKey::new(identity, args)?.prefixed(&self.prefix))
    }

    /// Return the cached result for `key`, or run `fetch` and cache its result.
    ///
    /// - Non-empty results are stored for `policy.ttl`.
    /// - Empty results (`None`, empty list) and errors are only remembered
    ///   when `policy.negative_ttl` is set; a remembered "no result" comes
    ///   back as `T::default()`.
    /// - Errors from `fetch` are always returned to the caller.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        policy: CachePolicy,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Default,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(entry) = self.entries.get(key.as_str()).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = key.as_str(), "Cache hit");
            return match entry.value {
                Some(value) => T::deserialize(value.as_ref()).map_err(|source| {
                    CacheError::Deserialize {
                        key: key.as_str().to_string(),
                        source,
                    }
                    .into()
                }),
                None => Ok(T::default()),
            };
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = key.as_str(), "Cache miss");

        match fetch().await {
            Ok(result) => {
                let value = serde_json::to_value(&result).map_err(CacheError::Serialize)?;
                if is_empty(&value) {
                    if let Some(negative_ttl) = policy.negative_ttl {
                        self.store(key, None, negative_ttl).await;
                    }
                } else {
                    self.store(key, Some(value), policy.ttl).await;
                }
                Ok(result)
            }
            Err(err) => {
                if let Some(negative_ttl) = policy.negative_ttl {
                    self.store(key, None, negative_ttl).await;
                }
                Err(err)
            }
        }
    }

    /// [`get_or_fetch`](Self::get_or_fetch) keyed by a call identity and its arguments.
    pub async fn cached_call<A, T, E, F, Fut>(
        &self,
        identity: &str,
        args: &A,
        policy: CachePolicy,
        fetch: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned + Default,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.key(identity, args)?;
        self.get_or_fetch(&key, policy, fetch).await
    }

    /// Drop the cached result for one key.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key.as_str()).await;
        tracing::debug!(key = key.as_str(), "Cache cleared");
    }

    /// Drop the cached result of one call (identity + arguments).
    pub async fn invalidate_call<A: Serialize + ?Sized>(
        &self,
        identity: &str,
        args: &A,
    ) -> Result<(), CacheError> {
        let key = self.key(identity, args)?;
        self.invalidate(&key).await;
        Ok(())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Whether a (non-expired) entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key.as_str())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
        }
    }

    async fn store(&self, key: &CacheKey, value: Option<serde_json::Value>, ttl: Duration) {
        let entry = CacheEntry {
            value: value.map(Arc::new),
            ttl,
        };
        self.entries.insert(key.as_str().to_string(), entry).await;
        self.counters.stores.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = key.as_str(), ttl_secs = ttl.as_secs(), "Cached result");
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
