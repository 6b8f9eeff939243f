//! Time-boxed page cache with request coalescing.
//!
//! Concurrent callers asking for the same page await one shared in-flight
//! future, so a cold key costs exactly one underlying fetch.

use super::PageFetcher;
use crate::error::FetchError;
use crate::types::{FetchedPage, normalize_url};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Type alias for shared page fetch futures.
type SharedFetch = Shared<BoxFuture<'static, Result<Arc<FetchedPage>, FetchError>>>;

struct CacheEntry {
    page: Arc<FetchedPage>,
    fetched_at: Instant,
}

struct CacheInner {
    /// Completed fetches keyed by normalized URL
    entries: RwLock<HashMap<String, CacheEntry>>,

    /// In-flight fetches (can be awaited by multiple callers)
    in_flight: Mutex<HashMap<String, SharedFetch>>,

    ttl: Duration,
    fetch_timeout: Duration,
    fetcher: Arc<dyn PageFetcher>,
}

impl CacheInner {
    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }
}

/// Cache over outbound page fetches, keyed by normalized URL.
///
/// Entries expire lazily: a stale entry is dropped on the next access. Capacity
/// is unbounded; the crawler bounds the number of pages per vendor.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("ttl", &self.inner.ttl)
            .field("fetch_timeout", &self.inner.fetch_timeout)
            .field(
                "entries",
                &self.inner.entries.try_read().map(|e| e.len()).ok(),
            )
            .finish_non_exhaustive()
    }
}

impl FetchCache {
    pub fn new(fetcher: Arc<dyn PageFetcher>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                ttl,
                fetch_timeout,
                fetcher,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.inner.fetch_timeout
    }

    /// Returns the cached page for `url`, fetching it if missing or stale.
    ///
    /// 1. Fresh entry: returned without touching the network
    /// 2. In-flight fetch for the same key: awaited
    /// 3. Otherwise a new fetch is started and published for other callers
    pub async fn get_or_fetch(&self, url: &str) -> Result<Arc<FetchedPage>, FetchError> {
        let key = normalize_url(url);

        if let Some(page) = self.lookup(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(page);
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                tracing::debug!("Awaiting in-flight fetch for {}", key);
                existing.clone()
            } else {
                // A fetch may have completed between the lookup and taking the lock
                if let Some(page) = self.lookup(&key).await {
                    return Ok(page);
                }

                tracing::debug!("Cache miss for {}, fetching", key);
                let future = Self::fetch_and_store(
                    Arc::clone(&self.inner),
                    key.clone(),
                    url.trim().to_string(),
                )
                .boxed()
                .shared();
                in_flight.insert(key, future.clone());
                future
            }
        };

        shared.await
    }

    /// The single underlying fetch for one key. Stores the result before
    /// unpublishing itself, so a caller that finds no in-flight entry will find
    /// the cached page instead.
    async fn fetch_and_store(
        inner: Arc<CacheInner>,
        key: String,
        url: String,
    ) -> Result<Arc<FetchedPage>, FetchError> {
        let result = match tokio::time::timeout(inner.fetch_timeout, inner.fetcher.fetch(&url)).await
        {
            Ok(Ok(page)) => Ok(Arc::new(page)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::Timeout {
                url: url.clone(),
                after: inner.fetch_timeout,
            }),
        };

        match &result {
            Ok(page) => {
                inner.entries.write().await.insert(
                    key.clone(),
                    CacheEntry {
                        page: Arc::clone(page),
                        fetched_at: Instant::now(),
                    },
                );
            }
            Err(e) => tracing::debug!("Fetch failed for {}: {}", url, e),
        }

        inner.in_flight.lock().await.remove(&key);
        result
    }

    /// Fresh cached page for `key`; drops the entry if it has expired.
    async fn lookup(&self, key: &str) -> Option<Arc<FetchedPage>> {
        {
            let entries = self.inner.entries.read().await;
            match entries.get(key) {
                Some(entry) if self.inner.is_fresh(entry) => return Some(Arc::clone(&entry.page)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.inner.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| !self.inner.is_fresh(entry))
        {
            tracing::debug!("Evicting stale cache entry for {}", key);
            entries.remove(key);
        }
        None
    }

    /// Check if a fresh entry exists for `url` without fetching.
    pub async fn contains(&self, url: &str) -> bool {
        let key = normalize_url(url);
        self.inner
            .entries
            .read()
            .await
            .get(&key)
            .is_some_and(|entry| self.inner.is_fresh(entry))
    }

    /// Drops the entry for `url`. Returns whether one was present.
    pub async fn invalidate(&self, url: &str) -> bool {
        let key = normalize_url(url);
        self.inner.entries.write().await.remove(&key).is_some()
    }

    /// Removes every expired entry. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.inner.ttl);
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    /// Number of stored entries, including ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
