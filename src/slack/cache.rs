//! Fetch-once cache for the channel and user collections

use crate::error::Result;
use crate::logging::log_error;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Counters for one cached collection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub hits: u64,
    /// Accesses that found the cache empty and went to the API
    pub misses: u64,
    pub fetch_errors: u64,
    pub clears: u64,
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub channels: CollectionStats,
    pub users: CollectionStats,
}

struct Slot<T> {
    items: Option<Arc<Vec<T>>>,
    stats: CollectionStats,
}

/// A whole collection, fetched on first access and kept until cleared
///
/// The check-and-populate step runs under one lock, so concurrent first
/// accesses trigger a single fetch and a clear never interleaves with it.
pub struct CollectionCache<T> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
}

impl<T> CollectionCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot {
                items: None,
                stats: CollectionStats::default(),
            }),
        }
    }

    /// Return the cached items, running `fetch` first if the cache is empty
    ///
    /// A failed fetch leaves the cache empty, and so does a fetch that
    /// returned no items.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let mut slot = self.slot.lock().await;

        // An empty collection is refetched on every access
        if let Some(items) = slot.items.as_ref().filter(|items| !items.is_empty()) {
            let items = items.clone();
            slot.stats.hits += 1;
            tracing::trace!(collection = self.name, count = items.len(), "Cache hit");
            return Ok(items);
        }

        slot.stats.misses += 1;
        tracing::debug!(collection = self.name, "Cache empty, fetching from Slack API");

        match fetch().await {
            Ok(items) => {
                let items = Arc::new(items);
                tracing::info!(
                    collection = self.name,
                    count = items.len(),
                    "Fetched and cached collection"
                );
                slot.items = Some(items.clone());
                Ok(items)
            }
            Err(e) => {
                slot.stats.fetch_errors += 1;
                log_error(self.name, &e);
                Err(e)
            }
        }
    }

    /// Drop the cached items so the next access refetches
    pub async fn clear(&self) {
        let mut slot = self.slot.lock().await;
        slot.items = None;
        slot.stats.clears += 1;
        tracing::debug!(collection = self.name, "Cache cleared");
    }

    /// Number of cached items, or None if not fetched yet
    pub async fn cached_len(&self) -> Option<usize> {
        self.slot.lock().await.items.as_ref().map(|items| items.len())
    }

    pub async fn stats(&self) -> CollectionStats {
        self.slot.lock().await.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlackApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetches_once() {
        let cache = CollectionCache::new("numbers");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let items = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(*items, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cache = CollectionCache::new("numbers");
        cache.get_or_fetch(|| async { Ok(vec![1]) }).await.unwrap();
        cache.clear().await;
        assert_eq!(cache.cached_len().await, None);

        let items = cache.get_or_fetch(|| async { Ok(vec![1, 2]) }).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(cache.stats().await.misses, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_empty() {
        let cache: CollectionCache<u8> = CollectionCache::new("numbers");
        let err = cache
            .get_or_fetch(|| async { Err(SlackApiError::Configuration("down".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, SlackApiError::Configuration(_)));
        assert_eq!(cache.cached_len().await, None);
        assert_eq!(cache.stats().await.fetch_errors, 1);
    }

    #[tokio::test]
    async fn test_empty_collection_is_refetched() {
        let cache: CollectionCache<u8> = CollectionCache::new("numbers");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let items = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![])
                })
                .await
                .unwrap();
            assert!(items.is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().await.hits, 0);
    }
}
