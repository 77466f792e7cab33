//! Query cache
//!
//! Results are cached per (operation, parameters) key. Concurrent reads of
//! the same key share one in-flight request, and invalidation marks every
//! entry of an operation stale so that the next read refetches.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::ClientError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, ClientError>>>;

/// Cache key: the operation name plus its parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub operation: &'static str,
    pub params: String,
}

impl QueryKey {
    pub fn new(operation: &'static str, params: impl Into<String>) -> Self {
        Self {
            operation,
            params: params.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Success,
    Error(ClientError),
}

struct Entry<V> {
    data: Option<V>,
    status: QueryStatus,
    fetched_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<(u64, SharedFetch<V>)>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            data: None,
            status: QueryStatus::Loading,
            fetched_at: None,
            invalidated: false,
            in_flight: None,
        }
    }
}

struct Inner<V> {
    entries: HashMap<QueryKey, Entry<V>>,
    next_fetch: u64,
}

/// Keyed result cache with staleness and in-flight request sharing
pub struct QueryCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
    /// `None` means entries never go stale on their own
    stale_time: Option<Duration>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stale_time: self.stale_time,
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(stale_time: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                next_fetch: 0,
            })),
            stale_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // A poisoned cache only holds plain data; keep using it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, entry: &Entry<V>) -> bool {
        if entry.data.is_none() || entry.invalidated {
            return false;
        }
        match (self.stale_time, entry.fetched_at) {
            (None, _) => true,
            (Some(stale_time), Some(fetched_at)) => fetched_at.elapsed() < stale_time,
            (Some(_), None) => false,
        }
    }

    /// Cached data if fresh, otherwise the result of `fetcher`. A fetch
    /// already running for the key is joined instead of starting another.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<V, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ClientError>> + Send + 'static,
    {
        let (fetch_id, shared) = {
            let mut inner = self.lock();
            let fresh = inner
                .entries
                .get(&key)
                .filter(|entry| self.is_fresh(entry))
                .and_then(|entry| entry.data.clone());
            if let Some(data) = fresh {
                return Ok(data);
            }

            let running = inner
                .entries
                .get(&key)
                .and_then(|entry| entry.in_flight.clone());
            match running {
                Some(running) => running,
                None => {
                    inner.next_fetch += 1;
                    let fetch_id = inner.next_fetch;
                    let shared = fetcher().boxed().shared();

                    let entry = inner.entries.entry(key.clone()).or_default();
                    entry.status = QueryStatus::Loading;
                    entry.in_flight = Some((fetch_id, shared.clone()));
                    debug!("Fetching {}({})", key.operation, key.params);
                    (fetch_id, shared)
                }
            }
        };

        let result = shared.await;

        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(&key) {
            // A fetch superseded by invalidation does not write back
            let current = matches!(&entry.in_flight, Some((id, _)) if *id == fetch_id);
            if current {
                entry.in_flight = None;
                match &result {
                    Ok(data) => {
                        entry.data = Some(data.clone());
                        entry.status = QueryStatus::Success;
                        entry.fetched_at = Some(Instant::now());
                        entry.invalidated = false;
                    }
                    Err(e) => entry.status = QueryStatus::Error(e.clone()),
                }
            }
        }

        result
    }

    /// Cached data regardless of staleness
    pub fn get(&self, key: &QueryKey) -> Option<V> {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.data.clone())
    }

    pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.status.clone())
    }

    /// Whether the next read of `key` goes to the network
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .map_or(true, |entry| !self.is_fresh(entry))
    }

    /// Mark every entry of `operation` stale and detach running fetches
    pub fn invalidate(&self, operation: &str) {
        let mut inner = self.lock();
        for (key, entry) in inner.entries.iter_mut() {
            if key.operation == operation {
                entry.invalidated = true;
                entry.in_flight = None;
            }
        }
        debug!("Invalidated {operation}");
    }

    /// Drop everything
    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, ClientError>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let cache = QueryCache::new(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("pokemon-list", "limit=20&offset=0");

        assert_eq!(cache.fetch(key.clone(), counting_fetch(&calls, 1)).await, Ok(1));
        assert_eq!(cache.fetch(key.clone(), counting_fetch(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(&key), Some(QueryStatus::Success));
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let cache = QueryCache::new(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("pokemon", "25");

        let (a, b) = tokio::join!(
            cache.fetch(key.clone(), counting_fetch(&calls, 25)),
            cache.fetch(key.clone(), counting_fetch(&calls, 99)),
        );
        assert_eq!(a, Ok(25));
        assert_eq!(b, Ok(25));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_refetches() {
        let cache = QueryCache::new(Some(Duration::ZERO));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("pokemon", "1");

        cache.fetch(key.clone(), counting_fetch(&calls, 1)).await.unwrap();
        assert!(cache.is_stale(&key));
        cache.fetch(key.clone(), counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get(&key), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_marks_operation_stale_only() {
        let cache = QueryCache::new(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let favorites = QueryKey::new("favorites", "");
        let list = QueryKey::new("pokemon-list", "limit=20&offset=0");

        cache.fetch(favorites.clone(), counting_fetch(&calls, 1)).await.unwrap();
        cache.fetch(list.clone(), counting_fetch(&calls, 1)).await.unwrap();

        cache.invalidate("favorites");
        assert!(cache.is_stale(&favorites));
        assert!(!cache.is_stale(&list));
        assert_eq!(cache.get(&favorites), Some(1));

        assert_eq!(cache.fetch(favorites, counting_fetch(&calls, 2)).await, Ok(2));
    }

    #[tokio::test]
    async fn test_errors_are_recorded_and_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new(None);
        let key = QueryKey::new("search", "missingno");

        let result = cache
            .fetch(key.clone(), || async { Err(ClientError::NoResponse) })
            .await;
        assert_eq!(result, Err(ClientError::NoResponse));
        assert_eq!(
            cache.status(&key),
            Some(QueryStatus::Error(ClientError::NoResponse))
        );
        assert!(cache.is_stale(&key));
    }
}
