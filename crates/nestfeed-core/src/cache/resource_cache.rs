use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use crate::clock::{Clock, TokioClock};
use crate::{Error, Result};

type SharedResolution<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<Error>>>>;

/// A pending resolution that later callers for the same key join
struct InFlight<T> {
    id: u64,
    future: SharedResolution<T>,
}

struct Slots<T> {
    entries: HashMap<String, CacheEntry<T>>,
    in_flight: HashMap<String, InFlight<T>>,
    next_id: u64,
}

/// Async cache that resolves each key at most once at a time
///
/// Entries expire lazily: the TTL passed to [`ResourceCache::get`] is checked
/// when the entry is read, and an expired entry stays in memory until the key
/// is resolved again or invalidated. Failed resolutions are never cached.
///
/// Cloning yields another handle to the same storage.
pub struct ResourceCache<T> {
    slots: Arc<Mutex<Slots<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T> fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("ResourceCache")
            .field("entries", &slots.entries.len())
            .field("in_flight", &slots.in_flight.len())
            .finish()
    }
}

impl<T> Default for ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache driven by tokio's clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(TokioClock))
    }

    /// Create a cache that reads time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                next_id: 0,
            })),
            clock,
        }
    }

    /// Resolve `key`, calling `resolver` only when no fresh entry and no
    /// pending resolution exist
    ///
    /// `resolver` is invoked while the cache lock is held, so it must only
    /// build the future and must not touch this cache itself.
    pub async fn get<F, Fut>(&self, key: &str, resolver: F, ttl: Duration) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let pending = {
            let mut slots = self.slots.lock();
            let now = self.clock.now();

            if let Some(entry) = slots.entries.get(key) {
                if entry.is_fresh(now, ttl) {
                    debug!(key, "cache hit");
                    return Ok(entry.value.clone());
                }
            }

            match slots.in_flight.get(key) {
                Some(flight) => {
                    debug!(key, "joining in-flight resolution");
                    flight.future.clone()
                }
                None => {
                    let id = slots.next_id;
                    slots.next_id += 1;
                    debug!(key, id, "cache miss, resolving");

                    let future = self.settle(key.to_string(), id, resolver());
                    slots.in_flight.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        pending.await.map_err(|source| Error::Resolver {
            key: key.to_string(),
            source,
        })
    }

    /// Wrap a resolver future so that settling it updates the cache
    fn settle<Fut>(&self, key: String, id: u64, resolution: Fut) -> SharedResolution<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let clock = Arc::clone(&self.clock);

        async move {
            let outcome = resolution.await;

            let mut slots = slots.lock();
            // An invalidate() during the flight detaches it from the key
            let current = slots
                .in_flight
                .get(&key)
                .is_some_and(|flight| flight.id == id);
            if current {
                slots.in_flight.remove(&key);
            }

            match outcome {
                Ok(value) => {
                    if current {
                        let entry = CacheEntry::new(key.clone(), value.clone(), clock.now());
                        slots.entries.insert(key, entry);
                    }
                    Ok(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "resolution failed");
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Read a fresh value without resolving
    pub fn peek(&self, key: &str, ttl: Duration) -> Option<T> {
        let slots = self.slots.lock();
        let now = self.clock.now();
        slots
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, ttl))
            .map(|entry| entry.value.clone())
    }

    /// Drop the entry and any pending resolution for `key`
    pub fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock();
        let had_entry = slots.entries.remove(key).is_some();
        let had_flight = slots.in_flight.remove(key).is_some();
        debug!(key, had_entry, had_flight, "invalidated");
    }

    /// Drop every entry and pending resolution
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        slots.entries.clear();
        slots.in_flight.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a resolution for `key` is pending
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.slots.lock().in_flight.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    fn counting_resolver(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_resolution() {
        let cache: ResourceCache<u32> = ResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let gets = (0..5).map(|_| cache.get("listing-images:1", counting_resolver(&calls, 7), TTL));
        let results = join_all(gets).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Ok(7))));
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_in_flight("listing-images:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failure_reaches_every_caller_and_is_not_cached() {
        let cache: ResourceCache<u32> = ResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = || {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err::<u32, _>(Error::Api { status: 503, url: "http://api/listings/1/images".into() })
                }
            }
        };

        let results = join_all((0..3).map(|_| cache.get("k", failing(), TTL))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in &results {
            match result {
                Err(Error::Resolver { key, source }) => {
                    assert_eq!(key, "k");
                    assert!(matches!(source.as_ref(), Error::Api { status: 503, .. }));
                }
                other => panic!("expected resolver error, got {:?}", other),
            }
        }
        assert!(cache.is_empty());
        assert!(!cache.is_in_flight("k"));

        // No negative caching: the next call resolves again
        let value = cache.get("k", counting_resolver(&calls, 3), TTL).await.unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entry_served_until_ttl_then_resolved_again() {
        let clock = Arc::new(ManualClock::new());
        let cache: ResourceCache<u32> = ResourceCache::with_clock(clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_millis(1_000);

        let resolve = |value| {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(value) }
            }
        };

        assert_eq!(cache.get("k", resolve(1), ttl).await.unwrap(), 1);

        clock.advance(Duration::from_millis(999));
        assert_eq!(cache.get("k", resolve(2), ttl).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.peek("k", ttl), None);
        assert_eq!(cache.get("k", resolve(2), ttl).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek("k", ttl), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_forces_resolution() {
        let cache: ResourceCache<&'static str> = ResourceCache::new();

        cache.get("k", || async { Ok("old") }, TTL).await.unwrap();
        cache.invalidate("k");
        assert!(cache.is_empty());

        let value = cache.get("k", || async { Ok("new") }, TTL).await.unwrap();
        assert_eq!(value, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_flight_settles_without_caching() {
        let cache: ResourceCache<u32> = ResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.get("k", counting_resolver(&calls, 1), TTL);
        let invalidate = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.invalidate("k");
            // A new caller starts its own resolution
            cache.get("k", counting_resolver(&calls, 2), TTL).await
        };

        let (first, second) = tokio::join!(first, invalidate);
        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek("k", TTL), Some(2));
    }

    #[tokio::test]
    async fn test_distinct_keys_resolve_independently() {
        let cache: ResourceCache<String> = ResourceCache::new();
        let a = cache.get("a", || async { Ok("A".to_string()) }, TTL);
        let b = cache.get("b", || async { Ok("B".to_string()) }, TTL);
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap(), "A");
        assert_eq!(b.unwrap(), "B");
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
