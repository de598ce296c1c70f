use std::time::Duration;

use tokio::time::Instant;

/// A resolved value and the instant it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub stored_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(key: String, value: T, stored_at: Instant) -> Self {
        Self { key, value, stored_at }
    }

    /// Whether the entry is still valid at `now` for the given TTL
    #[inline]
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}
