//! Key-addressed cache with TTL-at-access expiry and request coalescing

mod entry;
mod resource_cache;

pub use entry::CacheEntry;
pub use resource_cache::ResourceCache;
