//! Data source contract for listing searches and image sets

mod http;

pub use http::HttpListingSource;

use crate::feed::{SearchFilters, SearchPage};
use crate::Result;

/// Read-only access to the listings backend
///
/// Both calls are idempotent; failures surface as errors and callers decide
/// whether to retry.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of listings matching `filters`
    async fn search(&self, filters: &SearchFilters, page: u32, limit: u32) -> Result<SearchPage>;

    /// Fetch every image URL for a listing
    async fn images_for(&self, listing_id: &str) -> Result<Vec<String>>;
}
