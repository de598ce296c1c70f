//! Per-listing image sets resolved through the shared cache

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResourceCache;
use crate::feed::Listing;
use crate::source::ListingSource;
use crate::Result;

/// Image URLs of one listing
pub type ImageSet = Arc<Vec<String>>;

/// Resolves listing image sets, coalescing concurrent requests per listing
#[derive(Clone)]
pub struct ImageGallery {
    source: Arc<dyn ListingSource>,
    cache: ResourceCache<ImageSet>,
    ttl: Duration,
}

impl ImageGallery {
    pub fn new(source: Arc<dyn ListingSource>, cache: ResourceCache<ImageSet>, ttl: Duration) -> Self {
        Self { source, cache, ttl }
    }

    /// Cache key for a listing's images
    pub fn cache_key(listing_id: &str) -> String {
        format!("listing-images:{}", listing_id)
    }

    /// Every image of the listing; errors reach the caller uncached
    pub async fn images_for(&self, listing_id: &str) -> Result<ImageSet> {
        let key = Self::cache_key(listing_id);
        let source = Arc::clone(&self.source);
        let id = listing_id.to_string();

        self.cache
            .get(
                &key,
                move || async move {
                    let images = source.images_for(&id).await?;
                    tracing::debug!(listing = %id, count = images.len(), "Resolved image set");
                    Ok(Arc::new(images))
                },
                self.ttl,
            )
            .await
    }

    /// The listing's images, or its cover image alone when they cannot be loaded
    pub async fn images_or_cover(&self, listing: &Listing) -> ImageSet {
        match self.images_for(&listing.id).await {
            Ok(images) if !images.is_empty() => images,
            Ok(_) => Arc::new(listing.cover_image.iter().cloned().collect()),
            Err(e) => {
                tracing::warn!(listing = %listing.id, error = %e, "Falling back to cover image");
                Arc::new(listing.cover_image.iter().cloned().collect())
            }
        }
    }

    /// Forget the cached images of a listing
    pub fn invalidate(&self, listing_id: &str) {
        self.cache.invalidate(&Self::cache_key(listing_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{SearchFilters, SearchPage};
    use crate::Error;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ImageSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ListingSource for ImageSource {
        async fn search(&self, _: &SearchFilters, _: u32, limit: u32) -> Result<SearchPage> {
            Ok(SearchPage::empty(limit))
        }

        async fn images_for(&self, listing_id: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(Error::Api { status: 500, url: format!("/listings/{}/images", listing_id) });
            }
            Ok((1..=3).map(|n| format!("https://img/{}/{}.jpg", listing_id, n)).collect())
        }
    }

    fn gallery(fail: bool) -> (ImageGallery, Arc<ImageSource>) {
        let source = Arc::new(ImageSource { calls: AtomicUsize::new(0), fail });
        let gallery = ImageGallery::new(source.clone(), ResourceCache::new(), Duration::from_secs(60));
        (gallery, source)
    }

    fn listing(id: &str) -> Listing {
        serde_json::from_value(serde_json::json!({
            "id": id, "title": "Flat", "price": 1, "coverImage": "https://img/cover.jpg"
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cards_sharing_a_listing_fetch_once() {
        let (gallery, source) = gallery(false);

        let sets = join_all((0..4).map(|_| gallery.images_for("42"))).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        for set in sets {
            assert_eq!(set.unwrap().len(), 3);
        }

        gallery.images_for("42").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        gallery.invalidate("42");
        gallery.images_for("42").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_falls_back_to_cover() {
        let (gallery, source) = gallery(true);

        let images = gallery.images_or_cover(&listing("7")).await;
        assert_eq!(images.as_slice(), ["https://img/cover.jpg".to_string()]);

        // Errors are not cached, so the next card retries
        gallery.images_or_cover(&listing("7")).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
