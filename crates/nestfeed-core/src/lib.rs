pub mod cache;
pub mod carousel;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod gallery;
pub mod source;

pub use cache::ResourceCache;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use feed::{FeedController, FeedEvent, FeedState, SearchFilters};
pub use gallery::ImageGallery;
pub use source::{HttpListingSource, ListingSource};
