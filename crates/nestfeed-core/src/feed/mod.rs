mod controller;
mod fingerprint;
mod models;
mod state;
mod trigger;

pub use controller::{FeedController, FeedEvent};
pub use fingerprint::{location_key, Fingerprint};
pub use models::{Listing, ListingType, ScrollMetrics, SearchFilters, SearchPage, SortOrder};
pub use state::{FeedMachine, FeedPhase, FeedState, LoadKind, PageRequest, Settled};
pub use trigger::{near_bottom, LoadTrigger};
