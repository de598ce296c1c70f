//! Load-more trigger sources

use super::models::ScrollMetrics;

/// What asked the feed for another page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTrigger {
    /// The end-of-list sentinel became visible
    Sentinel,
    /// Scroll polling found the viewport near the bottom
    ScrollPoll,
    /// An explicit request, e.g. a "show more" button
    Manual,
}

/// Whether the viewport bottom is within `threshold` pixels of the content end
#[inline]
pub fn near_bottom(metrics: &ScrollMetrics, threshold: f64) -> bool {
    metrics.distance_from_bottom() <= threshold
}
