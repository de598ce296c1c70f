//! Paginated feed state and its transitions
//!
//! Every fetch the feed issues is described by a [`PageRequest`] carrying a
//! token. Only the completion whose token matches the request currently in
//! flight is applied; anything else was issued under filters that have since
//! been replaced and is dropped.

use std::collections::HashSet;

use super::fingerprint::{location_key, Fingerprint};
use super::models::{Listing, SearchFilters, SearchPage};

/// Snapshot of the feed as the view renders it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    /// Listings in display order, unique by id
    pub items: Vec<Listing>,
    /// Last page loaded (1-based)
    pub page: u32,
    /// Total matches reported by the backend
    pub total: u64,
    pub has_more: bool,
    pub is_loading_initial: bool,
    pub is_loading_more: bool,
    pub active_fingerprint: Option<Fingerprint>,
    pub location: Option<String>,
    /// Most recent failure that was turned into an empty or unchanged feed
    pub last_error: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total: 0,
            has_more: false,
            is_loading_initial: false,
            is_loading_more: false,
            active_fingerprint: None,
            location: None,
            last_error: None,
        }
    }
}

/// Coarse lifecycle phase derived from the loading flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
}

impl FeedState {
    pub fn phase(&self) -> FeedPhase {
        if self.is_loading_initial {
            FeedPhase::LoadingInitial
        } else if self.is_loading_more {
            FeedPhase::LoadingMore
        } else if self.active_fingerprint.is_none() {
            FeedPhase::Idle
        } else {
            FeedPhase::Ready
        }
    }
}

/// Why a page is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First page after a filter or location change
    Reset,
    /// Next page appended to the current results
    More,
}

/// A fetch the controller must perform
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub token: u64,
    pub kind: LoadKind,
    pub page: u32,
    pub filters: SearchFilters,
}

/// What applying a completion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub kind: LoadKind,
    /// Listings added to the feed by this completion
    pub added: usize,
    /// The view should scroll the results container into view
    pub scroll_into_view: bool,
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    token: u64,
    kind: LoadKind,
    page: u32,
}

/// Transition logic for the incremental feed
#[derive(Debug, Default)]
pub struct FeedMachine {
    state: FeedState,
    filters: Option<SearchFilters>,
    outstanding: Option<Outstanding>,
    next_token: u64,
    scroll_pending: bool,
}

impl FeedMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Filters of the active search, if any
    pub fn filters(&self) -> Option<&SearchFilters> {
        self.filters.as_ref()
    }

    /// Whether a post-search scroll has been requested but not yet issued
    pub fn scroll_pending(&self) -> bool {
        self.scroll_pending
    }

    /// Adopt new filters
    ///
    /// Returns the first-page request when the fingerprint or location
    /// differs from the active search, or unconditionally when `force` is set.
    /// The feed is emptied before the request is handed out.
    pub fn apply_filters(&mut self, filters: SearchFilters, force: bool) -> Option<PageRequest> {
        let fingerprint = Fingerprint::from(&filters);
        let location = location_key(&filters);

        let unchanged = self.state.active_fingerprint.as_ref() == Some(&fingerprint)
            && self.state.location == location;
        if unchanged && !force {
            return None;
        }

        self.state = FeedState {
            is_loading_initial: true,
            active_fingerprint: Some(fingerprint),
            location,
            ..FeedState::default()
        };
        self.scroll_pending = true;
        self.filters = Some(filters.clone());

        Some(self.issue(LoadKind::Reset, 1, filters))
    }

    /// Request the next page if the feed allows it right now
    pub fn begin_more(&mut self) -> Option<PageRequest> {
        let state = &self.state;
        if !state.has_more || state.is_loading_more || state.is_loading_initial {
            return None;
        }
        let filters = self.filters.clone()?;

        self.state.is_loading_more = true;
        let page = self.state.page + 1;
        Some(self.issue(LoadKind::More, page, filters))
    }

    fn issue(&mut self, kind: LoadKind, page: u32, filters: SearchFilters) -> PageRequest {
        let token = self.next_token;
        self.next_token += 1;
        self.outstanding = Some(Outstanding { token, kind, page });
        PageRequest {
            token,
            kind,
            page,
            filters,
        }
    }

    /// Apply the outcome of a request
    ///
    /// Returns `None` when the token no longer matches the request in flight.
    pub fn complete(
        &mut self,
        token: u64,
        outcome: std::result::Result<SearchPage, String>,
    ) -> Option<Settled> {
        let outstanding = match self.outstanding {
            Some(o) if o.token == token => o,
            _ => return None,
        };
        self.outstanding = None;

        let added = match outcome {
            Ok(page) => self.apply_page(outstanding, page),
            Err(message) => {
                self.state.last_error = Some(message);
                match outstanding.kind {
                    LoadKind::Reset => {
                        self.state.items.clear();
                        self.state.total = 0;
                        self.state.has_more = false;
                        self.state.is_loading_initial = false;
                    }
                    LoadKind::More => {
                        self.state.is_loading_more = false;
                    }
                }
                0
            }
        };

        let scroll_into_view = outstanding.kind == LoadKind::Reset && self.scroll_pending;
        if scroll_into_view {
            self.scroll_pending = false;
        }

        Some(Settled {
            kind: outstanding.kind,
            added,
            scroll_into_view,
        })
    }

    /// Drop a request that will never complete
    ///
    /// Clears its loading flag so later triggers can fetch again. An
    /// abandoned reset leaves the feed empty and forgets its filters, so
    /// submitting them again fetches. Returns `false` when the token is no
    /// longer the request in flight.
    pub fn abandon(&mut self, token: u64) -> bool {
        let outstanding = match self.outstanding {
            Some(o) if o.token == token => o,
            _ => return false,
        };
        self.outstanding = None;

        match outstanding.kind {
            LoadKind::Reset => {
                self.state = FeedState::default();
                self.filters = None;
            }
            LoadKind::More => self.state.is_loading_more = false,
        }
        true
    }

    fn apply_page(&mut self, outstanding: Outstanding, page: SearchPage) -> usize {
        let received = page.items.len();
        let state = &mut self.state;

        let added = match outstanding.kind {
            LoadKind::Reset => {
                state.items.clear();
                push_unique(&mut state.items, page.items)
            }
            LoadKind::More => push_unique(&mut state.items, page.items),
        };

        state.page = outstanding.page;
        state.total = page.total.max(state.items.len() as u64);
        state.has_more = outstanding.page < page.total_pages && received > 0;
        state.is_loading_initial = false;
        state.is_loading_more = false;
        state.last_error = None;
        added
    }
}

fn push_unique(items: &mut Vec<Listing>, incoming: Vec<Listing>) -> usize {
    let mut seen: HashSet<String> = items.iter().map(|l| l.id.clone()).collect();
    let before = items.len();
    for listing in incoming {
        if seen.insert(listing.id.clone()) {
            items.push(listing);
        }
    }
    items.len() - before
}
