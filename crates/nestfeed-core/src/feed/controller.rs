use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::models::{ScrollMetrics, SearchFilters, SearchPage};
use super::state::{FeedMachine, FeedState, LoadKind, PageRequest};
use super::trigger::{near_bottom, LoadTrigger};
use crate::config::FeedConfig;
use crate::source::ListingSource;
use crate::{Error, Result};

/// Notifications for the view layer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A page was applied to the feed
    PageLoaded {
        kind: LoadKind,
        page: u32,
        added: usize,
        total: u64,
    },
    /// A load failed; the feed kept its items or fell back to empty results
    LoadFailed {
        kind: LoadKind,
        message: String,
        /// Retrying the same request may succeed
        transient: bool,
    },
    /// Scroll the named container into view (once per new search)
    ScrollIntoView { container: String },
}

/// Drives a paginated listing search from filter changes and scroll position
///
/// All entry points take `&self` and can be called concurrently; the feed
/// state machine decides whether a call results in a fetch.
pub struct FeedController {
    source: Arc<dyn ListingSource>,
    config: FeedConfig,
    machine: Mutex<FeedMachine>,
    state_tx: watch::Sender<FeedState>,
    event_tx: Option<mpsc::UnboundedSender<FeedEvent>>,
    alive: Arc<AtomicBool>,
    scroll_task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedController {
    /// Create a controller with an empty feed
    pub fn new(source: Arc<dyn ListingSource>, config: FeedConfig) -> Self {
        let (state_tx, _) = watch::channel(FeedState::default());
        Self {
            source,
            config,
            machine: Mutex::new(FeedMachine::new()),
            state_tx,
            event_tx: None,
            alive: Arc::new(AtomicBool::new(true)),
            scroll_task: Mutex::new(None),
        }
    }

    /// Set the event sender for view notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Watch the feed state
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    /// Current feed state
    pub fn state(&self) -> FeedState {
        self.machine.lock().state().clone()
    }

    fn send_event(&self, event: FeedEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                debug!("Feed event dropped: receiver gone");
            }
        }
    }

    fn publish(&self, state: FeedState) {
        self.state_tx.send_replace(state);
    }

    /// Search with new filters; a no-op when they match the active search
    pub async fn set_filters(&self, filters: SearchFilters) -> Result<()> {
        self.start_search(filters, false).await
    }

    /// Search again with the active filters, even though they are unchanged
    pub async fn refresh(&self) -> Result<()> {
        let filters = self.machine.lock().filters().cloned().unwrap_or_default();
        self.start_search(filters, true).await
    }

    async fn start_search(&self, filters: SearchFilters, force: bool) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        let (request, snapshot) = {
            let mut machine = self.machine.lock();
            let request = machine.apply_filters(filters, force);
            (request, machine.state().clone())
        };

        let Some(request) = request else {
            debug!("Filters unchanged, keeping current results");
            return Ok(());
        };

        info!(
            fingerprint = %snapshot.active_fingerprint.as_ref().map(|f| f.as_str()).unwrap_or(""),
            location = snapshot.location.as_deref().unwrap_or("-"),
            force,
            "Starting new search"
        );
        // Listeners see the cleared feed before the first page is fetched
        self.publish(snapshot);
        self.run(request).await
    }

    /// Fetch and append the next page unless a load is running or nothing is left
    pub async fn load_more(&self) -> Result<()> {
        self.load_more_from(LoadTrigger::Manual).await
    }

    /// Sentinel element near the end of the list changed visibility
    pub async fn on_sentinel_visible(&self, visible: bool) -> Result<()> {
        if !visible {
            return Ok(());
        }
        self.load_more_from(LoadTrigger::Sentinel).await
    }

    /// Scroll position poll
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> Result<()> {
        if !near_bottom(&metrics, self.config.scroll_threshold_px) {
            return Ok(());
        }
        self.load_more_from(LoadTrigger::ScrollPoll).await
    }

    async fn load_more_from(&self, trigger: LoadTrigger) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        let (request, snapshot) = {
            let mut machine = self.machine.lock();
            let request = machine.begin_more();
            (request, machine.state().clone())
        };

        let Some(request) = request else {
            debug!(?trigger, "Load more skipped");
            return Ok(());
        };

        debug!(?trigger, page = request.page, "Loading more listings");
        self.publish(snapshot);
        self.run(request).await
    }

    /// Perform a request and apply its outcome
    async fn run(&self, request: PageRequest) -> Result<()> {
        let limit = self.config.page_size;
        let mut pending = PendingRequest {
            controller: self,
            token: request.token,
            armed: true,
        };
        let fetched = self.source.search(&request.filters, request.page, limit).await;

        let mut violation: Option<Error> = None;
        let mut transient = false;
        let outcome = match fetched {
            Ok(page) => match page.validate(request.page, limit) {
                Ok(()) => Ok(page),
                Err(e) if self.config.strict_contracts => {
                    error!(page = request.page, error = %e, "Malformed search response");
                    let message = e.to_string();
                    violation = Some(e);
                    Err(message)
                }
                Err(e) => {
                    warn!(page = request.page, error = %e, "Malformed search response, showing no results");
                    Ok(SearchPage {
                        page: request.page,
                        ..SearchPage::empty(limit)
                    })
                }
            },
            Err(e) => {
                transient = e.is_transient();
                warn!(page = request.page, kind = ?request.kind, transient, error = %e, "Search request failed");
                Err(e.to_string())
            }
        };

        if !self.is_alive() {
            return Ok(());
        }

        let failure = outcome.as_ref().err().cloned();
        let (settled, snapshot) = {
            let mut machine = self.machine.lock();
            let settled = machine.complete(request.token, outcome);
            (settled, machine.state().clone())
        };
        pending.armed = false;

        let Some(settled) = settled else {
            debug!(token = request.token, page = request.page, "Discarding stale response");
            return Ok(());
        };

        match failure {
            Some(message) => self.send_event(FeedEvent::LoadFailed {
                kind: settled.kind,
                message,
                transient,
            }),
            None => self.send_event(FeedEvent::PageLoaded {
                kind: settled.kind,
                page: snapshot.page,
                added: settled.added,
                total: snapshot.total,
            }),
        }
        self.publish(snapshot);

        if settled.scroll_into_view {
            self.schedule_scroll();
        }

        match violation {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Ask the view to scroll to the results once layout has settled
    fn schedule_scroll(&self) {
        let delay = self.config.scroll_settle();
        let container = self.config.results_container.clone();
        let event_tx = self.event_tx.clone();
        let alive = Arc::clone(&self.alive);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !alive.load(Ordering::Acquire) {
                return;
            }
            if let Some(tx) = event_tx {
                let _ = tx.send(FeedEvent::ScrollIntoView { container });
            }
        });

        if let Some(previous) = self.scroll_task.lock().replace(handle) {
            previous.abort();
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stop the controller; pending work is cancelled and later calls do nothing
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
        if let Some(task) = self.scroll_task.lock().take() {
            task.abort();
        }
        debug!("Feed controller shut down");
    }
}

/// Releases the loading flags of a request whose future was dropped mid-fetch
struct PendingRequest<'a> {
    controller: &'a FeedController,
    token: u64,
    armed: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let snapshot = {
            let mut machine = self.controller.machine.lock();
            machine.abandon(self.token).then(|| machine.state().clone())
        };
        if let Some(snapshot) = snapshot {
            warn!(token = self.token, "Feed request cancelled before completing");
            self.controller.publish(snapshot);
        }
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
