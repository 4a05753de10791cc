//! Location history fetching with debounced window changes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lt_core::{AvailableDateRange, DayRange};

use crate::backend::LocationBackend;
use crate::config::FetchPolicy;
use crate::sample::LocationSample;
use crate::DataError;

/// Receives committed fetch results.
pub trait FetchSubscriber: Send + Sync {
    /// Called after a fetch commits a new sample set.
    fn on_samples(&self, samples: &[LocationSample], downloaded: DayRange);
}

struct FetchState {
    selected: DayRange,
    downloaded: Option<DayRange>,
    samples: Vec<LocationSample>,
}

/// Fetches history for the selected day window and re-fetches on window
/// changes, debounced so only the last request in a burst executes.
///
/// Every fetch carries a monotonically increasing token; a completion
/// whose token is no longer the latest issued is discarded, so a slow
/// response for an old window can never overwrite a newer one.
pub struct LocationFetcher {
    this: Weak<Self>,
    backend: Arc<dyn LocationBackend>,
    msisdn: String,
    available: AvailableDateRange,
    policy: FetchPolicy,
    state: RwLock<FetchState>,
    /// Token of the most recently issued fetch.
    issued: AtomicU64,
    /// Pending debounced fetch, at most one at a time.
    pending: Mutex<Option<JoinHandle<()>>>,
    subscribers: RwLock<Vec<Weak<dyn FetchSubscriber>>>,
    status: watch::Sender<String>,
}

impl LocationFetcher {
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        msisdn: impl Into<String>,
        available: AvailableDateRange,
        selected: DayRange,
        policy: FetchPolicy,
        status: watch::Sender<String>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            backend,
            msisdn: msisdn.into(),
            available,
            policy,
            state: RwLock::new(FetchState {
                selected,
                downloaded: None,
                samples: Vec::new(),
            }),
            issued: AtomicU64::new(0),
            pending: Mutex::new(None),
            subscribers: RwLock::new(Vec::new()),
            status,
        })
    }

    pub fn available_range(&self) -> AvailableDateRange {
        self.available
    }

    /// Currently selected window; reflects range changes immediately.
    pub fn selected_range(&self) -> DayRange {
        self.state.read().selected
    }

    /// Window the current sample set was downloaded for.
    pub fn downloaded_range(&self) -> Option<DayRange> {
        self.state.read().downloaded
    }

    /// The last committed sample set.
    pub fn samples(&self) -> Vec<LocationSample> {
        self.state.read().samples.clone()
    }

    /// Samples whose observation window lies inside the selected range.
    pub fn visible_samples(&self) -> Vec<LocationSample> {
        let state = self.state.read();
        let from = self.available.timestamp_at(state.selected.from_index);
        let to = self.available.timestamp_at(state.selected.to_index);
        state
            .samples
            .iter()
            .filter(|sample| sample.from >= from && sample.to <= to)
            .cloned()
            .collect()
    }

    /// Register a subscriber; held weakly, dropped subscribers are pruned.
    pub fn add_subscriber(&self, subscriber: Arc<dyn FetchSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(&subscriber));
    }

    /// Fetch history for the currently selected window.
    ///
    /// Commits only if no newer fetch has been issued meanwhile; stale
    /// completions are dropped without touching state.
    pub async fn fetch(&self) -> Result<(), DataError> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let window = self.selected_range();

        self.status.send_replace("Downloading data...".to_string());
        debug!(msisdn = %self.msisdn, ?window, token, "fetching location history");

        let from = self.query_date(window.from_index);
        let to = self.query_date(window.to_index);
        let rows = self
            .backend
            .location_history(&self.msisdn, &from, &to)
            .await?;

        if self.issued.load(Ordering::SeqCst) != token {
            debug!(msisdn = %self.msisdn, token, "discarding stale fetch response");
            return Ok(());
        }

        let mut samples = Vec::with_capacity(rows.len());
        for row in &rows {
            match LocationSample::from_raw(row) {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    // Whole response is treated as malformed; state stays as it was.
                    warn!(msisdn = %self.msisdn, "received an unknown data format: {err}");
                    return Ok(());
                }
            }
        }

        let committed = {
            let mut state = self.state.write();
            state.samples = samples;
            state.downloaded = Some(window);
            state.samples.clone()
        };
        info!(msisdn = %self.msisdn, count = committed.len(), "committed location history");

        self.notify_subscribers(&committed, window);
        Ok(())
    }

    /// Record a new selected window and schedule a debounced fetch when
    /// the window leaves the downloaded range.
    ///
    /// The selection is visible to readers immediately. A pending
    /// scheduled fetch is always cancelled first, so only the last request
    /// within the debounce interval executes.
    pub fn on_range_changed(&self, new_range: DayRange) {
        let should_fetch = {
            let mut state = self.state.write();
            state.selected = new_range;
            match state.downloaded {
                Some(downloaded) => !downloaded.contains(&new_range),
                None => true,
            }
        };

        let mut pending = self.pending.lock();
        if let Some(task) = pending.take() {
            task.abort();
        }
        if !should_fetch {
            return;
        }

        let Some(fetcher) = self.this.upgrade() else {
            return;
        };
        let delay = self.policy.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = fetcher.fetch().await {
                warn!(msisdn = %fetcher.msisdn, "debounced fetch failed: {err}");
            }
        }));
    }

    fn notify_subscribers(&self, samples: &[LocationSample], downloaded: DayRange) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|weak| weak.strong_count() > 0);
        for weak in subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_samples(samples, downloaded);
            }
        }
    }

    /// Format the timestamp of a day offset as `MM/DD/YYYY`.
    fn query_date(&self, index: i64) -> String {
        match Utc
            .timestamp_millis_opt(self.available.timestamp_at(index))
            .single()
        {
            Some(dt) => dt.format("%m/%d/%Y").to_string(),
            None => String::new(),
        }
    }
}

impl Drop for LocationFetcher {
    fn drop(&mut self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }
}
