//! Tracking session orchestration
//!
//! Wires the availability poller, range resolver, location fetcher and
//! marker reconciler together for one subscriber.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{info, warn};

use lt_core::DayRange;
use lt_data::{
    AvailabilityPoller, DataError, FetchSubscriber, LocationBackend, LocationFetcher,
    LocationSample, RangeResolver, TrackerConfig,
};

use crate::reconciler::MarkerReconciler;
use crate::surface::MapSurface;

/// Phases a session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for backend data to materialize.
    CheckingAvailability,
    /// Availability confirmed; range or first window still loading.
    Loading,
    /// First window downloaded; markers are live.
    Ready,
}

/// Drives availability polling, range resolution, history fetching and
/// marker reconciliation for one subscriber.
///
/// A pipeline failure leaves the phase frozen where it was; callers see a
/// stalled loading indicator, not an error screen.
pub struct TrackerSession {
    msisdn: String,
    backend: Arc<dyn LocationBackend>,
    config: TrackerConfig,
    phase: RwLock<SessionPhase>,
    fetcher: RwLock<Option<Arc<LocationFetcher>>>,
    reconciler: RwLock<MarkerReconciler>,
    status_tx: watch::Sender<String>,
    status_rx: watch::Receiver<String>,
}

impl TrackerSession {
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        msisdn: impl Into<String>,
        config: TrackerConfig,
    ) -> Arc<Self> {
        let msisdn = msisdn.into();
        let (status_tx, status_rx) = watch::channel(format!("Tracing {msisdn}..."));
        Arc::new(Self {
            msisdn,
            backend,
            config,
            phase: RwLock::new(SessionPhase::CheckingAvailability),
            fetcher: RwLock::new(None),
            reconciler: RwLock::new(MarkerReconciler::new()),
            status_tx,
            status_rx,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.read()
    }

    /// Watch channel carrying the human-readable status line.
    pub fn status(&self) -> watch::Receiver<String> {
        self.status_rx.clone()
    }

    /// Attach the drawing surface and draw whatever is already visible.
    pub fn attach_surface(&self, surface: Arc<dyn MapSurface>) {
        self.reconciler.write().attach_surface(surface);
        self.reconcile_visible();
    }

    /// Run the availability → range → first fetch pipeline.
    pub async fn start(self: Arc<Self>) -> Result<(), DataError> {
        let poller = AvailabilityPoller::new(
            Arc::clone(&self.backend),
            self.config.poll.clone(),
            self.status_tx.clone(),
        );
        poller.wait_until_available(&self.msisdn).await?;
        *self.phase.write() = SessionPhase::Loading;

        let resolver = RangeResolver::new(Arc::clone(&self.backend))
            .with_window_days(self.config.default_window_days);
        let resolved = resolver.resolve(&self.msisdn).await?;

        let fetcher = LocationFetcher::new(
            Arc::clone(&self.backend),
            self.msisdn.clone(),
            resolved.available,
            resolved.selected,
            self.config.fetch.clone(),
            self.status_tx.clone(),
        );
        fetcher.add_subscriber(Arc::clone(&self) as Arc<dyn FetchSubscriber>);
        *self.fetcher.write() = Some(Arc::clone(&fetcher));

        fetcher.fetch().await?;
        *self.phase.write() = SessionPhase::Ready;
        info!(msisdn = %self.msisdn, "tracking session ready");
        Ok(())
    }

    /// Forward a slider change.
    ///
    /// The visible marker set updates immediately from already-downloaded
    /// samples; a network fetch follows (debounced) only when the window
    /// leaves the downloaded range.
    pub fn set_selected_range(&self, range: DayRange) {
        let fetcher = self.fetcher.read().clone();
        match fetcher {
            Some(fetcher) => {
                fetcher.on_range_changed(range);
                self.reconcile_visible();
            }
            None => warn!(msisdn = %self.msisdn, "range change before ranges resolved"),
        }
    }

    pub fn selected_range(&self) -> Option<DayRange> {
        self.fetcher.read().as_ref().map(|f| f.selected_range())
    }

    /// Number of overlay pairs currently on the map.
    pub fn rendered_markers(&self) -> usize {
        self.reconciler.read().rendered_count()
    }

    fn reconcile_visible(&self) {
        let fetcher = self.fetcher.read().clone();
        if let Some(fetcher) = fetcher {
            let visible = fetcher.visible_samples();
            self.reconciler.write().reconcile(&visible);
        }
    }
}

impl FetchSubscriber for TrackerSession {
    fn on_samples(&self, _samples: &[LocationSample], _downloaded: DayRange) {
        self.reconcile_visible();
    }
}
