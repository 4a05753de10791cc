//! Date range resolution

use std::sync::Arc;

use tracing::debug;

use lt_core::{AvailableDateRange, DayRange};

use crate::backend::{parse_timestamp, LocationBackend};
use crate::DataError;

/// Outcome of range resolution: the full span plus the initial selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub available: AvailableDateRange,
    pub selected: DayRange,
}

/// Determines the available data span and the initial selected window,
/// once per session, after availability has been confirmed.
pub struct RangeResolver {
    backend: Arc<dyn LocationBackend>,
    window_days: i64,
}

impl RangeResolver {
    /// Width of the default trailing selection, days.
    pub const DEFAULT_WINDOW_DAYS: i64 = 6;

    pub fn new(backend: Arc<dyn LocationBackend>) -> Self {
        Self {
            backend,
            window_days: Self::DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    /// Fetch the span and derive the trailing default selection.
    ///
    /// Failure resolves nothing; the caller stays in its loading phase.
    pub async fn resolve(&self, msisdn: &str) -> Result<ResolvedRange, DataError> {
        let raw = self.backend.date_range(msisdn).await?;
        let start = parse_timestamp(&raw.start_date)?;
        let end = parse_timestamp(&raw.end_date)?;

        let available = AvailableDateRange { start, end };
        let selected = available.trailing_window(self.window_days);
        debug!(msisdn, start, end, "resolved available date range");

        Ok(ResolvedRange {
            available,
            selected,
        })
    }
}
