//! In-process demo backend and map surface
//!
//! Stands in for the real services so the pipeline can be exercised
//! end to end without network access.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;

use lt_data::{
    AvailabilityStatus, DataError, LocationBackend, RawDateRange, RawLocationRow,
    SettingsBackend, SettingsMap,
};
use lt_map::{GeoBounds, MapSurface, OverlayId};

/// Serves canned availability, ranges and history rows.
pub struct DemoBackend {
    polled: AtomicBool,
    settings: Mutex<SettingsMap>,
}

impl DemoBackend {
    pub fn new() -> Self {
        let mut settings = SettingsMap::new();
        settings.insert("refresh_interval".to_string(), json!(60));
        Self {
            polled: AtomicBool::new(false),
            settings: Mutex::new(settings),
        }
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationBackend for DemoBackend {
    async fn availability_status(&self, _msisdn: &str) -> Result<AvailabilityStatus, DataError> {
        // Report not-ready once so the polling loop is visible in the logs.
        let ready = self.polled.swap(true, Ordering::SeqCst);
        Ok(AvailabilityStatus {
            status: u8::from(ready),
        })
    }

    async fn date_range(&self, _msisdn: &str) -> Result<RawDateRange, DataError> {
        Ok(RawDateRange {
            start_date: "2024-01-01T00:00:00Z".to_string(),
            end_date: "2024-01-10T00:00:00Z".to_string(),
        })
    }

    async fn location_history(
        &self,
        _msisdn: &str,
        _from: &str,
        _to: &str,
    ) -> Result<Vec<RawLocationRow>, DataError> {
        // Kandy, Colombo and Galle, spread over the selected window.
        Ok(vec![
            (
                "2024-01-05T08:00:00Z".to_string(),
                "2024-01-05T09:30:00Z".to_string(),
                7.2906,
                80.6337,
            ),
            (
                "2024-01-07T12:00:00Z".to_string(),
                "2024-01-07T13:00:00Z".to_string(),
                6.9271,
                79.8612,
            ),
            (
                "2024-01-08T18:00:00Z".to_string(),
                "2024-01-08T19:00:00Z".to_string(),
                6.0535,
                80.2210,
            ),
        ])
    }
}

#[async_trait]
impl SettingsBackend for DemoBackend {
    async fn read_settings(
        &self,
        _resource: &str,
        _document_id: &str,
    ) -> Result<SettingsMap, DataError> {
        Ok(self.settings.lock().clone())
    }

    async fn write_settings(
        &self,
        _resource: &str,
        _document_id: &str,
        data: &SettingsMap,
    ) -> Result<(), DataError> {
        *self.settings.lock() = data.clone();
        Ok(())
    }
}

/// Map surface that narrates every drawing operation to the log.
pub struct LogSurface {
    next_id: AtomicU64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> OverlayId {
        OverlayId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for LogSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSurface for LogSurface {
    fn add_marker(&self, lat: f64, lon: f64) -> OverlayId {
        let id = self.next_id();
        info!(id = id.0, lat, lon, "marker added");
        id
    }

    fn add_circle(&self, radius_m: f64, fill_color: &str) -> OverlayId {
        let id = self.next_id();
        info!(id = id.0, radius_m, fill_color, "circle added");
        id
    }

    fn bind_center(&self, circle: OverlayId, marker: OverlayId) {
        info!(circle = circle.0, marker = marker.0, "circle bound to marker");
    }

    fn remove_overlay(&self, id: OverlayId) {
        info!(id = id.0, "overlay removed");
    }

    fn fit_bounds(&self, bounds: GeoBounds, padding_px: u32) -> anyhow::Result<()> {
        info!(
            south = bounds.south,
            west = bounds.west,
            north = bounds.north,
            east = bounds.east,
            padding_px,
            "viewport fitted"
        );
        Ok(())
    }
}
