//! Backend collaborator traits and wire payload types

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::DataError;

/// Raw payload of the availability status query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvailabilityStatus {
    /// `1` means history has been materialized.
    pub status: u8,
}

impl AvailabilityStatus {
    pub fn is_ready(&self) -> bool {
        self.status == 1
    }
}

/// Raw payload of the date range query, ISO-8601 date strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDateRange {
    pub start_date: String,
    pub end_date: String,
}

/// One raw history row: `[fromIso, toIso, lat, lon]`.
///
/// The history endpoint does not supply an accuracy.
pub type RawLocationRow = (String, String, f64, f64);

/// Read side of the location history service.
#[async_trait]
pub trait LocationBackend: Send + Sync {
    /// Ask whether history for the subscriber has been materialized yet.
    async fn availability_status(&self, msisdn: &str) -> Result<AvailabilityStatus, DataError>;

    /// Fetch the full span of available data.
    async fn date_range(&self, msisdn: &str) -> Result<RawDateRange, DataError>;

    /// Fetch history rows between two `MM/DD/YYYY` dates, inclusive.
    async fn location_history(
        &self,
        msisdn: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawLocationRow>, DataError>;
}

/// Remote persistence for settings documents.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Read the document for `(resource, document_id)`.
    async fn read_settings(
        &self,
        resource: &str,
        document_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, DataError>;

    /// Persist a full document, replacing the remote copy.
    async fn write_settings(
        &self,
        resource: &str,
        document_id: &str,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DataError>;
}

/// Parse a backend timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, the second-less `2024-01-01T00:00Z` variant some
/// endpoints emit, and bare dates (midnight UTC).
pub fn parse_timestamp(value: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%#z") {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    Err(DataError::MalformedResponse(format!(
        "unparseable timestamp: {value:?}"
    )))
}
