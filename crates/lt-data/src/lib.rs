//! Backend collaborators and engines for the location tracking platform

pub mod backend;
pub mod config;
pub mod fetcher;
pub mod poller;
pub mod resolver;
pub mod sample;
pub mod settings;

use thiserror::Error;

// Re-exports
pub use backend::{
    parse_timestamp, AvailabilityStatus, LocationBackend, RawDateRange, RawLocationRow,
    SettingsBackend,
};
pub use config::{FetchPolicy, PollPolicy, TrackerConfig};
pub use fetcher::{FetchSubscriber, LocationFetcher};
pub use poller::AvailabilityPoller;
pub use resolver::{RangeResolver, ResolvedRange};
pub use sample::{LocationSample, DEFAULT_ACCURACY};
pub use settings::{SettingsMap, SettingsPath, SettingsStore};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("settings persistence failed: {0}")]
    Persistence(String),

    #[error("availability polling gave up after {0} attempts")]
    PollExhausted(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
