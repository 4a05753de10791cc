//! Location sample model

use serde::{Deserialize, Serialize};

use crate::backend::{parse_timestamp, RawLocationRow};
use crate::DataError;

/// Accuracy assigned when the history endpoint does not supply one, meters.
pub const DEFAULT_ACCURACY: f64 = 500.0;

/// A single observed subscriber position.
///
/// Immutable once built from a raw backend row; every fetch rebuilds its
/// sample set from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Start of the observation, epoch millis.
    pub from: i64,
    /// End of the observation, epoch millis.
    pub to: i64,
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in meters; `0.0` means unknown.
    pub accuracy: f64,
}

impl LocationSample {
    /// Build a sample from a raw `[fromIso, toIso, lat, lon]` row.
    pub fn from_raw(row: &RawLocationRow) -> Result<Self, DataError> {
        Ok(Self {
            from: parse_timestamp(&row.0)?,
            to: parse_timestamp(&row.1)?,
            lat: row.2,
            lon: row.3,
            accuracy: DEFAULT_ACCURACY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_defaults_accuracy() {
        let row = (
            "2024-01-01T00:00Z".to_string(),
            "2024-01-01T01:00Z".to_string(),
            7.1,
            80.2,
        );
        let sample = LocationSample::from_raw(&row).unwrap();
        assert_eq!(sample.lat, 7.1);
        assert_eq!(sample.lon, 80.2);
        assert_eq!(sample.accuracy, 500.0);
        assert_eq!(sample.to - sample.from, 3_600_000);
    }

    #[test]
    fn test_from_raw_rejects_bad_dates() {
        let row = ("bogus".to_string(), "also bogus".to_string(), 1.0, 2.0);
        assert!(LocationSample::from_raw(&row).is_err());
    }
}
