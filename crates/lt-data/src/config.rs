//! Tunable timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Availability polling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between poll attempts.
    pub retry_delay: Duration,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Fetch debounce knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Quiet period after the last range change before fetching.
    pub debounce: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
        }
    }
}

/// Bundled tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub poll: PollPolicy,
    pub fetch: FetchPolicy,
    /// Width of the initially selected trailing window, days.
    pub default_window_days: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            fetch: FetchPolicy::default(),
            default_window_days: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tuned_constants() {
        let config = TrackerConfig::default();
        assert_eq!(config.poll.retry_delay, Duration::from_secs(5));
        assert_eq!(config.fetch.debounce, Duration::from_secs(2));
        assert_eq!(config.default_window_days, 6);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"default_window_days": 3}"#).unwrap();
        assert_eq!(config.default_window_days, 3);
        assert_eq!(config.poll.max_attempts, 60);
    }
}
