//! Availability polling

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::LocationBackend;
use crate::config::PollPolicy;
use crate::DataError;

/// Polls the status query until a subscriber's history is materialized.
///
/// Both "not ready yet" and transport failures reschedule the next attempt
/// after `PollPolicy::retry_delay`, bounded by `PollPolicy::max_attempts`.
pub struct AvailabilityPoller {
    backend: Arc<dyn LocationBackend>,
    policy: PollPolicy,
    status: watch::Sender<String>,
}

impl AvailabilityPoller {
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        policy: PollPolicy,
        status: watch::Sender<String>,
    ) -> Self {
        Self {
            backend,
            policy,
            status,
        }
    }

    /// Poll until the backend reports data ready.
    ///
    /// Reaching availability is terminal. Once the attempt budget is spent
    /// `PollExhausted` is returned instead of stalling silently.
    pub async fn wait_until_available(&self, msisdn: &str) -> Result<(), DataError> {
        for attempt in 1..=self.policy.max_attempts {
            self.status
                .send_replace("Checking for Availability".to_string());

            match self.backend.availability_status(msisdn).await {
                Ok(status) if status.is_ready() => {
                    info!(msisdn, "location data available");
                    self.status
                        .send_replace("Querying for location data...".to_string());
                    return Ok(());
                }
                Ok(_) => {
                    debug!(msisdn, attempt, "data not available yet");
                    self.status
                        .send_replace("Data not available yet, retrying...".to_string());
                }
                Err(err) => {
                    warn!(msisdn, attempt, "availability query failed: {err}");
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        Err(DataError::PollExhausted(self.policy.max_attempts))
    }
}
