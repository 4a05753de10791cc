//! Demo entry point for the location tracking engine

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use lt_core::DayRange;
use lt_data::{PollPolicy, SettingsPath, SettingsStore, TrackerConfig};
use lt_map::TrackerSession;

mod demo;

use demo::{DemoBackend, LogSurface};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let msisdn = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "94771234567".to_string());

    let backend = Arc::new(DemoBackend::new());
    let config = TrackerConfig {
        // Short retry so the demo does not sit through the production delay.
        poll: PollPolicy {
            retry_delay: Duration::from_millis(500),
            max_attempts: 10,
        },
        ..TrackerConfig::default()
    };

    let session = TrackerSession::new(backend.clone(), msisdn, config);
    session.attach_surface(Arc::new(LogSurface::new()));

    // Mirror status transitions to the log as the pipeline progresses.
    let mut status = session.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            info!(status = %*status.borrow_and_update());
        }
    });

    session.clone().start().await?;
    info!(markers = session.rendered_markers(), "initial window rendered");

    // Narrow the window; this redraws from cached samples immediately.
    session.set_selected_range(DayRange::new(4, 6));
    tokio::time::sleep(Duration::from_secs(3)).await;
    info!(markers = session.rendered_markers(), "narrowed window rendered");

    // Settings round trip against the same backend.
    let store = SettingsStore::new(
        backend,
        SettingsPath::new("dataStore", "tracker", "preferences"),
        Default::default(),
    );
    store.initialize().await;

    let subscription = store.subscribe_key("refresh_interval", |value| {
        info!(%value, "refresh interval changed");
    });
    store.set("refresh_interval", json!(30)).await?;
    store.unsubscribe(subscription);

    info!("demo complete");
    Ok(())
}
