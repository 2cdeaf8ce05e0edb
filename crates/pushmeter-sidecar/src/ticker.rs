//! Periodic report loop.
//!
//! Fires `report()` once per cadence until the shared cancellation flag flips
//! to `true` (or its sender is dropped). The first report happens one cadence
//! after start.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::telemetry::MetricReporter;

/// Run until cancelled. Returns how many reports were fired.
pub async fn run_ticker(
    reporter: Arc<MetricReporter>,
    cadence: Duration,
    mut cancel: watch::Receiver<bool>,
) -> u64 {
    let mut interval = time::interval_at(Instant::now() + cadence, cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut fired: u64 = 0;
    loop {
        if *cancel.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;

            changed = cancel.changed() => {
                if changed.is_err() {
                    tracing::debug!("cancellation sender dropped; ticker exiting");
                    break;
                }
            }
            _ = interval.tick() => {
                reporter.report().await;
                fired += 1;
                tracing::info!(fired, "tick");
            }
        }
    }

    tracing::info!(fired, "ticker stopped");
    fired
}
