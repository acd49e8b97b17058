// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Periodic trigger.
//!
//! Runs a callback every `interval` until shutdown is signaled. Errors the
//! callback returns are logged and never stop the loop.
//!
//! Callbacks run one at a time on the trigger task. A tick that comes due
//! while a callback is still running is skipped rather than queued, so a slow
//! cycle never overlaps the next one and never causes a burst afterwards.

use crate::error::RelayError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

/// Run `action` every `interval` until `shutdown_rx` turns `true` (or its
/// sender is dropped).
///
/// The first run happens one interval after the call, or immediately when
/// `run_immediately` is set.
pub async fn run_every<F, Fut>(
    interval: Duration,
    run_immediately: bool,
    mut action: F,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Vec<RelayError>>,
{
    let span = tracing::info_span!("trigger", interval_ms = interval.as_millis() as u64);

    async move {
        // Mark initial shutdown value as seen so changed() only fires on actual changes
        let _ = shutdown_rx.borrow_and_update();
        if *shutdown_rx.borrow() {
            return;
        }

        let first = if run_immediately {
            Instant::now()
        } else {
            Instant::now() + interval
        };
        let mut timer = tokio::time::interval_at(first, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Starting periodic trigger");
        let mut runs: u64 = 0;

        loop {
            tokio::select! {
                biased;

                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!(runs, "Shutdown signal received, stopping trigger");
                        break;
                    }
                    continue;
                }

                _ = timer.tick() => {}
            }

            runs += 1;
            let errors = action().await;
            if errors.is_empty() {
                debug!(run = runs, "Triggered run completed");
            } else {
                for error in &errors {
                    warn!(
                        run = runs,
                        kind = error.kind(),
                        retryable = error.is_retryable(),
                        error = %error,
                        "Triggered run reported error"
                    );
                }
            }
        }
    }
    .instrument(span)
    .await
}
