//! Background promotion scheduling.
//!
//! A [`PromotionTask`] owns the spawned loop that moves local collections into
//! the sync tier. It runs one round immediately, then one per interval, plus
//! one-shot rounds requested with [`PromotionTask::trigger_after`]. Dropping
//! the handle aborts the loop, so its lifetime is the owner's lifetime.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tabstash_core::{PlacementPolicy, TierStorage};

/// Handle for a running promotion loop.
pub struct PromotionTask {
    handle: JoinHandle<()>,
    triggers: mpsc::UnboundedSender<Duration>,
    rounds: watch::Receiver<u64>,
}

/// Whether the loop keeps going after a round.
#[derive(Debug, PartialEq, Eq)]
enum RoundOutcome {
    Continue,
    Halt,
}

impl PromotionTask {
    /// Spawn the loop on the current runtime.
    pub fn spawn(policy: PlacementPolicy, storage: TierStorage, every: Duration) -> Self {
        let (triggers, mut trigger_rx) = mpsc::unbounded_channel::<Duration>();
        let (rounds_tx, rounds) = watch::channel(0u64);

        info!(interval_secs = every.as_secs(), "Starting promotion checks");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut deadline: Option<Instant> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    Some(delay) = trigger_rx.recv() => {
                        debug!(delay_ms = delay.as_millis() as u64, "Promotion check requested");
                        deadline = Some(Instant::now() + delay);
                        continue;
                    }
                    _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        deadline = None;
                    }
                }

                let outcome = run_round(&policy, &storage).await;
                rounds_tx.send_modify(|n| *n += 1);
                if outcome == RoundOutcome::Halt {
                    break;
                }
            }

            info!("Promotion checks stopped");
        });

        Self {
            handle,
            triggers,
            rounds,
        }
    }

    /// Run an extra round after `delay`. A newer request replaces a pending one.
    pub fn trigger_after(&self, delay: Duration) {
        if self.triggers.send(delay).is_err() {
            debug!("Promotion loop has stopped, ignoring trigger");
        }
    }

    /// Completed round counter, for hosts that refresh after promotion.
    pub fn rounds(&self) -> watch::Receiver<u64> {
        self.rounds.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Stop the loop.
    pub fn stop(self) {
        self.handle.abort();
        debug!("Promotion task cancelled");
    }
}

impl Drop for PromotionTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_round(policy: &PlacementPolicy, storage: &TierStorage) -> RoundOutcome {
    match policy.promote(storage).await {
        Ok(report) => {
            if report.has_changes() {
                info!(
                    promoted = report.promoted.len(),
                    skipped = report.skipped.len(),
                    "Promoted collections to sync storage"
                );
            }
            if report.halts_scheduler() {
                error!(
                    failures = report.failures.len(),
                    "Sync storage rejected a collection as too large, stopping promotion checks"
                );
                return RoundOutcome::Halt;
            }
            RoundOutcome::Continue
        }
        Err(e) if e.is_per_item_quota() => {
            error!(error = %e, "Promotion check failed permanently");
            RoundOutcome::Halt
        }
        Err(e) => {
            warn!(error = %e, "Promotion check failed");
            RoundOutcome::Continue
        }
    }
}
