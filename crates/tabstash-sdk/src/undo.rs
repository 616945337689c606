//! Undo notices for deletions.
//!
//! Every deletion gets its own countdown. The notice can restore the deleted
//! entry until the countdown reaches zero; expiry, undo and drop all stop the
//! countdown task.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use tabstash_core::{RecycleBin, RecycleBinEntry, RestoreOutcome};

use crate::error::{StashError, StashResult};

/// A time-limited offer to restore one recycle bin entry.
pub struct UndoNotice {
    entry: RecycleBinEntry,
    recycle_bin: RecycleBin,
    remaining: watch::Receiver<u64>,
    countdown: JoinHandle<()>,
}

impl UndoNotice {
    /// Open a notice for `entry` that stays active for `window` (whole seconds).
    pub fn start(recycle_bin: RecycleBin, entry: RecycleBinEntry, window: Duration) -> Self {
        let seconds = window.as_secs();
        let (tx, remaining) = watch::channel(seconds);

        let countdown = tokio::spawn(async move {
            let mut left = seconds;
            while left > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                left -= 1;
                if tx.send(left).is_err() {
                    break;
                }
            }
        });

        Self {
            entry,
            recycle_bin,
            remaining,
            countdown,
        }
    }

    pub fn entry(&self) -> &RecycleBinEntry {
        &self.entry
    }

    /// Text for the notice, e.g. `"Work" moved to recycle bin`.
    pub fn message(&self) -> String {
        format!("\"{}\" moved to recycle bin", self.entry.display_name())
    }

    pub fn seconds_remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Countdown updates, one per second.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    pub fn is_active(&self) -> bool {
        self.seconds_remaining() > 0
    }

    /// Restore the entry if the notice is still active.
    pub async fn undo(self) -> StashResult<RestoreOutcome> {
        if !self.is_active() {
            return Err(StashError::UndoExpired);
        }
        self.countdown.abort();

        let outcome = self.recycle_bin.restore(&self.entry).await?;
        tracing::info!(name = %self.entry.display_name(), "Undid deletion");
        Ok(outcome)
    }
}

impl Drop for UndoNotice {
    fn drop(&mut self) {
        self.countdown.abort();
    }
}
