//! Background promotion of local collections into the sync tier.

use super::PlacementPolicy;
use crate::error::{Error, Result};
use crate::storage::{estimate_size, size_kb, TierStorage};
use crate::types::{Collection, Tier};

/// A candidate that could not be moved because a write failed.
#[derive(Debug)]
pub struct PromotionFailure {
    pub name: String,
    pub error: Error,
}

/// Result of one promotion round.
#[derive(Debug, Default)]
pub struct PromotionReport {
    /// Collections moved from local to sync, in the order they were moved.
    pub promoted: Vec<String>,
    /// Collections that did not fit this round.
    pub skipped: Vec<String>,
    /// Collections whose move failed (non-fatal for the round).
    pub failures: Vec<PromotionFailure>,
}

impl PromotionReport {
    /// Check if any collection changed tier.
    pub fn has_changes(&self) -> bool {
        !self.promoted.is_empty()
    }

    /// A per-item quota rejection will not go away by retrying; the scheduler
    /// stops when a round reports one.
    pub fn halts_scheduler(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_per_item_quota())
    }
}

struct Candidate {
    name: String,
    collection: Collection,
    size: u64,
}

impl PlacementPolicy {
    /// Move local collections into the sync tier while they fit.
    ///
    /// Candidates are ordered by ascending size, then most recently modified
    /// first. Each move writes the enlarged sync mapping before removing the
    /// collection from local, so a failure never loses data (at worst the
    /// collection briefly exists in both tiers). The sync baseline is
    /// recomputed after every move.
    pub async fn promote(&self, storage: &TierStorage) -> Result<PromotionReport> {
        let mut report = PromotionReport::default();
        let (mut sync, mut local) = storage.read_both().await?;

        if local.is_empty() {
            return Ok(report);
        }

        let mut sync_total = estimate_size(&sync)?;
        tracing::debug!(
            sync_kb = size_kb(sync_total),
            available_kb = size_kb(self.limits.sync_total_quota.saturating_sub(sync_total)),
            "Checking local collections for promotion"
        );

        let mut candidates = local
            .iter()
            .map(|(name, collection)| {
                Ok(Candidate {
                    name: name.clone(),
                    collection: collection.clone(),
                    size: estimate_size(collection)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        candidates.sort_by(|a, b| {
            a.size
                .cmp(&b.size)
                .then(b.collection.last_modified.cmp(&a.collection.last_modified))
                .then(a.name.cmp(&b.name))
        });

        for candidate in candidates {
            if !self.fits_sync(candidate.size, sync_total) {
                tracing::debug!(collection = %candidate.name, size = candidate.size, "Skipping, does not fit");
                report.skipped.push(candidate.name);
                continue;
            }

            let mut updated = sync.clone();
            updated.insert(candidate.name.clone(), candidate.collection);
            let new_total = estimate_size(&updated)?;
            if new_total > self.limits.sync_total_quota {
                tracing::debug!(collection = %candidate.name, "Skipping, would exceed quota");
                report.skipped.push(candidate.name);
                continue;
            }

            if let Err(error) = storage.write(Tier::Sync, &updated).await {
                tracing::warn!(collection = %candidate.name, error = %error, "Failed to move to sync");
                report.failures.push(PromotionFailure {
                    name: candidate.name,
                    error,
                });
                continue;
            }
            sync = updated;
            sync_total = new_total;

            let mut remaining = local.clone();
            remaining.remove(&candidate.name);
            if let Err(error) = storage.write(Tier::Local, &remaining).await {
                tracing::warn!(
                    collection = %candidate.name,
                    error = %error,
                    "Moved to sync but failed to remove local copy"
                );
                report.failures.push(PromotionFailure {
                    name: candidate.name,
                    error,
                });
                continue;
            }
            local = remaining;

            tracing::info!(collection = %candidate.name, "Moved to sync storage");
            report.promoted.push(candidate.name);
        }

        Ok(report)
    }
}
