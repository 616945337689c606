//! Tier placement policy.
//!
//! Decides which tier a collection lives in, driven only by size:
//!
//! ```text
//!             save
//!              │
//!     fits sync item quota AND sync headroom?
//!         │ yes                    │ no / sync write failed
//!         ▼                        ▼
//!      ┌──────┐   promotion    ┌───────┐
//!      │ sync │ ◀───────────── │ local │  (size > local quota → rejected)
//!      └──────┘  when it fits  └───────┘
//! ```
//!
//! Promotion runs in the background and is best-effort: candidates are tried
//! smallest first, so a larger collection may wait for a later round even when
//! space was available before a smaller one consumed it.

mod promotion;

pub use promotion::{PromotionFailure, PromotionReport};

use crate::error::{Error, Result};
use crate::storage::{estimate_size, size_kb, TierStorage};
use crate::types::{Collection, Tier};

/// Practical upper bound for one collection in the sync tier.
pub const SYNC_ITEM_QUOTA: u64 = 8_000;

/// Fallback total quota of the sync tier when the store does not report one.
pub const SYNC_TOTAL_QUOTA: u64 = 102_400;

/// Fallback total quota of the local tier when the store does not report one.
pub const LOCAL_TOTAL_QUOTA: u64 = 5_242_880;

/// Byte budgets placement decisions are made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementLimits {
    pub sync_item_quota: u64,
    pub sync_total_quota: u64,
    pub local_total_quota: u64,
}

impl Default for PlacementLimits {
    fn default() -> Self {
        Self {
            sync_item_quota: SYNC_ITEM_QUOTA,
            sync_total_quota: SYNC_TOTAL_QUOTA,
            local_total_quota: LOCAL_TOTAL_QUOTA,
        }
    }
}

impl PlacementLimits {
    /// Limits for `storage`: the areas' own total quotas win, `self` fills in
    /// whatever they leave unspecified.
    pub fn for_storage(self, storage: &TierStorage) -> Self {
        Self {
            sync_item_quota: self.sync_item_quota,
            sync_total_quota: storage
                .area(Tier::Sync)
                .quota()
                .total_bytes
                .unwrap_or(self.sync_total_quota),
            local_total_quota: storage
                .area(Tier::Local)
                .quota()
                .total_bytes
                .unwrap_or(self.local_total_quota),
        }
    }
}

/// Where a collection ended up after [`PlacementPolicy::place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub tier: Tier,
    pub size_bytes: u64,
}

/// Size-driven placement and promotion between tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementPolicy {
    limits: PlacementLimits,
}

impl PlacementPolicy {
    pub fn new(limits: PlacementLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &PlacementLimits {
        &self.limits
    }

    /// The two-quota test: the collection is within the per-item quota and the
    /// sync tier stays within its total quota after adding it.
    pub fn fits_sync(&self, size: u64, sync_total: u64) -> bool {
        size <= self.limits.sync_item_quota
            && sync_total.saturating_add(size) <= self.limits.sync_total_quota
    }

    /// Place a new collection, preferring the sync tier.
    ///
    /// Any failure on the sync side falls back to local. Nothing is written
    /// when the collection is larger than the local quota.
    pub async fn place(
        &self,
        storage: &TierStorage,
        name: &str,
        collection: &Collection,
    ) -> Result<Placement> {
        let size = estimate_size(collection)?;
        tracing::debug!(collection = %name, size_kb = size_kb(size), "Placing collection");

        match self.try_place_sync(storage, name, collection, size).await {
            Ok(true) => {
                tracing::info!(collection = %name, "Saved to sync storage");
                return Ok(Placement {
                    tier: Tier::Sync,
                    size_bytes: size,
                });
            }
            Ok(false) => {
                tracing::debug!(collection = %name, "Collection does not fit in sync storage");
            }
            Err(e) => {
                tracing::warn!(
                    collection = %name,
                    error = %e,
                    "Sync storage failed, falling back to local storage"
                );
            }
        }

        if size > self.limits.local_total_quota {
            return Err(Error::CollectionTooLarge {
                size_bytes: size,
                limit_bytes: self.limits.local_total_quota,
            });
        }

        let mut local = storage.read(Tier::Local).await?;
        local.insert(name.to_string(), collection.clone());
        storage.write(Tier::Local, &local).await?;
        tracing::info!(collection = %name, "Saved to local storage");

        Ok(Placement {
            tier: Tier::Local,
            size_bytes: size,
        })
    }

    async fn try_place_sync(
        &self,
        storage: &TierStorage,
        name: &str,
        collection: &Collection,
        size: u64,
    ) -> Result<bool> {
        if size > self.limits.sync_item_quota {
            return Ok(false);
        }

        let mut sync = storage.read(Tier::Sync).await?;
        let sync_total = estimate_size(&sync)?;
        tracing::debug!(size_kb = size_kb(sync_total), "Current sync storage size");

        if !self.fits_sync(size, sync_total) {
            return Ok(false);
        }

        sync.insert(name.to_string(), collection.clone());
        storage.write(Tier::Sync, &sync).await?;
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::storage::{MemoryStorageArea, StorageArea, TierQuota};
    use std::sync::Arc;

    fn storage_with(sync: Arc<MemoryStorageArea>, local: Arc<MemoryStorageArea>) -> TierStorage {
        TierStorage::new(sync, local)
    }

    fn roomy_storage() -> (Arc<MemoryStorageArea>, Arc<MemoryStorageArea>, TierStorage) {
        let sync_quota = TierQuota {
            total_bytes: Some(SYNC_TOTAL_QUOTA),
            ..TierQuota::unlimited()
        };
        let sync = Arc::new(MemoryStorageArea::new(Tier::Sync, sync_quota));
        let local = Arc::new(MemoryStorageArea::new(Tier::Local, TierQuota::chrome_local()));
        let storage = storage_with(Arc::clone(&sync), Arc::clone(&local));
        (sync, local, storage)
    }

    #[test]
    fn test_fits_sync() {
        let policy = PlacementPolicy::default();
        assert!(policy.fits_sync(8_000, 0));
        assert!(!policy.fits_sync(8_001, 0));
        assert!(policy.fits_sync(400, 102_000));
        assert!(!policy.fits_sync(401, 102_000));
    }

    #[test]
    fn test_limits_prefer_store_quota() {
        let storage = TierStorage::new(
            Arc::new(MemoryStorageArea::new(
                Tier::Sync,
                TierQuota {
                    total_bytes: Some(50_000),
                    ..TierQuota::unlimited()
                },
            )),
            Arc::new(MemoryStorageArea::new(Tier::Local, TierQuota::unlimited())),
        );

        let limits = PlacementLimits::default().for_storage(&storage);
        assert_eq!(limits.sync_total_quota, 50_000);
        assert_eq!(limits.local_total_quota, LOCAL_TOTAL_QUOTA);
        assert_eq!(limits.sync_item_quota, SYNC_ITEM_QUOTA);
    }

    #[tokio::test]
    async fn test_small_collection_goes_to_sync() {
        let (_sync, _local, storage) = roomy_storage();
        let policy = PlacementPolicy::default();
        let collection = collection_of_size(8_000, 1);

        let placement = policy.place(&storage, "Small", &collection).await.unwrap();
        assert_eq!(placement.tier, Tier::Sync);
        assert_eq!(placement.size_bytes, 8_000);

        let (sync, local) = storage.read_both().await.unwrap();
        assert_eq!(sync.get("Small"), Some(&collection));
        assert!(local.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_item_goes_to_local_despite_headroom() {
        let (_sync, _local, storage) = roomy_storage();
        let policy = PlacementPolicy::default();
        let collection = collection_of_size(8_001, 1);

        let placement = policy.place(&storage, "Big", &collection).await.unwrap();
        assert_eq!(placement.tier, Tier::Local);

        let (sync, local) = storage.read_both().await.unwrap();
        assert!(sync.is_empty());
        assert!(local.contains_key("Big"));
    }

    #[tokio::test]
    async fn test_no_sync_headroom_goes_to_local() {
        let (_sync, _local, storage) = roomy_storage();
        storage
            .write(Tier::Sync, &mapping_of_size("Existing", 100_000))
            .await
            .unwrap();

        let placement = PlacementPolicy::default()
            .place(&storage, "Medium", &collection_of_size(2_401, 1))
            .await
            .unwrap();
        assert_eq!(placement.tier, Tier::Local);
    }

    #[tokio::test]
    async fn test_too_large_for_local_writes_nothing() {
        let (_sync, _local, storage) = roomy_storage();
        let policy = PlacementPolicy::new(PlacementLimits {
            local_total_quota: 10_000,
            ..PlacementLimits::default()
        });

        let err = policy
            .place(&storage, "Huge", &collection_of_size(10_001, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CollectionTooLarge { size_bytes: 10_001, .. }));

        let (sync, local) = storage.read_both().await.unwrap();
        assert!(sync.is_empty());
        assert!(local.is_empty());
    }

    #[tokio::test]
    async fn test_sync_failure_falls_back_to_local() {
        let (sync_area, _local, storage) = roomy_storage();
        sync_area.set_offline(true);

        let placement = PlacementPolicy::default()
            .place(&storage, "Offline", &collection_of_size(500, 1))
            .await
            .unwrap();
        assert_eq!(placement.tier, Tier::Local);
        assert!(storage.read(Tier::Local).await.unwrap().contains_key("Offline"));
    }

    #[tokio::test]
    async fn test_sync_store_rejection_falls_back_to_local() {
        // The store itself rejects the collection even though the policy's
        // estimate says it fits.
        let sync = Arc::new(MemoryStorageArea::new(
            Tier::Sync,
            TierQuota {
                per_item_bytes: Some(100),
                ..TierQuota::chrome_sync()
            },
        ));
        let local = Arc::new(MemoryStorageArea::new(Tier::Local, TierQuota::chrome_local()));
        let storage = storage_with(Arc::clone(&sync), local);

        let placement = PlacementPolicy::default()
            .place(&storage, "Rejected", &collection_of_size(500, 1))
            .await
            .unwrap();
        assert_eq!(placement.tier, Tier::Local);
        assert!(sync.get("collections").await.unwrap().is_none());
    }
}
