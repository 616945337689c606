//! Recycle bin.
//!
//! Soft-delete log kept in the local tier under `recycleBin`. Every delete
//! appends an entry stamped with its deletion time; entries are restored on
//! request or purged once they are older than the retention window. The log is
//! never synchronized.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::storage::TierStorage;
use crate::types::{Collection, RecycleBinEntry, RecycledItem, Tier};

/// Default retention window for deleted items.
pub const RETENTION_DAYS: i64 = 7;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// What a restore put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A whole collection was written back under its name.
    Collection { name: String, tier: Tier },
    /// A tab was appended to a collection. `created` is true when the
    /// collection had to be recreated.
    Tab {
        collection_name: String,
        tier: Tier,
        created: bool,
    },
}

/// Soft-delete log with time-based expiry.
#[derive(Clone)]
pub struct RecycleBin {
    storage: TierStorage,
    clock: Arc<dyn Clock>,
    retention_ms: i64,
}

impl RecycleBin {
    pub fn new(storage: TierStorage, clock: Arc<dyn Clock>) -> Self {
        Self::with_retention_days(storage, clock, RETENTION_DAYS)
    }

    pub fn with_retention_days(storage: TierStorage, clock: Arc<dyn Clock>, days: i64) -> Self {
        Self {
            storage,
            clock,
            retention_ms: days * DAY_MS,
        }
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Append a deleted item to the log, stamped with the current time.
    pub async fn add(&self, item: RecycledItem, tier: Tier) -> Result<RecycleBinEntry> {
        let mut entries = self.storage.read_recycle_bin().await?;

        // deletedAt identifies the entry, keep it unique within the log.
        let mut deleted_at = self.clock.now_ms();
        while entries.iter().any(|e| e.deleted_at == deleted_at) {
            deleted_at += 1;
        }

        let entry = RecycleBinEntry {
            item,
            is_sync: tier.is_sync(),
            deleted_at,
        };
        entries.push(entry.clone());
        self.storage.write_recycle_bin(&entries).await?;

        tracing::info!(
            name = %entry.display_name(),
            tier = %tier,
            deleted_at = entry.deleted_at,
            "Moved item to recycle bin"
        );
        Ok(entry)
    }

    /// Put an entry's payload back into its tier and drop it from the log.
    ///
    /// The payload is written before the log entry is removed, so a failure in
    /// between leaves the item recoverable rather than lost.
    pub async fn restore(&self, entry: &RecycleBinEntry) -> Result<RestoreOutcome> {
        let entries = self.storage.read_recycle_bin().await?;
        if !entries.iter().any(|e| e.deleted_at == entry.deleted_at) {
            return Err(Error::EntryNotFound {
                deleted_at: entry.deleted_at,
            });
        }

        let tier = entry.tier();
        let mut collections = self.storage.read(tier).await?;
        let outcome = match &entry.item {
            RecycledItem::Collection { name, tabs } => {
                collections.insert(name.clone(), tabs.clone());
                RestoreOutcome::Collection {
                    name: name.clone(),
                    tier,
                }
            }
            RecycledItem::Tab {
                collection_name,
                tab,
            } => {
                let now = self.clock.now_ms();
                let created = !collections.contains_key(collection_name);
                let collection = collections
                    .entry(collection_name.clone())
                    .or_insert_with(|| Collection::new(Vec::new(), now));
                collection.tabs.push(tab.clone());
                collection.last_modified = now;
                RestoreOutcome::Tab {
                    collection_name: collection_name.clone(),
                    tier,
                    created,
                }
            }
        };
        self.storage.write(tier, &collections).await?;

        let remaining: Vec<RecycleBinEntry> = entries
            .into_iter()
            .filter(|e| e.deleted_at != entry.deleted_at)
            .collect();
        self.storage.write_recycle_bin(&remaining).await?;

        tracing::info!(name = %entry.display_name(), tier = %tier, "Restored item");
        Ok(outcome)
    }

    /// Remove entries whose age has reached the retention window.
    ///
    /// Returns how many were purged. Persists only when something expired.
    pub async fn cleanup(&self) -> Result<usize> {
        let entries = self.storage.read_recycle_bin().await?;
        let now = self.clock.now_ms();
        let before = entries.len();

        let kept: Vec<RecycleBinEntry> = entries
            .into_iter()
            .filter(|entry| {
                let expired = entry.is_expired(now, self.retention_ms);
                if expired {
                    tracing::debug!(name = %entry.display_name(), "Removing expired item");
                }
                !expired
            })
            .collect();

        let purged = before - kept.len();
        if purged > 0 {
            self.storage.write_recycle_bin(&kept).await?;
            tracing::info!(count = purged, "Cleaned up expired recycle bin items");
        }
        Ok(purged)
    }

    /// Entries newest first.
    pub async fn list(&self) -> Result<Vec<RecycleBinEntry>> {
        let mut entries = self.storage.read_recycle_bin().await?;
        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(entries)
    }

    /// Whole days until `entry` expires.
    pub fn days_remaining(&self, entry: &RecycleBinEntry) -> i64 {
        entry.days_remaining(self.clock.now_ms(), self.retention_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Protocol, TabRecord};

    const NOW: i64 = 1_700_000_000_000;

    fn tab(u: &str) -> TabRecord {
        TabRecord {
            u: u.into(),
            t: format!("Title of {u}"),
            f: "favicon.ico".into(),
            p: Protocol::Https,
        }
    }

    fn setup() -> (TierStorage, Arc<ManualClock>, RecycleBin) {
        let storage = TierStorage::in_memory();
        let clock = Arc::new(ManualClock::new(NOW));
        let bin = RecycleBin::new(storage.clone(), clock.clone());
        (storage, clock, bin)
    }

    #[tokio::test]
    async fn test_add_stamps_and_persists() {
        let (storage, _clock, bin) = setup();
        let entry = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "Work".into(),
                    tab: tab("a.com"),
                },
                Tier::Sync,
            )
            .await
            .unwrap();

        assert_eq!(entry.deleted_at, NOW);
        assert!(entry.is_sync);
        assert_eq!(storage.read_recycle_bin().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_deleted_at_unique() {
        let (_storage, _clock, bin) = setup();
        let first = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab("a.com"),
                },
                Tier::Local,
            )
            .await
            .unwrap();
        let second = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab("b.com"),
                },
                Tier::Local,
            )
            .await
            .unwrap();
        assert_ne!(first.deleted_at, second.deleted_at);
    }

    #[tokio::test]
    async fn test_restore_collection_overwrites() {
        let (storage, _clock, bin) = setup();
        let original = Collection::new(vec![tab("a.com"), tab("b.com")], 5);
        let entry = bin
            .add(
                RecycledItem::Collection {
                    name: "Work".into(),
                    tabs: original.clone(),
                },
                Tier::Local,
            )
            .await
            .unwrap();

        let mut local = storage.read(Tier::Local).await.unwrap();
        local.insert("Work".into(), Collection::new(vec![tab("other.com")], 9));
        storage.write(Tier::Local, &local).await.unwrap();

        let outcome = bin.restore(&entry).await.unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::Collection {
                name: "Work".into(),
                tier: Tier::Local
            }
        );
        assert_eq!(storage.read(Tier::Local).await.unwrap()["Work"], original);
        assert!(bin.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_tab_recreates_collection() {
        let (storage, _clock, bin) = setup();
        let entry = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "Gone".into(),
                    tab: tab("a.com"),
                },
                Tier::Sync,
            )
            .await
            .unwrap();

        let outcome = bin.restore(&entry).await.unwrap();
        assert!(matches!(outcome, RestoreOutcome::Tab { created: true, .. }));

        let sync = storage.read(Tier::Sync).await.unwrap();
        assert_eq!(sync["Gone"].tabs, vec![tab("a.com")]);
        assert_eq!(sync["Gone"].version, "1.0");
    }

    #[tokio::test]
    async fn test_restore_twice_fails() {
        let (_storage, _clock, bin) = setup();
        let entry = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab("a.com"),
                },
                Tier::Local,
            )
            .await
            .unwrap();

        bin.restore(&entry).await.unwrap();
        let err = bin.restore(&entry).await.unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { deleted_at } if deleted_at == NOW));
    }

    #[tokio::test]
    async fn test_cleanup_boundary_is_inclusive() {
        let (storage, clock, bin) = setup();
        let retention = bin.retention_ms();

        let at_boundary = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab("old.com"),
                },
                Tier::Local,
            )
            .await
            .unwrap();
        clock.advance(1);
        let fresh = bin
            .add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab("new.com"),
                },
                Tier::Local,
            )
            .await
            .unwrap();

        clock.set(at_boundary.deleted_at + retention);
        assert_eq!(bin.cleanup().await.unwrap(), 1);
        assert_eq!(storage.read_recycle_bin().await.unwrap(), vec![fresh.clone()]);

        // Nothing more to purge: no write, same content.
        assert_eq!(bin.cleanup().await.unwrap(), 0);

        clock.set(fresh.deleted_at + retention + 1);
        assert_eq!(bin.cleanup().await.unwrap(), 1);
        assert!(bin.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_storage, clock, bin) = setup();
        for u in ["a.com", "b.com", "c.com"] {
            bin.add(
                RecycledItem::Tab {
                    collection_name: "W".into(),
                    tab: tab(u),
                },
                Tier::Local,
            )
            .await
            .unwrap();
            clock.advance(1_000);
        }

        let listed: Vec<i64> = bin.list().await.unwrap().iter().map(|e| e.deleted_at).collect();
        assert_eq!(listed, vec![NOW + 2_000, NOW + 1_000, NOW]);
        assert_eq!(bin.days_remaining(&bin.list().await.unwrap()[0]), 7);
    }
}
