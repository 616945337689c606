//! Collection store.
//!
//! User-facing operations over the collection mappings of both tiers. Deletes
//! are soft: the removed content goes to the [`RecycleBin`] first.

use std::sync::Arc;

use crate::clock::Clock;
use crate::codec::{compress_all, compressed_key};
use crate::error::{Error, Result};
use crate::placement::PlacementPolicy;
use crate::recycle::RecycleBin;
use crate::storage::TierStorage;
use crate::types::{BrowserTab, Collection, CollectionMap, RecycleBinEntry, RecycledItem, Tier};

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub name: String,
    pub tier: Tier,
    pub tab_count: usize,
    pub size_bytes: u64,
}

/// Result of removing one tab from a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDeletion {
    /// Recycle bin entry holding the removed tab.
    pub entry: RecycleBinEntry,
    /// The tab was the last one and the collection is gone too.
    pub collection_removed: bool,
}

/// Both tiers' collections, kept apart. The same name may appear in each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionListing {
    pub sync: CollectionMap,
    pub local: CollectionMap,
}

impl CollectionListing {
    /// Number of collections across both tiers.
    pub fn total(&self) -> usize {
        self.sync.len() + self.local.len()
    }

    pub fn tier(&self, tier: Tier) -> &CollectionMap {
        match tier {
            Tier::Sync => &self.sync,
            Tier::Local => &self.local,
        }
    }

    /// Every collection with the tier it lives in, sync first.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &String, &Collection)> {
        self.sync
            .iter()
            .map(|(name, c)| (Tier::Sync, name, c))
            .chain(self.local.iter().map(|(name, c)| (Tier::Local, name, c)))
    }
}

/// Save, delete and list collections.
#[derive(Clone)]
pub struct CollectionStore {
    storage: TierStorage,
    recycle_bin: RecycleBin,
    policy: PlacementPolicy,
    clock: Arc<dyn Clock>,
}

impl CollectionStore {
    pub fn new(
        storage: TierStorage,
        recycle_bin: RecycleBin,
        policy: PlacementPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            recycle_bin,
            policy,
            clock,
        }
    }

    pub fn storage(&self) -> &TierStorage {
        &self.storage
    }

    pub fn recycle_bin(&self) -> &RecycleBin {
        &self.recycle_bin
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    /// Save `tabs` as a new collection named `name`.
    ///
    /// Only http and https tabs are kept. An existing collection with the same
    /// name in the chosen tier is replaced.
    pub async fn save(&self, name: &str, tabs: &[BrowserTab]) -> Result<SaveOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Please enter a collection name"));
        }

        let records = compress_all(tabs);
        if records.is_empty() {
            return Err(Error::validation(
                "No valid tabs to save. Please open some web pages.",
            ));
        }

        let tab_count = records.len();
        let collection = Collection::new(records, self.clock.now_ms());
        let placement = self.policy.place(&self.storage, name, &collection).await?;

        tracing::info!(
            collection = %name,
            tier = %placement.tier,
            tabs = tab_count,
            "Saved collection"
        );
        Ok(SaveOutcome {
            name: name.to_string(),
            tier: placement.tier,
            tab_count,
            size_bytes: placement.size_bytes,
        })
    }

    /// Move a collection to the recycle bin. `None` when there is no such
    /// collection in `tier`.
    pub async fn delete(&self, name: &str, tier: Tier) -> Result<Option<RecycleBinEntry>> {
        let mut collections = self.storage.read(tier).await?;
        let Some(collection) = collections.remove(name) else {
            tracing::debug!(collection = %name, tier = %tier, "Nothing to delete");
            return Ok(None);
        };

        let entry = self
            .recycle_bin
            .add(
                RecycledItem::Collection {
                    name: name.to_string(),
                    tabs: collection,
                },
                tier,
            )
            .await?;
        self.storage.write(tier, &collections).await?;

        tracing::info!(collection = %name, tier = %tier, "Deleted collection");
        Ok(Some(entry))
    }

    /// Remove the first tab whose stored URL matches `tab_key`.
    ///
    /// `tab_key` may be a stored `u` value or a full URL. A stored `u` that
    /// still carries its protocol matches verbatim. Removing the last tab
    /// removes the collection as well, without a second recycle bin entry.
    pub async fn delete_tab(
        &self,
        name: &str,
        tier: Tier,
        tab_key: &str,
    ) -> Result<Option<TabDeletion>> {
        let key = compressed_key(tab_key);
        let mut collections = self.storage.read(tier).await?;

        let Some(collection) = collections.get_mut(name) else {
            return Ok(None);
        };
        let Some(index) = collection
            .tabs
            .iter()
            .position(|tab| tab.u == tab_key || tab.u == key)
        else {
            tracing::debug!(collection = %name, tab = %key, "Tab not found");
            return Ok(None);
        };

        let tab = collection.tabs.remove(index);
        let collection_removed = collection.tabs.is_empty();
        if collection_removed {
            collections.remove(name);
        } else {
            collection.last_modified = self.clock.now_ms();
        }

        let entry = self
            .recycle_bin
            .add(
                RecycledItem::Tab {
                    collection_name: name.to_string(),
                    tab,
                },
                tier,
            )
            .await?;
        self.storage.write(tier, &collections).await?;

        tracing::info!(
            collection = %name,
            tier = %tier,
            collection_removed,
            "Deleted tab"
        );
        Ok(Some(TabDeletion {
            entry,
            collection_removed,
        }))
    }

    /// Read both tiers.
    pub async fn list_all(&self) -> Result<CollectionListing> {
        let (sync, local) = self.storage.read_both().await?;
        Ok(CollectionListing { sync, local })
    }

    pub async fn get(&self, name: &str, tier: Tier) -> Result<Option<Collection>> {
        Ok(self.storage.read(tier).await?.remove(name))
    }
}
