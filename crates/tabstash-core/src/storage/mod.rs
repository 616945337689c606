//! Storage tier abstraction.
//!
//! Two key-value stores back the collections:
//!
//! ```text
//! ┌───────────────────────────────┐   ┌───────────────────────────────┐
//! │ sync (replicated, ~100KB)     │   │ local (device only, ~5MB)     │
//! │   collections: {name → coll}  │   │   collections: {name → coll}  │
//! │                               │   │   recycleBin:  [entry, ...]   │
//! └───────────────────────────────┘   └───────────────────────────────┘
//! ```
//!
//! Every mutation is a read-modify-write of a whole mapping: read it, change a
//! copy, write it back. The stores serialize individual get/set calls, but the
//! sequence as a whole is not atomic. A writer that lands between the read and
//! the write is overwritten (last write wins). A single popup instance is the
//! only writer in practice, so no versioning is layered on top.

mod memory;
#[cfg(feature = "db")]
mod sqlite;

pub use memory::MemoryStorageArea;
#[cfg(feature = "db")]
pub use sqlite::SqliteStorageArea;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, QuotaKind, Result};
use crate::types::{CollectionMap, RecycleBinEntry, Tier};

/// Key holding the collection mapping in both tiers.
pub const COLLECTIONS_KEY: &str = "collections";

/// Key holding the recycle bin log (local tier only).
pub const RECYCLE_BIN_KEY: &str = "recycleBin";

// ─────────────────────────────────────────────────────────────────────────────
// Quotas
// ─────────────────────────────────────────────────────────────────────────────

/// Limits a backing store enforces on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierQuota {
    /// Total bytes across all items.
    pub total_bytes: Option<u64>,
    /// Bytes for a single item (key plus serialized value).
    pub per_item_bytes: Option<u64>,
    /// Number of distinct keys.
    pub max_items: Option<usize>,
}

impl TierQuota {
    /// Limits of the browser's synchronized storage area.
    pub const fn chrome_sync() -> Self {
        Self {
            total_bytes: Some(102_400),
            per_item_bytes: Some(8_192),
            max_items: Some(512),
        }
    }

    /// Limits of the browser's local storage area.
    pub const fn chrome_local() -> Self {
        Self {
            total_bytes: Some(5_242_880),
            per_item_bytes: None,
            max_items: None,
        }
    }

    pub const fn unlimited() -> Self {
        Self {
            total_bytes: None,
            per_item_bytes: None,
            max_items: None,
        }
    }

    /// Check one stored entry against the per-item limit.
    pub fn check_item(&self, tier: Tier, name: &str, bytes: u64) -> Result<()> {
        match self.per_item_bytes {
            Some(limit) if bytes > limit => Err(Error::quota(
                tier,
                QuotaKind::PerItem,
                format!("item '{}' is {} bytes, limit is {}", name, bytes, limit),
            )),
            _ => Ok(()),
        }
    }

    /// Check a write of `key` (serialized to `item_bytes`) against the item
    /// count and total limits, given the sizes of the items already stored.
    pub fn check_write(
        &self,
        tier: Tier,
        items: &BTreeMap<String, u64>,
        key: &str,
        item_bytes: u64,
    ) -> Result<()> {
        if let Some(limit) = self.max_items {
            if !items.contains_key(key) && items.len() >= limit {
                return Err(Error::TooManyItems { tier, limit });
            }
        }

        if let Some(limit) = self.total_bytes {
            let others: u64 = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, size)| *size)
                .sum();
            if others + item_bytes > limit {
                return Err(Error::quota(
                    tier,
                    QuotaKind::Total,
                    format!("{} bytes would exceed total of {}", others + item_bytes, limit),
                ));
            }
        }

        Ok(())
    }

    /// Every check a storage area runs on `set`.
    ///
    /// The collection mapping is charged per collection against the per-item
    /// limit; any other key is charged as a whole.
    pub fn check_set(
        &self,
        tier: Tier,
        items: &BTreeMap<String, u64>,
        key: &str,
        value: &Value,
        raw: &str,
    ) -> Result<()> {
        match value {
            Value::Object(entries) if key == COLLECTIONS_KEY => {
                for (name, entry) in entries {
                    let bytes = item_size(name, &serde_json::to_string(entry)?);
                    self.check_item(tier, name, bytes)?;
                }
            }
            _ => self.check_item(tier, key, item_size(key, raw))?,
        }
        self.check_write(tier, items, key, item_size(key, raw))
    }
}

/// Serialized byte length of `value`, as used for quota decisions.
pub fn estimate_size<T: Serialize + ?Sized>(value: &T) -> Result<u64> {
    Ok(serde_json::to_vec(value)?.len() as u64)
}

/// Bytes rounded to whole kilobytes for display.
pub fn size_kb(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

/// Bytes a stored item counts against a quota.
pub(crate) fn item_size(key: &str, serialized: &str) -> u64 {
    (key.len() + serialized.len()) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage area trait
// ─────────────────────────────────────────────────────────────────────────────

/// One backing key-value store.
///
/// Implementations enforce their own quota on `set` and report it through
/// [`StorageArea::quota`].
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Tier this area backs.
    fn tier(&self) -> Tier;

    /// Quota constants of this area.
    fn quota(&self) -> TierQuota;

    /// Read a key. Missing keys are `None`, never an error.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a key, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Bytes currently stored.
    async fn bytes_in_use(&self) -> Result<u64>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier storage
// ─────────────────────────────────────────────────────────────────────────────

/// Size summary of one tier, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierUsage {
    pub tier: Tier,
    pub bytes_in_use: u64,
    pub total_bytes: Option<u64>,
}

impl TierUsage {
    pub fn kb_in_use(&self) -> u64 {
        size_kb(self.bytes_in_use)
    }
}

/// The pair of storage areas collections live in.
#[derive(Clone)]
pub struct TierStorage {
    sync: Arc<dyn StorageArea>,
    local: Arc<dyn StorageArea>,
}

impl TierStorage {
    pub fn new(sync: Arc<dyn StorageArea>, local: Arc<dyn StorageArea>) -> Self {
        Self { sync, local }
    }

    /// Two in-memory areas with the browser's quotas.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorageArea::new(Tier::Sync, TierQuota::chrome_sync())),
            Arc::new(MemoryStorageArea::new(Tier::Local, TierQuota::chrome_local())),
        )
    }

    pub fn area(&self, tier: Tier) -> &Arc<dyn StorageArea> {
        match tier {
            Tier::Sync => &self.sync,
            Tier::Local => &self.local,
        }
    }

    /// Read the collection mapping of a tier. A missing key is an empty mapping.
    pub async fn read(&self, tier: Tier) -> Result<CollectionMap> {
        match self.area(tier).get(COLLECTIONS_KEY).await? {
            Some(Value::Null) | None => Ok(CollectionMap::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Replace the collection mapping of a tier.
    pub async fn write(&self, tier: Tier, collections: &CollectionMap) -> Result<()> {
        let value = serde_json::to_value(collections)?;
        self.area(tier).set(COLLECTIONS_KEY, value).await
    }

    /// Read both tiers concurrently: `(sync, local)`.
    pub async fn read_both(&self) -> Result<(CollectionMap, CollectionMap)> {
        tokio::try_join!(self.read(Tier::Sync), self.read(Tier::Local))
    }

    pub async fn read_recycle_bin(&self) -> Result<Vec<RecycleBinEntry>> {
        match self.local.get(RECYCLE_BIN_KEY).await? {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn write_recycle_bin(&self, entries: &[RecycleBinEntry]) -> Result<()> {
        let value = serde_json::to_value(entries)?;
        self.local.set(RECYCLE_BIN_KEY, value).await
    }

    /// Create the empty mappings and recycle bin if this is a fresh install.
    pub async fn initialize(&self) -> Result<()> {
        for tier in [Tier::Sync, Tier::Local] {
            if self.area(tier).get(COLLECTIONS_KEY).await?.is_none() {
                self.write(tier, &CollectionMap::new()).await?;
                tracing::debug!(tier = %tier, "Initialized empty collections");
            }
        }

        if self.local.get(RECYCLE_BIN_KEY).await?.is_none() {
            self.write_recycle_bin(&[]).await?;
            tracing::debug!("Initialized empty recycle bin");
        }

        Ok(())
    }

    pub async fn usage(&self, tier: Tier) -> Result<TierUsage> {
        let area = self.area(tier);
        Ok(TierUsage {
            tier,
            bytes_in_use: area.bytes_in_use().await?,
            total_bytes: area.quota().total_bytes,
        })
    }
}
