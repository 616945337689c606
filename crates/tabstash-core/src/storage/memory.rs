//! In-process storage area.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{item_size, StorageArea, TierQuota};
use crate::error::{Error, Result};
use crate::types::Tier;

/// Storage area held in memory, enforcing the same quotas as the browser.
///
/// Values are kept serialized so size accounting matches what a real store
/// would charge. The area can be taken offline to simulate transport or
/// permission failures.
pub struct MemoryStorageArea {
    tier: Tier,
    quota: TierQuota,
    items: RwLock<BTreeMap<String, String>>,
    offline: AtomicBool,
}

impl MemoryStorageArea {
    pub fn new(tier: Tier, quota: TierQuota) -> Self {
        Self {
            tier,
            quota,
            items: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `StorageUnavailable` until
    /// switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::unavailable(self.tier, "storage area is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageArea for MemoryStorageArea {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn quota(&self) -> TierQuota {
        self.quota
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_online()?;
        let items = self.items.read().await;
        match items.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_online()?;
        let raw = serde_json::to_string(&value)?;

        let mut items = self.items.write().await;
        let sizes: BTreeMap<String, u64> = items
            .iter()
            .map(|(k, v)| (k.clone(), item_size(k, v)))
            .collect();
        self.quota
            .check_set(self.tier, &sizes, key, &value, &raw)?;

        items.insert(key.to_string(), raw);
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        self.ensure_online()?;
        let items = self.items.read().await;
        Ok(items.iter().map(|(k, v)| item_size(k, v)).sum())
    }
}
