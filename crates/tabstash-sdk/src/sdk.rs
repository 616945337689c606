//! Main SDK Entry Point
//!
//! Provides the [`TabStash`] struct that wires storage, placement and the
//! recycle bin together from a [`StashConfig`].

use std::sync::Arc;

use tabstash_core::{
    Clock, CollectionStore, MemoryStorageArea, PlacementPolicy, RecycleBin, RecycleBinEntry,
    StorageArea, SystemClock, Tier, TierQuota, TierStorage,
};

use crate::commands::RecycleBinView;
use crate::config::{StashConfig, StorageBackend};
use crate::error::StashResult;
use crate::scheduler::PromotionTask;
use crate::undo::UndoNotice;

/// Tab Stash - Main entry point
///
/// # Example
///
/// ```rust,no_run
/// use tabstash_sdk::{StashConfig, TabStash};
///
/// async fn example() -> anyhow::Result<()> {
///     let stash = TabStash::from_config(StashConfig::load()?)?;
///     stash.storage().initialize().await?;
///
///     let listing = stash.collections().list_all().await?;
///     println!("{} collections", listing.total());
///     Ok(())
/// }
/// ```
pub struct TabStash {
    config: StashConfig,
    storage: TierStorage,
    policy: PlacementPolicy,
    recycle_bin: RecycleBin,
    collections: CollectionStore,
    clock: Arc<dyn Clock>,
}

impl TabStash {
    /// Create a stash over explicit storage areas.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(
        config: StashConfig,
        sync: Arc<dyn StorageArea>,
        local: Arc<dyn StorageArea>,
        clock: Arc<dyn Clock>,
    ) -> StashResult<Self> {
        config.validate()?;

        let storage = TierStorage::new(sync, local);
        let policy = PlacementPolicy::new(config.placement_limits().for_storage(&storage));
        let recycle_bin = RecycleBin::with_retention_days(
            storage.clone(),
            Arc::clone(&clock),
            config.recycle_bin.retention_days,
        );
        let collections = CollectionStore::new(
            storage.clone(),
            recycle_bin.clone(),
            policy,
            Arc::clone(&clock),
        );

        Ok(Self {
            config,
            storage,
            policy,
            recycle_bin,
            collections,
            clock,
        })
    }

    /// Create a stash with the backend named in `config` and the browser's
    /// quota constants.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The database cannot be opened
    pub fn from_config(config: StashConfig) -> StashResult<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        match config.storage.backend {
            StorageBackend::Memory => {
                let sync = Arc::new(MemoryStorageArea::new(Tier::Sync, TierQuota::chrome_sync()));
                let local =
                    Arc::new(MemoryStorageArea::new(Tier::Local, TierQuota::chrome_local()));
                Self::new(config, sync, local, clock)
            }
            StorageBackend::Sqlite => Self::open_sqlite(config, clock),
        }
    }

    #[cfg(feature = "sqlite")]
    fn open_sqlite(config: StashConfig, clock: Arc<dyn Clock>) -> StashResult<Self> {
        use tabstash_core::SqliteStorageArea;

        let path = config.storage.database_path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let (sync, local) = SqliteStorageArea::open_pair(
            &path,
            TierQuota::chrome_sync(),
            TierQuota::chrome_local(),
        )?;
        tracing::info!(path = %path.display(), "Opened stash database");
        Self::new(config, Arc::new(sync), Arc::new(local), clock)
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_sqlite(_config: StashConfig, _clock: Arc<dyn Clock>) -> StashResult<Self> {
        Err(anyhow::anyhow!("sqlite backend requires the `sqlite` feature").into())
    }

    /// Get the SDK configuration
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    pub fn storage(&self) -> &TierStorage {
        &self.storage
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    pub fn recycle_bin(&self) -> &RecycleBin {
        &self.recycle_bin
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Spawn the background promotion loop with the configured interval.
    pub fn start_promotion(&self) -> PromotionTask {
        PromotionTask::spawn(
            self.policy,
            self.storage.clone(),
            self.config.promotion_interval(),
        )
    }

    /// Open an undo notice for a fresh deletion.
    pub fn undo_notice(&self, entry: RecycleBinEntry) -> UndoNotice {
        UndoNotice::start(self.recycle_bin.clone(), entry, self.config.undo_window())
    }

    /// Recycle bin contents, newest first, with their expiry.
    pub async fn recycle_bin_view(&self) -> StashResult<Vec<RecycleBinView>> {
        let entries = self.recycle_bin.list().await?;
        Ok(entries
            .into_iter()
            .map(|entry| RecycleBinView {
                deleted_at: chrono::DateTime::from_timestamp_millis(entry.deleted_at)
                    .unwrap_or_default(),
                days_remaining: self.recycle_bin.days_remaining(&entry),
                entry,
            })
            .collect())
    }
}
