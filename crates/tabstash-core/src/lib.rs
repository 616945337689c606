//! tabstash-core - Core library for Tab Stash
//!
//! Saves the open tabs of a browser window as named collections spread over
//! two storage tiers:
//!
//! - **codec**: Compact persisted form of a browser tab
//! - **storage**: Uniform access to the synchronized and local stores
//! - **collection**: Save, delete and list collections
//! - **recycle**: Soft-delete log with bounded retention
//! - **placement**: Tier placement at save time and background promotion

pub mod clock;
pub mod codec;
pub mod collection;
pub mod error;
pub mod placement;
pub mod recycle;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::{CollectionListing, CollectionStore, SaveOutcome, TabDeletion};
pub use error::{Error, QuotaKind, Result};
pub use placement::{PlacementLimits, PlacementPolicy, PromotionReport};
pub use recycle::{RecycleBin, RestoreOutcome};
pub use storage::{MemoryStorageArea, StorageArea, TierQuota, TierStorage};
pub use types::{
    BrowserTab, Collection, CollectionMap, Protocol, RecycleBinEntry, RecycledItem, TabRecord,
    Tier,
};

#[cfg(feature = "db")]
pub use storage::SqliteStorageArea;
