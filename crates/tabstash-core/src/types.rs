//! Shared types for tab stash collections.
//!
//! Field names of the persisted types are part of the stored layout and must
//! stay stable: older popups read the same keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written into every new collection.
pub const COLLECTION_VERSION: &str = "1.0";

// ─────────────────────────────────────────────────────────────────────────────
// Tiers
// ─────────────────────────────────────────────────────────────────────────────

/// One of the two backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Small store replicated across the user's devices.
    Sync,
    /// Larger store that never leaves this device.
    Local,
}

impl Tier {
    pub fn is_sync(self) -> bool {
        matches!(self, Tier::Sync)
    }

    pub fn from_is_sync(is_sync: bool) -> Self {
        if is_sync { Tier::Sync } else { Tier::Local }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Sync => write!(f, "sync"),
            Tier::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Tier::Sync),
            "local" => Ok(Tier::Local),
            _ => Err(format!("Invalid storage tier: {}", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tabs
// ─────────────────────────────────────────────────────────────────────────────

/// A tab as reported by the browser's tab enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
}

impl BrowserTab {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            fav_icon_url: None,
        }
    }

    pub fn with_favicon(mut self, fav_icon_url: impl Into<String>) -> Self {
        self.fav_icon_url = Some(fav_icon_url.into());
        self
    }
}

/// URL scheme a tab record was saved with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Compressed, persisted form of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    /// Host and path with the scheme, `www.` and trailing slash removed.
    pub u: String,
    /// Title, at most 100 characters.
    pub t: String,
    /// Favicon file name only.
    #[serde(default)]
    pub f: String,
    #[serde(default)]
    pub p: Protocol,
}

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

/// A named, ordered list of tab records. The name is the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCollection")]
pub struct Collection {
    pub tabs: Vec<TabRecord>,
    pub last_modified: i64,
    pub version: String,
}

impl Collection {
    pub fn new(tabs: Vec<TabRecord>, last_modified: i64) -> Self {
        Self {
            tabs,
            last_modified,
            version: COLLECTION_VERSION.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }
}

/// Layouts a collection may be found in. Early releases stored the bare tab
/// array under the collection name.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCollection {
    #[serde(rename_all = "camelCase")]
    Current {
        tabs: Vec<TabRecord>,
        #[serde(default)]
        last_modified: i64,
        #[serde(default = "default_version")]
        version: String,
    },
    Bare(Vec<TabRecord>),
}

fn default_version() -> String {
    COLLECTION_VERSION.to_string()
}

impl From<StoredCollection> for Collection {
    fn from(stored: StoredCollection) -> Self {
        match stored {
            StoredCollection::Current {
                tabs,
                last_modified,
                version,
            } => Self {
                tabs,
                last_modified,
                version,
            },
            StoredCollection::Bare(tabs) => Self::new(tabs, 0),
        }
    }
}

/// Collections of one tier, keyed by name.
pub type CollectionMap = BTreeMap<String, Collection>;

// ─────────────────────────────────────────────────────────────────────────────
// Recycle bin
// ─────────────────────────────────────────────────────────────────────────────

/// What was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecycledItem {
    /// A whole collection. `tabs` carries the full collection value.
    Collection { name: String, tabs: Collection },
    /// A single tab removed from `collection_name`.
    Tab {
        #[serde(rename = "collectionName")]
        collection_name: String,
        tab: TabRecord,
    },
}

/// Soft-deleted item with the tier it came from and its deletion time.
///
/// `deleted_at` doubles as the entry's identity within the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleBinEntry {
    #[serde(flatten)]
    pub item: RecycledItem,
    pub is_sync: bool,
    pub deleted_at: i64,
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

impl RecycleBinEntry {
    pub fn tier(&self) -> Tier {
        Tier::from_is_sync(self.is_sync)
    }

    /// Name shown in the recycle bin list.
    pub fn display_name(&self) -> &str {
        match &self.item {
            RecycledItem::Collection { name, .. } => name,
            RecycledItem::Tab { tab, .. } => &tab.t,
        }
    }

    pub fn is_expired(&self, now_ms: i64, retention_ms: i64) -> bool {
        now_ms - self.deleted_at >= retention_ms
    }

    /// Whole days left before expiry, rounded up.
    pub fn days_remaining(&self, now_ms: i64, retention_ms: i64) -> i64 {
        let remaining = self.deleted_at + retention_ms - now_ms;
        if remaining <= 0 {
            return 0;
        }
        (remaining + DAY_MS - 1) / DAY_MS
    }
}
