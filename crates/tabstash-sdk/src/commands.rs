//! User intents the popup can dispatch.
//!
//! The presentation layer translates UI events into [`Command`]s and renders
//! the [`CommandOutcome`]; it never touches storage directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabstash_core::{CollectionListing, RecycleBinEntry, RestoreOutcome, SaveOutcome, Tier};

/// One selected tab in the collections list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub collection: String,
    pub tier: Tier,
    /// Expanded URL of the tab.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Save every tab of the current window under `name`.
    SaveCurrentTabs { name: String },
    OpenTab { url: String },
    DeleteTab {
        collection: String,
        tier: Tier,
        url: String,
    },
    OpenCollection { name: String, tier: Tier },
    DeleteCollection { name: String, tier: Tier },
    BulkOpen { selections: Vec<Selection> },
    /// Delete the selected tabs in order, stopping at the first failure.
    BulkDelete { selections: Vec<Selection> },
    Restore { entry: RecycleBinEntry },
    ShowRecycleBin,
    Refresh,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SaveCurrentTabs { .. } => "save-current-tabs",
            Command::OpenTab { .. } => "open-tab",
            Command::DeleteTab { .. } => "delete-tab",
            Command::OpenCollection { .. } => "open-collection",
            Command::DeleteCollection { .. } => "delete-collection",
            Command::BulkOpen { .. } => "bulk-open",
            Command::BulkDelete { .. } => "bulk-delete",
            Command::Restore { .. } => "restore",
            Command::ShowRecycleBin => "show-recycle-bin",
            Command::Refresh => "refresh",
        }
    }

    /// Whether the collection list should be reloaded after success.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::OpenTab { .. }
                | Command::OpenCollection { .. }
                | Command::BulkOpen { .. }
                | Command::ShowRecycleBin
                | Command::Refresh
        )
    }
}

/// A recycle bin entry prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecycleBinView {
    pub entry: RecycleBinEntry,
    pub deleted_at: DateTime<Utc>,
    pub days_remaining: i64,
}

impl RecycleBinView {
    pub fn display_name(&self) -> &str {
        self.entry.display_name()
    }

    /// e.g. "Expires in 3 days"
    pub fn expiry_label(&self) -> String {
        match self.days_remaining {
            1 => "Expires in 1 day".to_string(),
            n => format!("Expires in {} days", n),
        }
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    Saved(SaveOutcome),
    Opened { count: usize },
    /// Recycle bin entries created, in deletion order. Each can back an
    /// undo notice.
    Deleted { entries: Vec<RecycleBinEntry> },
    Restored(RestoreOutcome),
    RecycleBin(Vec<RecycleBinView>),
    Listing(CollectionListing),
}
