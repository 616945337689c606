//! Tab Stash SDK - Host-facing facade
//!
//! Wraps `tabstash-core` with everything a popup host needs:
//!
//! # Core Modules (from tabstash-core)
//!
//! - **codec** - Compact tab records
//! - **storage** - Sync and local storage areas
//! - **collection** - Save, delete and list collections
//! - **recycle** - Recycle bin
//! - **placement** - Tier placement and promotion
//!
//! # SDK Modules
//!
//! - **config** - TOML configuration
//! - **logging** - Tracing subscriber setup
//! - **popup** - Popup lifecycle and command dispatch
//! - **scheduler** - Background promotion loop
//! - **undo** - Time-limited undo for deletions
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tabstash_sdk::{Command, PopupSession, StashConfig, TabOpener, TabSource, TabStash};
//!
//! async fn example(tabs: Arc<dyn TabSource>, opener: Arc<dyn TabOpener>) -> anyhow::Result<()> {
//!     let config = StashConfig::load()?;
//!     tabstash_sdk::logging::init_tracing(&config.logging);
//!
//!     let stash = Arc::new(TabStash::from_config(config)?);
//!     let popup = PopupSession::open(stash, tabs, opener).await?;
//!
//!     popup
//!         .dispatch(Command::SaveCurrentTabs { name: "Research".into() })
//!         .await?;
//!
//!     popup.close();
//!     Ok(())
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core modules from tabstash-core
// ─────────────────────────────────────────────────────────────────────────────

/// Compact tab records
pub use tabstash_core::codec;

/// Sync and local storage areas
pub use tabstash_core::storage;

/// Save, delete and list collections
pub use tabstash_core::collection;

/// Recycle bin
pub use tabstash_core::recycle;

/// Tier placement and promotion
pub use tabstash_core::placement;

/// Core types (Collection, TabRecord, Tier, etc.)
pub use tabstash_core::types;

/// Error types from core
pub use tabstash_core::error as core_error;

// ─────────────────────────────────────────────────────────────────────────────
// SDK-specific modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod commands;
pub mod config;
pub mod logging;
pub mod popup;
pub mod providers;
pub mod scheduler;
pub mod undo;

mod error;
mod sdk;

// Re-export main SDK types
pub use commands::{Command, CommandOutcome, RecycleBinView, Selection};
pub use config::{ConfigValidationError, StashConfig};
pub use error::{StashError, StashResult};
pub use popup::PopupSession;
pub use providers::{TabOpener, TabSource};
pub use scheduler::PromotionTask;
pub use sdk::TabStash;
pub use undo::UndoNotice;

pub use tabstash_core::{BrowserTab, Collection, RecycleBinEntry, Tier};
