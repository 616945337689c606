//! Browser collaborators the SDK calls out to.

use async_trait::async_trait;

use tabstash_core::BrowserTab;

/// Enumerates the tabs of the current window.
#[async_trait]
pub trait TabSource: Send + Sync {
    async fn current_window_tabs(&self) -> anyhow::Result<Vec<BrowserTab>>;
}

/// Opens a URL in a new tab.
#[async_trait]
pub trait TabOpener: Send + Sync {
    async fn open(&self, url: &str) -> anyhow::Result<()>;
}
