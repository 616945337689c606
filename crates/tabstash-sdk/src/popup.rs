//! Popup lifecycle.
//!
//! A [`PopupSession`] lives exactly as long as the popup is open. Opening it
//! prepares storage, purges expired recycle bin entries and starts background
//! promotion; closing or dropping it stops promotion.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tabstash_core::codec::expand;
use tabstash_core::{RecycleBinEntry, Tier};

use crate::commands::{Command, CommandOutcome, Selection};
use crate::error::{StashError, StashResult};
use crate::providers::{TabOpener, TabSource};
use crate::scheduler::PromotionTask;
use crate::sdk::TabStash;
use crate::undo::UndoNotice;

pub struct PopupSession {
    stash: Arc<TabStash>,
    tabs: Arc<dyn TabSource>,
    opener: Arc<dyn TabOpener>,
    promotion: Option<PromotionTask>,
}

impl PopupSession {
    /// Open the popup.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be initialized. A failing recycle
    /// bin cleanup is logged and does not block opening.
    pub async fn open(
        stash: Arc<TabStash>,
        tabs: Arc<dyn TabSource>,
        opener: Arc<dyn TabOpener>,
    ) -> StashResult<Self> {
        stash.storage().initialize().await?;

        match stash.recycle_bin().cleanup().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired recycle bin entries"),
            Err(e) => warn!(error = %e, "Recycle bin cleanup failed"),
        }

        let promotion = stash.start_promotion();
        info!("Popup opened");

        Ok(Self {
            stash,
            tabs,
            opener,
            promotion: Some(promotion),
        })
    }

    pub fn stash(&self) -> &TabStash {
        &self.stash
    }

    pub fn promotion(&self) -> Option<&PromotionTask> {
        self.promotion.as_ref()
    }

    /// Offer to undo a deletion reported by [`CommandOutcome::Deleted`].
    pub fn undo_notice(&self, entry: RecycleBinEntry) -> UndoNotice {
        self.stash.undo_notice(entry)
    }

    /// Close the popup, stopping background promotion.
    pub fn close(mut self) {
        if let Some(task) = self.promotion.take() {
            task.stop();
        }
        info!("Popup closed");
    }

    /// Run one user command. Failures are logged and returned with the
    /// underlying message.
    pub async fn dispatch(&self, command: Command) -> StashResult<CommandOutcome> {
        let name = command.name();
        debug!(command = name, "Dispatching command");

        let result = self.execute(command).await;
        if let Err(e) = &result {
            error!(command = name, error = %e, "Command failed");
        }
        result
    }

    async fn execute(&self, command: Command) -> StashResult<CommandOutcome> {
        let collections = self.stash.collections();

        match command {
            Command::SaveCurrentTabs { name } => {
                let tabs = self.tabs.current_window_tabs().await?;
                let outcome = collections.save(&name, &tabs).await?;
                if outcome.tier == Tier::Local {
                    self.schedule_promotion();
                }
                Ok(CommandOutcome::Saved(outcome))
            }

            Command::OpenTab { url } => {
                self.opener.open(&url).await?;
                Ok(CommandOutcome::Opened { count: 1 })
            }

            Command::DeleteTab {
                collection,
                tier,
                url,
            } => {
                let entries = collections
                    .delete_tab(&collection, tier, &url)
                    .await?
                    .map(|deletion| deletion.entry)
                    .into_iter()
                    .collect();
                Ok(CommandOutcome::Deleted { entries })
            }

            Command::OpenCollection { name, tier } => {
                let collection = collections
                    .get(&name, tier)
                    .await?
                    .ok_or(StashError::CollectionNotFound { name, tier })?;
                for tab in &collection.tabs {
                    self.opener.open(&expand(tab)).await?;
                }
                Ok(CommandOutcome::Opened {
                    count: collection.len(),
                })
            }

            Command::DeleteCollection { name, tier } => {
                let entries = collections.delete(&name, tier).await?.into_iter().collect();
                Ok(CommandOutcome::Deleted { entries })
            }

            Command::BulkOpen { selections } => {
                for Selection { url, .. } in &selections {
                    self.opener.open(url).await?;
                }
                Ok(CommandOutcome::Opened {
                    count: selections.len(),
                })
            }

            Command::BulkDelete { selections } => {
                let mut entries = Vec::with_capacity(selections.len());
                for selection in &selections {
                    if let Some(deletion) = collections
                        .delete_tab(&selection.collection, selection.tier, &selection.url)
                        .await?
                    {
                        entries.push(deletion.entry);
                    }
                }
                Ok(CommandOutcome::Deleted { entries })
            }

            Command::Restore { entry } => {
                let outcome = self.stash.recycle_bin().restore(&entry).await?;
                Ok(CommandOutcome::Restored(outcome))
            }

            Command::ShowRecycleBin => Ok(CommandOutcome::RecycleBin(
                self.stash.recycle_bin_view().await?,
            )),

            Command::Refresh => Ok(CommandOutcome::Listing(collections.list_all().await?)),
        }
    }

    fn schedule_promotion(&self) {
        let promotion_config = &self.stash.config().promotion;
        if !promotion_config.trigger_after_local_save {
            return;
        }
        if let Some(task) = &self.promotion {
            task.trigger_after(self.stash.config().post_save_delay());
        }
    }
}
