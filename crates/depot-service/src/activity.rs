//! Activity notification for the revision/history collaborator.
//!
//! The core never blocks on activity delivery: [`ActivityNotifier::notify`]
//! is fire-and-forget. Persisted records are cascaded away with their entry
//! via [`ActivityNotifier::purge`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use depot_core::result::AppResult;
use depot_database::repositories::activity::ActivityLogRepository;
use depot_entity::activity::{ActivityAction, NewActivity};

/// A tree mutation event handed to the collaborator.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    /// The affected entry.
    pub entry_id: Uuid,
    /// The acting user.
    pub actor: Uuid,
    /// What happened.
    pub action: ActivityAction,
    /// Display name of the item.
    pub item_name: String,
    /// Previous parent display name, for moves.
    pub old_parent: Option<String>,
    /// New parent display name, for moves.
    pub new_parent: Option<String>,
}

/// Fire-and-forget sink for tree mutation events.
#[async_trait]
pub trait ActivityNotifier: Send + Sync + std::fmt::Debug + 'static {
    /// Hand an event to the collaborator without blocking the caller.
    fn notify(&self, event: ActivityEvent);

    /// Remove persisted records for entries that are being deleted.
    async fn purge(&self, entry_ids: &[Uuid]) -> AppResult<()>;
}

/// Notifier that persists events into the activity log table.
///
/// Deletion events are logged but not persisted — their records would
/// dangle once the entry (and its record chain) is removed.
#[derive(Debug, Clone)]
pub struct ActivityLogger {
    repo: Arc<ActivityLogRepository>,
}

impl ActivityLogger {
    /// Create a new logger over the activity repository.
    pub fn new(repo: Arc<ActivityLogRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ActivityNotifier for ActivityLogger {
    fn notify(&self, event: ActivityEvent) {
        if event.action == ActivityAction::Deleted {
            debug!(
                entry_id = %event.entry_id,
                item = %event.item_name,
                "Entry deleted"
            );
            return;
        }

        let repo = Arc::clone(&self.repo);
        tokio::spawn(async move {
            let record = NewActivity {
                entry_id: event.entry_id,
                actor: event.actor,
                action: event.action,
                item_name: event.item_name,
                old_parent: event.old_parent,
                new_parent: event.new_parent,
            };
            if let Err(e) = repo.record(&record).await {
                warn!(entry_id = %record.entry_id, error = %e, "Failed to record activity");
            }
        });
    }

    async fn purge(&self, entry_ids: &[Uuid]) -> AppResult<()> {
        let removed = self.repo.delete_for_entries(entry_ids).await?;
        if removed > 0 {
            debug!(removed, "Purged activity records");
        }
        Ok(())
    }
}

/// Notifier that only writes to the log stream (memory mode).
#[derive(Debug, Clone, Default)]
pub struct LogActivity;

#[async_trait]
impl ActivityNotifier for LogActivity {
    fn notify(&self, event: ActivityEvent) {
        debug!(
            entry_id = %event.entry_id,
            actor = %event.actor,
            action = %event.action,
            item = %event.item_name,
            "Activity"
        );
    }

    async fn purge(&self, _entry_ids: &[Uuid]) -> AppResult<()> {
        Ok(())
    }
}
