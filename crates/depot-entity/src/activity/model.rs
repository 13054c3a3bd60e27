//! Activity record model.
//!
//! Activity records are consumed by the external revision/history
//! collaborator for audit display. The core only writes them
//! (fire-and-forget) and cascades them on entry deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of tree mutation being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    /// Entry created (upload initiated or folder created).
    Created,
    /// Upload completed.
    Completed,
    /// Entry moved to a new parent.
    Moved,
    /// Entry deleted.
    Deleted,
}

impl ActivityAction {
    /// Return the action as a string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted activity record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    /// Record id.
    pub id: Uuid,
    /// The entry this record belongs to (cascades on deletion).
    pub entry_id: Uuid,
    /// The acting user.
    pub actor: Uuid,
    /// Action kind.
    pub action: String,
    /// Display name of the item at the time of the action.
    pub item_name: String,
    /// Display name of the previous parent, for moves.
    pub old_parent: Option<String>,
    /// Display name of the new parent, for moves.
    pub new_parent: Option<String>,
    /// When the action happened.
    pub created_at: DateTime<Utc>,
}

/// Data for a new activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    /// The entry the record belongs to.
    pub entry_id: Uuid,
    /// The acting user.
    pub actor: Uuid,
    /// Action kind.
    pub action: ActivityAction,
    /// Display name of the item.
    pub item_name: String,
    /// Previous parent display name.
    pub old_parent: Option<String>,
    /// New parent display name.
    pub new_parent: Option<String>,
}
