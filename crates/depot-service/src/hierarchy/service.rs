//! Folder tree operations: creation, listing, and the move algorithm.
//!
//! Derived folder sizes are maintained write-side: every mutation walks
//! the affected ancestor chains with an atomic per-entry delta, so size
//! lookups stay O(1).

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_database::store::EntryStore;
use depot_entity::activity::ActivityAction;
use depot_entity::entry::lineage::{child_lineage, descendant_prefix, splice};
use depot_entity::entry::{Entry, NewEntry, UploadStatus};

use crate::activity::{ActivityEvent, ActivityNotifier};
use crate::context::RequestContext;

/// Maintains the folder tree: lineage arrays, ancestor size propagation,
/// and the move algorithm with cycle prevention.
#[derive(Debug, Clone)]
pub struct HierarchyService {
    /// Entry persistence.
    entries: Arc<dyn EntryStore>,
    /// Activity collaborator.
    activity: Arc<dyn ActivityNotifier>,
}

impl HierarchyService {
    /// Create a new hierarchy service.
    pub fn new(entries: Arc<dyn EntryStore>, activity: Arc<dyn ActivityNotifier>) -> Self {
        Self { entries, activity }
    }

    /// Create a folder under the optional parent.
    ///
    /// Folders are born completed with a zero aggregate size; their size
    /// only ever changes through descendant accounting.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        name: &str,
        parent: Option<Uuid>,
    ) -> AppResult<Entry> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }

        let lineage = self.resolve_parent_lineage(parent).await?;

        if self.entries.find_sibling(&lineage, name).await?.is_some() {
            return Err(AppError::conflict(format!(
                "An entry named '{name}' already exists in this folder"
            )));
        }

        let folder = self
            .entries
            .insert(&NewEntry {
                id: Uuid::new_v4(),
                name: name.to_string(),
                is_folder: true,
                lineage,
                status: UploadStatus::Completed,
                declared_size_bytes: 0,
                total_chunks: 0,
                chunk_size_bytes: 0,
                remote_key: None,
                remote_session_id: None,
                content_hash: None,
                created_by: ctx.user_id,
            })
            .await?;

        self.activity.notify(ActivityEvent {
            entry_id: folder.id,
            actor: ctx.user_id,
            action: ActivityAction::Created,
            item_name: folder.name.clone(),
            old_parent: None,
            new_parent: None,
        });

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            name = %folder.name,
            "Folder created"
        );

        Ok(folder)
    }

    /// Direct children of a folder, or root items when `parent` is None.
    pub async fn list_children(
        &self,
        _ctx: &RequestContext,
        parent: Option<Uuid>,
    ) -> AppResult<Vec<Entry>> {
        let lineage = self.resolve_parent_lineage(parent).await?;
        self.entries.find_children(&lineage).await
    }

    /// Fetch one entry.
    pub async fn get_entry(&self, _ctx: &RequestContext, id: Uuid) -> AppResult<Entry> {
        self.entries
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry not found"))
    }

    /// Move an entry under a new parent (None for root).
    ///
    /// Rejects cycles (a folder into itself or any of its descendants) and
    /// destination name collisions; rewrites the moved entry's lineage and
    /// splices every descendant's lineage; applies `-size` along the old
    /// ancestor chain and `+size` along the new one.
    pub async fn move_entry(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> AppResult<Entry> {
        let entry = self
            .entries
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry not found"))?;

        if entry.created_by != ctx.user_id {
            return Err(AppError::unauthorized("Entry belongs to another user"));
        }

        let (new_lineage, new_parent_name) = match new_parent {
            None => (Vec::new(), None),
            Some(dest_id) => {
                if dest_id == id {
                    return Err(AppError::conflict("Cannot move an entry into itself"));
                }
                let dest = self
                    .entries
                    .find_by_id(dest_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Destination folder not found"))?;
                if !dest.is_folder {
                    return Err(AppError::validation("Destination entry is not a folder"));
                }
                if dest.lineage.contains(&id) {
                    return Err(AppError::conflict(
                        "Cannot move a folder into one of its own descendants",
                    ));
                }
                (child_lineage(&dest.lineage, dest.id), Some(dest.name.clone()))
            }
        };

        if new_lineage == entry.lineage {
            return Ok(entry);
        }

        if let Some(sibling) = self.entries.find_sibling(&new_lineage, &entry.name).await? {
            if sibling.id != id {
                return Err(AppError::conflict(format!(
                    "An entry named '{}' already exists in the destination folder",
                    entry.name
                )));
            }
        }

        let old_parent_name = match entry.parent_id() {
            Some(parent_id) => self
                .entries
                .find_by_id(parent_id)
                .await?
                .map(|parent| parent.name),
            None => None,
        };

        let old_lineage = entry.lineage.clone();
        self.entries.set_lineage(id, &new_lineage).await?;

        if entry.is_folder {
            let old_prefix = descendant_prefix(&old_lineage, id);
            let new_prefix = descendant_prefix(&new_lineage, id);
            let descendants = self.entries.find_descendants(&old_prefix).await?;
            for descendant in &descendants {
                let rewritten = splice(&descendant.lineage, old_prefix.len(), &new_prefix);
                self.entries.set_lineage(descendant.id, &rewritten).await?;
            }
        }

        let delta = entry.accounted_size();
        self.entries.apply_size_delta(&old_lineage, -delta).await?;
        self.entries.apply_size_delta(&new_lineage, delta).await?;

        self.activity.notify(ActivityEvent {
            entry_id: id,
            actor: ctx.user_id,
            action: ActivityAction::Moved,
            item_name: entry.name.clone(),
            old_parent: old_parent_name,
            new_parent: new_parent_name,
        });

        info!(
            user_id = %ctx.user_id,
            entry_id = %id,
            name = %entry.name,
            "Entry moved"
        );

        self.entries
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry not found after move"))
    }

    async fn resolve_parent_lineage(&self, parent: Option<Uuid>) -> AppResult<Vec<Uuid>> {
        match parent {
            None => Ok(Vec::new()),
            Some(parent_id) => {
                let parent = self
                    .entries
                    .find_by_id(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Parent folder not found"))?;
                if !parent.is_folder {
                    return Err(AppError::validation("Parent entry is not a folder"));
                }
                Ok(child_lineage(&parent.lineage, parent.id))
            }
        }
    }
}
