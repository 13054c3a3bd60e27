//! The upload session state machine.
//!
//! Sessions move `initiated → uploading → completed`, with cancel and
//! pause side transitions. Ancestor sizes are applied optimistically at
//! initiation and compensated on cancel/reap; quota is only counted at
//! completion and deletion of completed files.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use depot_core::config::store::StoreConfig;
use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::quota::QuotaAccountant;
use depot_core::traits::storage::ObjectStore;
use depot_database::store::EntryStore;
use depot_entity::activity::ActivityAction;
use depot_entity::entry::lineage::{child_lineage, descendant_prefix};
use depot_entity::entry::{Entry, NewEntry, UploadStatus};
use depot_store::keys::object_key;
use depot_store::multipart::MultipartCoordinator;

use crate::activity::{ActivityEvent, ActivityNotifier};
use crate::context::RequestContext;

use super::plan_chunks;

/// How an upload's content reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Resumable chunked transfer through the server, one remote part per
    /// chunk.
    Chunked,
    /// Client-driven single-shot transfer via a presigned URL.
    Direct,
}

/// Parameters for initiating an upload session.
#[derive(Debug, Clone)]
pub struct InitiateUpload {
    /// File name.
    pub name: String,
    /// Declared total size in bytes.
    pub size_bytes: i64,
    /// Target parent folder (None for root).
    pub parent: Option<Uuid>,
    /// Expected content hash, if the client computed one.
    pub content_hash: Option<String>,
    /// Transfer mode.
    pub kind: ResourceKind,
}

/// Result of initiating an upload session.
#[derive(Debug, Clone)]
pub struct InitiatedUpload {
    /// The new session (and entry) id.
    pub upload_id: Uuid,
    /// Number of chunks the client must send.
    pub total_chunks: i32,
    /// Size of each chunk in bytes.
    pub chunk_size_bytes: i64,
    /// Presigned PUT URL for direct uploads.
    pub upload_url: Option<String>,
}

/// Result of accepting one chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOutcome {
    /// Whether this call added a new chunk (false on an idempotent retry).
    pub accepted: bool,
    /// Whether this call completed the session.
    pub completed: bool,
}

/// Progress snapshot of a session.
#[derive(Debug, Clone)]
pub struct UploadStatusReport {
    /// Session id.
    pub upload_id: Uuid,
    /// File name.
    pub name: String,
    /// Current session status.
    pub status: String,
    /// Progress percentage (0-100).
    pub progress_percent: f64,
    /// Whether all chunks have been accepted.
    pub is_complete: bool,
    /// Chunks accepted so far.
    pub uploaded_chunks: i32,
    /// Total chunks expected.
    pub total_chunks: i32,
}

/// Result of completing an upload.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    /// Session id.
    pub upload_id: Uuid,
    /// Final remote object key.
    pub remote_key: String,
    /// Final stored size in bytes.
    pub size_bytes: i64,
}

/// Result of a delete/cancel cascade.
#[derive(Debug, Clone, Copy)]
pub struct RemovedEntries {
    /// Number of entries removed, including descendants.
    pub removed: u64,
}

/// Owns the upload session lifecycle: initiation, chunk acceptance,
/// completion, pause, cancellation, and deletion cascades.
#[derive(Debug, Clone)]
pub struct UploadEngine {
    /// Entry persistence.
    entries: Arc<dyn EntryStore>,
    /// Remote object store (single-shot operations and presigning).
    object_store: Arc<dyn ObjectStore>,
    /// Multipart protocol adapter.
    coordinator: MultipartCoordinator,
    /// Quota collaborator.
    quota: Arc<dyn QuotaAccountant>,
    /// Activity collaborator.
    activity: Arc<dyn ActivityNotifier>,
    /// Upload configuration.
    config: StoreConfig,
}

impl UploadEngine {
    /// Create a new upload engine.
    pub fn new(
        entries: Arc<dyn EntryStore>,
        object_store: Arc<dyn ObjectStore>,
        quota: Arc<dyn QuotaAccountant>,
        activity: Arc<dyn ActivityNotifier>,
        config: StoreConfig,
    ) -> Self {
        let coordinator = MultipartCoordinator::new(Arc::clone(&object_store));
        Self {
            entries,
            object_store,
            coordinator,
            quota,
            activity,
            config,
        }
    }

    /// Initiate an upload session.
    ///
    /// Validates the parent and sibling-name uniqueness, checks quota
    /// before any remote session is opened, opens the remote multipart
    /// session (or presigns a direct URL), persists the entry, and applies
    /// the declared size optimistically to every ancestor.
    pub async fn initiate(
        &self,
        ctx: &RequestContext,
        req: InitiateUpload,
    ) -> AppResult<InitiatedUpload> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("File name cannot be empty"));
        }
        if req.size_bytes < 0 {
            return Err(AppError::validation("File size cannot be negative"));
        }
        if req.size_bytes > self.config.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {} bytes",
                self.config.max_upload_size_bytes
            )));
        }

        let lineage = self.resolve_parent_lineage(req.parent).await?;

        if self
            .entries
            .find_sibling(&lineage, &req.name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "An entry named '{}' already exists in this folder",
                req.name
            )));
        }

        // Quota gate before any remote transfer resource is created.
        self.quota.check_quota(ctx.user_id, req.size_bytes).await?;

        let upload_id = Uuid::new_v4();
        let key = object_key(upload_id, &req.name);

        let (total_chunks, chunk_size_bytes, remote_session_id, upload_url) = match req.kind {
            ResourceKind::Chunked => {
                let session = self.coordinator.open(&key).await?;
                let (total_chunks, chunk_size) =
                    plan_chunks(req.size_bytes, self.config.chunk_size_bytes);
                (total_chunks, chunk_size, Some(session), None)
            }
            ResourceKind::Direct => {
                let url = self
                    .object_store
                    .presign_put(&key, Duration::from_secs(self.config.presign_expiry_seconds))
                    .await?;
                (1, req.size_bytes, None, Some(url))
            }
        };

        self.entries
            .insert(&NewEntry {
                id: upload_id,
                name: req.name.clone(),
                is_folder: false,
                lineage: lineage.clone(),
                status: UploadStatus::Initiated,
                declared_size_bytes: req.size_bytes,
                total_chunks,
                chunk_size_bytes,
                remote_key: Some(key),
                remote_session_id,
                content_hash: req.content_hash,
                created_by: ctx.user_id,
            })
            .await?;

        // Optimistic ancestor accounting, reversed on cancel/reap.
        self.entries
            .apply_size_delta(&lineage, req.size_bytes)
            .await?;

        self.activity.notify(ActivityEvent {
            entry_id: upload_id,
            actor: ctx.user_id,
            action: ActivityAction::Created,
            item_name: req.name.clone(),
            old_parent: None,
            new_parent: None,
        });

        info!(
            user_id = %ctx.user_id,
            upload_id = %upload_id,
            name = %req.name,
            size = req.size_bytes,
            total_chunks,
            "Upload session initiated"
        );

        Ok(InitiatedUpload {
            upload_id,
            total_chunks,
            chunk_size_bytes,
            upload_url,
        })
    }

    /// Accept one chunk, forwarding it as remote part `index + 1`.
    ///
    /// Idempotent under retry and safe under concurrent calls for
    /// different indices: the chunk-set insert is a single atomic store
    /// operation, and completion fires only for the call whose insert
    /// filled the set.
    pub async fn accept_chunk(
        &self,
        ctx: &RequestContext,
        upload_id: Uuid,
        index: i32,
        data: Bytes,
    ) -> AppResult<ChunkOutcome> {
        let entry = self.fetch_session(ctx, upload_id).await?;

        let status = entry
            .upload_status()
            .ok_or_else(|| AppError::internal(format!("Unknown status '{}'", entry.status)))?;
        if !status.accepts_chunks() {
            return Err(AppError::conflict(format!(
                "Upload session is {status} and cannot accept chunks"
            )));
        }

        if index < 0 || index >= entry.total_chunks {
            return Err(AppError::validation(format!(
                "Invalid chunk index: {index} (total: {})",
                entry.total_chunks
            )));
        }

        let (key, session_id) = match (&entry.remote_key, &entry.remote_session_id) {
            (Some(key), Some(session_id)) => (key.clone(), session_id.clone()),
            _ => {
                // The session row exists but its remote half is gone.
                // Recoverable: the client must re-initiate.
                return Err(AppError::conflict(
                    "Upload session has no remote multipart session; re-initiate the upload",
                ));
            }
        };

        let part = self
            .coordinator
            .put_part(&key, &session_id, index + 1, data)
            .await?;

        let append = self.entries.append_chunk(upload_id, index, &part).await?;

        let completed = append.completed_set();
        if completed {
            self.finalize_chunked(ctx, upload_id).await?;
        }

        Ok(ChunkOutcome {
            accepted: append.inserted,
            completed,
        })
    }

    /// Complete a session explicitly.
    ///
    /// Chunked sessions require the full chunk set; direct sessions
    /// reconcile the actually-stored object against the declared size.
    /// Completing an already-completed session is a no-op.
    pub async fn complete(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<CompletedUpload> {
        let entry = self.fetch_session(ctx, upload_id).await?;

        if entry.is_completed() {
            return Ok(CompletedUpload {
                upload_id,
                remote_key: entry.remote_key.clone().unwrap_or_default(),
                size_bytes: entry.size_bytes,
            });
        }

        if entry.remote_session_id.is_some() {
            if !entry.has_all_chunks() {
                let missing: Vec<i32> = (0..entry.total_chunks)
                    .filter(|i| !entry.uploaded_chunks.contains(i))
                    .collect();
                return Err(AppError::validation(format!("Missing chunks: {missing:?}")));
            }
            self.finalize_chunked(ctx, upload_id).await
        } else {
            self.finalize_direct(ctx, &entry).await
        }
    }

    /// Pause one chunk: drop it from the accepted set so it is re-sent on
    /// resume. The superseded remote part is overwritten by the re-upload
    /// of the same part number.
    pub async fn pause_chunk(
        &self,
        ctx: &RequestContext,
        upload_id: Uuid,
        index: i32,
    ) -> AppResult<()> {
        let entry = self.fetch_session(ctx, upload_id).await?;

        if entry.is_completed() {
            return Err(AppError::conflict("Upload session is already completed"));
        }
        if index < 0 || index >= entry.total_chunks {
            return Err(AppError::validation(format!(
                "Invalid chunk index: {index} (total: {})",
                entry.total_chunks
            )));
        }

        self.entries.remove_chunk(upload_id, index).await?;

        info!(upload_id = %upload_id, chunk = index, "Upload paused at chunk");
        Ok(())
    }

    /// Progress snapshot for a session.
    pub async fn status(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<UploadStatusReport> {
        let entry = self.fetch_session(ctx, upload_id).await?;

        Ok(UploadStatusReport {
            upload_id,
            name: entry.name.clone(),
            status: entry.status.clone(),
            progress_percent: if entry.is_completed() {
                100.0
            } else {
                entry.progress_percent()
            },
            is_complete: entry.is_completed() || entry.has_all_chunks(),
            uploaded_chunks: entry.uploaded_count() as i32,
            total_chunks: entry.total_chunks,
        })
    }

    /// Delete an entry: cancel an in-flight session, tear down a completed
    /// file, or cascade a folder with all its descendants.
    pub async fn remove(&self, ctx: &RequestContext, id: Uuid) -> AppResult<RemovedEntries> {
        let entry = self
            .entries
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry not found"))?;

        if entry.created_by != ctx.user_id {
            return Err(AppError::unauthorized("Entry belongs to another user"));
        }

        let removed = if entry.is_folder {
            self.remove_folder(ctx, &entry).await?
        } else if entry.is_completed() {
            self.remove_completed_file(ctx, &entry).await?
        } else {
            self.cancel_session(ctx, &entry).await?
        };

        Ok(RemovedEntries { removed })
    }

    /// Delete a batch of entries. Ids already removed as part of an
    /// earlier folder cascade in the same batch are skipped.
    pub async fn remove_many(&self, ctx: &RequestContext, ids: &[Uuid]) -> AppResult<RemovedEntries> {
        let mut removed = 0;
        for id in ids {
            match self.remove(ctx, *id).await {
                Ok(result) => removed += result.removed,
                Err(e) if e.kind == depot_core::error::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(RemovedEntries { removed })
    }

    // ── internals ────────────────────────────────────────────────

    /// Fetch a non-folder session owned by the caller.
    async fn fetch_session(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<Entry> {
        let entry = self
            .entries
            .find_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::not_found("Upload session not found"))?;

        if entry.is_folder {
            return Err(AppError::validation("Entry is a folder, not an upload session"));
        }
        if entry.created_by != ctx.user_id {
            return Err(AppError::unauthorized("Upload session belongs to another user"));
        }
        Ok(entry)
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

    /// Finalize a chunked session: sort-and-submit the recorded parts,
    /// clear the transient remote fields, count quota. Ancestor sizes were
    /// already applied at initiation.
    async fn finalize_chunked(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<CompletedUpload> {
        let entry = self
            .entries
            .find_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::not_found("Upload session not found"))?;

        let key = entry
            .remote_key
            .clone()
            .ok_or_else(|| AppError::conflict("Upload session has no remote key"))?;
        let session_id = entry
            .remote_session_id
            .clone()
            .ok_or_else(|| AppError::conflict("Upload session has no remote multipart session"))?;

        self.coordinator
            .finalize(&key, &session_id, entry.remote_part_list())
            .await?;

        self.entries
            .mark_completed(upload_id, entry.declared_size_bytes)
            .await?;
        self.quota
            .adjust_used(entry.created_by, entry.declared_size_bytes)
            .await?;

        self.activity.notify(ActivityEvent {
            entry_id: upload_id,
            actor: ctx.user_id,
            action: ActivityAction::Completed,
            item_name: entry.name.clone(),
            old_parent: None,
            new_parent: None,
        });

        info!(
            upload_id = %upload_id,
            name = %entry.name,
            size = entry.declared_size_bytes,
            chunks = entry.total_chunks,
            "Chunked upload completed"
        );

        Ok(CompletedUpload {
            upload_id,
            remote_key: key,
            size_bytes: entry.declared_size_bytes,
        })
    }

    /// Confirm a direct upload: head the stored object, reconcile the
    /// actual size against the declared one, count quota with the actual
    /// size.
    async fn finalize_direct(&self, ctx: &RequestContext, entry: &Entry) -> AppResult<CompletedUpload> {
        let key = entry
            .remote_key
            .clone()
            .ok_or_else(|| AppError::conflict("Upload session has no remote key"))?;

        let meta = self.object_store.head(&key).await?.ok_or_else(|| {
            AppError::validation(
                "Object has not been stored yet; upload via the presigned URL first",
            )
        })?;

        let actual_size = meta.size_bytes;
        let drift = actual_size - entry.declared_size_bytes;
        if drift != 0 {
            self.entries.apply_size_delta(&entry.lineage, drift).await?;
        }

        self.entries.mark_completed(entry.id, actual_size).await?;
        self.quota.adjust_used(entry.created_by, actual_size).await?;

        self.activity.notify(ActivityEvent {
            entry_id: entry.id,
            actor: ctx.user_id,
            action: ActivityAction::Completed,
            item_name: entry.name.clone(),
            old_parent: None,
            new_parent: None,
        });

        info!(
            upload_id = %entry.id,
            name = %entry.name,
            declared = entry.declared_size_bytes,
            actual = actual_size,
            "Direct upload confirmed"
        );

        Ok(CompletedUpload {
            upload_id: entry.id,
            remote_key: key,
            size_bytes: actual_size,
        })
    }

    /// Cancel an in-flight session: abort the remote multipart session and
    /// delete any stored object (both best-effort), reverse the optimistic
    /// ancestor delta, drop the entry and its dependent records.
    async fn cancel_session(&self, ctx: &RequestContext, entry: &Entry) -> AppResult<u64> {
        if let (Some(key), Some(session_id)) = (&entry.remote_key, &entry.remote_session_id) {
            if let Err(e) = self.coordinator.abort(key, session_id).await {
                warn!(upload_id = %entry.id, error = %e, "Failed to abort remote multipart session");
            }
        }
        if let Some(key) = &entry.remote_key {
            if let Err(e) = self.object_store.delete(key).await {
                warn!(upload_id = %entry.id, error = %e, "Failed to delete remote object");
            }
        }

        self.entries
            .apply_size_delta(&entry.lineage, -entry.accounted_size())
            .await?;

        self.activity.notify(ActivityEvent {
            entry_id: entry.id,
            actor: ctx.user_id,
            action: ActivityAction::Deleted,
            item_name: entry.name.clone(),
            old_parent: None,
            new_parent: None,
        });
        self.activity.purge(&[entry.id]).await?;
        self.entries.delete(entry.id).await?;

        info!(upload_id = %entry.id, name = %entry.name, "Upload session canceled");
        Ok(1)
    }

    /// Delete a completed file: reverse ancestor sizes and quota, then
    /// drop the entry. The remote object delete is best-effort — a
    /// retained orphan beats a stuck delete.
    async fn remove_completed_file(&self, ctx: &RequestContext, entry: &Entry) -> AppResult<u64> {
        self.entries
            .apply_size_delta(&entry.lineage, -entry.size_bytes)
            .await?;
        self.quota
            .adjust_used(entry.created_by, -entry.size_bytes)
            .await?;

        if let Some(key) = &entry.remote_key {
            if let Err(e) = self.object_store.delete(key).await {
                warn!(entry_id = %entry.id, error = %e, "Failed to delete remote object");
            }
        }

        self.activity.notify(ActivityEvent {
            entry_id: entry.id,
            actor: ctx.user_id,
            action: ActivityAction::Deleted,
            item_name: entry.name.clone(),
            old_parent: None,
            new_parent: None,
        });
        self.activity.purge(&[entry.id]).await?;
        self.entries.delete(entry.id).await?;

        info!(entry_id = %entry.id, name = %entry.name, "File deleted");
        Ok(1)
    }

    /// Delete a folder and every descendant: one ancestor adjustment of
    /// the folder's aggregate size, per-owner quota decrements for the
    /// completed files inside, best-effort remote cleanup for everything.
    async fn remove_folder(&self, ctx: &RequestContext, folder: &Entry) -> AppResult<u64> {
        let prefix = descendant_prefix(&folder.lineage, folder.id);
        let descendants = self.entries.find_descendants(&prefix).await?;

        self.entries
            .apply_size_delta(&folder.lineage, -folder.size_bytes)
            .await?;

        for descendant in &descendants {
            if descendant.is_folder {
                continue;
            }
            if descendant.is_completed() {
                self.quota
                    .adjust_used(descendant.created_by, -descendant.size_bytes)
                    .await?;
            } else if let (Some(key), Some(session_id)) =
                (&descendant.remote_key, &descendant.remote_session_id)
            {
                if let Err(e) = self.coordinator.abort(key, session_id).await {
                    warn!(entry_id = %descendant.id, error = %e, "Failed to abort multipart session");
                }
            }
            if let Some(key) = &descendant.remote_key {
                if let Err(e) = self.object_store.delete(key).await {
                    warn!(entry_id = %descendant.id, error = %e, "Failed to delete remote object");
                }
            }
        }

        let mut ids: Vec<Uuid> = Vec::with_capacity(descendants.len() + 1);
        ids.push(folder.id);
        ids.extend(descendants.iter().map(|d| d.id));

        self.activity.notify(ActivityEvent {
            entry_id: folder.id,
            actor: ctx.user_id,
            action: ActivityAction::Deleted,
            item_name: folder.name.clone(),
            old_parent: None,
            new_parent: None,
        });
        self.activity.purge(&ids).await?;
        let removed = self.entries.delete_many(&ids).await?;

        info!(
            folder_id = %folder.id,
            name = %folder.name,
            removed,
            "Folder deleted with descendants"
        );
        Ok(removed)
    }
}
