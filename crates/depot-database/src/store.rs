//! The entry store abstraction.
//!
//! Lineage-aware persistence for tree entries. Two backends implement the
//! trait: [`crate::repositories::entry::PgEntryStore`] for production and
//! [`crate::memory::entry::MemoryEntryStore`] for tests and single-node
//! development mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use depot_core::result::AppResult;
use depot_core::traits::storage::RemotePart;
use depot_entity::entry::{Entry, NewEntry, UploadStatus};

/// Outcome of an atomic chunk-set insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAppend {
    /// Whether this call actually inserted the index (false on a retry of
    /// an already-accepted chunk).
    pub inserted: bool,
    /// Cardinality of the chunk set after the call.
    pub uploaded_count: i32,
    /// Total chunks expected for the session.
    pub total_chunks: i32,
}

impl ChunkAppend {
    /// Whether this call was the one that completed the chunk set.
    ///
    /// True for exactly one call per session regardless of arrival order
    /// or concurrent retries, which is what gates finalization.
    pub fn completed_set(&self) -> bool {
        self.inserted && self.uploaded_count >= self.total_chunks
    }
}

/// Persistence gateway for folder-tree entries.
///
/// All mutating operations are atomic per entry; multi-entry walks
/// (ancestor size propagation, descendant lineage rewrites) are not
/// transactional across rows — idempotent retries and the reaper are the
/// mitigation for mid-walk failures.
#[async_trait]
pub trait EntryStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new entry row.
    async fn insert(&self, entry: &NewEntry) -> AppResult<Entry>;

    /// Find an entry by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Entry>>;

    /// Direct children: entries whose lineage equals the given chain
    /// exactly. Pass an empty slice for root items.
    async fn find_children(&self, lineage: &[Uuid]) -> AppResult<Vec<Entry>>;

    /// All descendants: entries whose lineage starts with the given
    /// prefix (the ancestor's own lineage plus its id).
    async fn find_descendants(&self, prefix: &[Uuid]) -> AppResult<Vec<Entry>>;

    /// Duplicate-name probe: the sibling with this exact name under this
    /// exact lineage, if one exists. Case-sensitive.
    async fn find_sibling(&self, lineage: &[Uuid], name: &str) -> AppResult<Option<Entry>>;

    /// Atomically add a chunk index to the session's set and record the
    /// remote part, bumping `last_activity`. Idempotent: re-adding an
    /// existing index reports `inserted: false` and changes nothing.
    async fn append_chunk(&self, id: Uuid, index: i32, part: &RemotePart) -> AppResult<ChunkAppend>;

    /// Remove a chunk index (and its recorded remote part) so the chunk is
    /// re-sent on resume. Marks the session paused.
    async fn remove_chunk(&self, id: Uuid, index: i32) -> AppResult<()>;

    /// Apply a signed size delta to every listed entry, clamped at zero.
    /// One atomic statement per backend; no read-modify-write.
    async fn apply_size_delta(&self, ids: &[Uuid], delta: i64) -> AppResult<()>;

    /// Overwrite the session status.
    async fn set_status(&self, id: Uuid, status: UploadStatus) -> AppResult<()>;

    /// Mark an upload completed: set the final size, clear the transient
    /// multipart fields, keep the remote key.
    async fn mark_completed(&self, id: Uuid, size_bytes: i64) -> AppResult<()>;

    /// Rewrite an entry's lineage (move support).
    async fn set_lineage(&self, id: Uuid, lineage: &[Uuid]) -> AppResult<()>;

    /// Delete one entry. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Delete a batch of entries, returning the number removed.
    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64>;

    /// Non-folder sessions that are not completed and have been inactive
    /// since before the cutoff — the reaper's work list.
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Entry>>;
}
