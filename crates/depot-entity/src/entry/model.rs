//! Entry entity model.
//!
//! Files and folders share one polymorphic row type, discriminated by
//! `is_folder`. Upload-session bookkeeping lives on the same row, so an
//! in-progress chunked upload *is* its tree entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use depot_core::traits::storage::RemotePart;

use super::status::UploadStatus;

/// A file or folder node in the Depot tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    /// Unique entry identifier, assigned at creation.
    pub id: Uuid,
    /// Display name; unique among siblings sharing the same lineage.
    pub name: String,
    /// Whether this entry is a folder.
    pub is_folder: bool,
    /// Files: byte length of complete content (0 until the upload
    /// completes). Folders: eagerly-maintained sum of all accounted
    /// descendant file sizes.
    pub size_bytes: i64,
    /// The size declared at initiation, used for optimistic ancestor
    /// accounting while the upload is in flight.
    pub declared_size_bytes: i64,
    /// Ordered ancestor ids, root-first, excluding self. Empty at root.
    pub lineage: Vec<Uuid>,
    /// Current upload status (folders are created "completed").
    pub status: String,
    /// Total number of chunks expected.
    pub total_chunks: i32,
    /// Size of each chunk in bytes.
    pub chunk_size_bytes: i64,
    /// Accepted chunk indices. Set semantics are enforced by the store.
    pub uploaded_chunks: Vec<i32>,
    /// Object key in the remote store.
    pub remote_key: Option<String>,
    /// Remote multipart session id, while one is open.
    pub remote_session_id: Option<String>,
    /// Recorded remote parts (JSON array of `{part_number, etag}`).
    pub remote_parts: serde_json::Value,
    /// Expected content hash supplied by the client.
    pub content_hash: Option<String>,
    /// Owning user, used for quota accounting.
    pub created_by: Uuid,
    /// Bumped on every chunk acceptance; drives staleness detection.
    pub last_activity: DateTime<Utc>,
    /// Content version, bumped on replacement by the revision subsystem.
    pub version: i32,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Parse the stored status string.
    pub fn upload_status(&self) -> Option<UploadStatus> {
        UploadStatus::parse(&self.status)
    }

    /// Whether the upload has completed.
    pub fn is_completed(&self) -> bool {
        self.status == UploadStatus::Completed.as_str()
    }

    /// Number of chunks accepted so far.
    pub fn uploaded_count(&self) -> usize {
        self.uploaded_chunks.len()
    }

    /// Check if all chunks have been accepted.
    pub fn has_all_chunks(&self) -> bool {
        self.uploaded_count() as i32 >= self.total_chunks
    }

    /// Upload progress as a percentage (0-100).
    pub fn progress_percent(&self) -> f64 {
        if self.total_chunks <= 0 {
            return 0.0;
        }
        (self.uploaded_count() as f64 / self.total_chunks as f64) * 100.0
    }

    /// The recorded remote parts.
    pub fn remote_part_list(&self) -> Vec<RemotePart> {
        serde_json::from_value(self.remote_parts.clone()).unwrap_or_default()
    }

    /// The size this entry currently contributes to its ancestors.
    ///
    /// Completed files and folders contribute their stored size; in-flight
    /// uploads contribute the declared size applied optimistically at
    /// initiation.
    pub fn accounted_size(&self) -> i64 {
        if self.is_folder || self.is_completed() {
            self.size_bytes
        } else {
            self.declared_size_bytes
        }
    }

    /// The immediate parent id, if any.
    pub fn parent_id(&self) -> Option<Uuid> {
        self.lineage.last().copied()
    }
}

/// Data required to create a new entry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    /// Entry id, generated by the caller so the remote object key can be
    /// derived before the row exists.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this entry is a folder.
    pub is_folder: bool,
    /// Ancestor chain.
    pub lineage: Vec<Uuid>,
    /// Initial status.
    pub status: UploadStatus,
    /// Declared total size in bytes.
    pub declared_size_bytes: i64,
    /// Total chunks expected (0 for folders).
    pub total_chunks: i32,
    /// Chunk size in bytes (0 for folders).
    pub chunk_size_bytes: i64,
    /// Remote object key.
    pub remote_key: Option<String>,
    /// Remote multipart session id.
    pub remote_session_id: Option<String>,
    /// Expected content hash.
    pub content_hash: Option<String>,
    /// Owning user.
    pub created_by: Uuid,
}
