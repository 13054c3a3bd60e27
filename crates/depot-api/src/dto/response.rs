//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use depot_entity::entry::Entry;

/// Response of `POST /upload/initiate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    /// The new session id.
    pub upload_id: Uuid,
    /// Number of chunks the client must send.
    pub total_chunks: i32,
    /// Per-chunk size in bytes.
    pub chunk_size: i64,
    /// Presigned PUT URL, present for direct uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

/// Generic acknowledgement with a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable detail.
    pub message: String,
}

/// Response of `GET /upload/status/{uploadId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Session id.
    pub upload_id: Uuid,
    /// File name.
    pub file_name: String,
    /// Session status string.
    pub status: String,
    /// Progress percentage (0-100).
    pub progress: f64,
    /// Whether all chunks have been accepted.
    pub is_complete: bool,
    /// Chunks accepted so far.
    pub uploaded_chunks: i32,
    /// Total chunks expected.
    pub total_chunks: i32,
}

/// Response of `POST /upload/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    /// Whether the completion succeeded.
    pub success: bool,
    /// Final remote object key.
    pub remote_key: String,
    /// Final stored size in bytes.
    pub size: i64,
}

/// Response of `POST /upload/folder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    /// The new folder's id.
    pub upload_id: Uuid,
}

/// Response of the delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Whether the deletion succeeded.
    pub success: bool,
    /// Number of entries removed, including descendants.
    pub removed: u64,
}

/// One tree entry in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    /// Entry id (doubles as the upload session id for files).
    pub upload_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether the entry is a folder.
    pub is_folder: bool,
    /// Stored size in bytes (derived aggregate for folders).
    pub size: i64,
    /// Immediate parent id, if any.
    pub parent: Option<Uuid>,
    /// Session status.
    pub status: String,
    /// Upload progress percentage.
    pub progress: f64,
    /// Owning user.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&Entry> for EntryResponse {
    fn from(entry: &Entry) -> Self {
        Self {
            upload_id: entry.id,
            name: entry.name.clone(),
            is_folder: entry.is_folder,
            size: entry.size_bytes,
            parent: entry.parent_id(),
            status: entry.status.clone(),
            progress: if entry.is_completed() {
                100.0
            } else {
                entry.progress_percent()
            },
            created_by: entry.created_by,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Listing response of `GET /upload/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Direct children of the requested scope.
    pub items: Vec<EntryResponse>,
}
