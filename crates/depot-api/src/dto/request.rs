//! Request DTOs with validation.
//!
//! The wire shapes use camelCase field names; they are the upload-surface
//! contract and are kept stable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /upload/initiate`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    /// File name.
    #[validate(length(min = 1, message = "fileName is required"))]
    pub file_name: String,
    /// Declared file size in bytes.
    pub file_size: i64,
    /// Target parent folder id.
    #[serde(default)]
    pub parent: Option<Uuid>,
    /// Client-supplied lineage hint. Accepted for wire compatibility; the
    /// server always recomputes the lineage from `parent`.
    #[serde(default)]
    pub children: Option<Vec<Uuid>>,
    /// Expected content hash.
    #[serde(default)]
    pub file_hash: Option<String>,
    /// Transfer mode: "chunked" (default) or "direct".
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
}

fn default_resource_type() -> String {
    "chunked".to_string()
}

/// Body of `POST /upload/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    /// The session to complete.
    pub upload_id: Uuid,
}

/// Query parameters of `PUT /upload/pause/{uploadId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseParams {
    /// The chunk to drop from the accepted set.
    pub chunk_index: i32,
}

/// Body of `PUT /upload/move/{uploadId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEntryRequest {
    /// Destination folder id, or null for the root.
    #[serde(default)]
    pub new_parent_id: Option<Uuid>,
}

/// Body of `POST /upload/folder`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(length(min = 1, message = "folderName is required"))]
    pub folder_name: String,
    /// Declared folder size. Accepted for wire compatibility and ignored:
    /// folder sizes are derived aggregates.
    #[serde(default)]
    pub folder_size: Option<i64>,
    /// Parent folder id.
    #[serde(default)]
    pub parent: Option<Uuid>,
}

/// Body of `DELETE /upload/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllRequest {
    /// The entries to delete, cascading folders.
    pub upload_ids: Vec<Uuid>,
}

/// Query parameters of `GET /upload/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Folder whose direct children to list; omitted or empty for root
    /// items.
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl ListParams {
    /// Parse the folder id, treating an empty value as the root scope.
    pub fn folder(&self) -> Result<Option<Uuid>, uuid::Error> {
        match self.folder_id.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}
