//! Object store trait for pluggable remote storage backends.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    /// Object key within the store.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Entity tag reported by the store.
    pub etag: Option<String>,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// One uploaded part of a remote multipart session.
///
/// Part numbers are 1-based, per the S3 multipart protocol. The ETag is
/// returned by the store on part upload and must be echoed back verbatim
/// when the session is finalized.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemotePart {
    /// The part number (1-based).
    pub part_number: i32,
    /// The entity tag for this part.
    pub etag: String,
}

/// Trait for S3-compatible object store backends.
///
/// The trait is defined here in `depot-core` and implemented in
/// `depot-store` (S3 and an in-memory backend for tests and single-node
/// development). It is a thin protocol wrapper: no business logic.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g., "s3", "memory").
    fn provider_type(&self) -> &str;

    /// Store a complete object in a single request.
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Read a complete object into memory.
    async fn get(&self, key: &str) -> AppResult<Bytes>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Fetch object metadata, or `None` when the key does not exist.
    async fn head(&self, key: &str) -> AppResult<Option<ObjectMeta>>;

    /// List objects under a key prefix.
    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectMeta>>;

    /// Generate a presigned single-shot PUT URL for client-driven uploads.
    async fn presign_put(&self, key: &str, expires_in: Duration) -> AppResult<String>;

    /// Open a multipart session for the given key, returning its id.
    async fn create_multipart(&self, key: &str) -> AppResult<String>;

    /// Upload one part. Re-uploading the same part number overwrites it.
    async fn upload_part(
        &self,
        key: &str,
        session_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> AppResult<RemotePart>;

    /// Finalize a multipart session. Parts must be in ascending part-number
    /// order; the store rejects anything else. Not idempotent.
    async fn complete_multipart(
        &self,
        key: &str,
        session_id: &str,
        parts: &[RemotePart],
    ) -> AppResult<()>;

    /// Abort a multipart session, discarding all uploaded parts.
    async fn abort_multipart(&self, key: &str, session_id: &str) -> AppResult<()>;
}
