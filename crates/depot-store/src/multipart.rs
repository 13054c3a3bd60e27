//! Multipart coordinator.
//!
//! Pure protocol adapter between an upload session and a remote multipart
//! session: 1-based part numbering, ascending-order finalization, abort.
//! Finalize is not idempotent; callers gate it with their chunk-set
//! completeness check so it runs at most once per session.

use std::sync::Arc;

use bytes::Bytes;

use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::storage::{ObjectStore, RemotePart};

/// Coordinates remote multipart sessions for upload sessions.
#[derive(Debug, Clone)]
pub struct MultipartCoordinator {
    store: Arc<dyn ObjectStore>,
}

impl MultipartCoordinator {
    /// Create a new coordinator over the given store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Open a remote multipart session for the given key.
    pub async fn open(&self, key: &str) -> AppResult<String> {
        self.store.create_multipart(key).await
    }

    /// Upload one part. Re-sending the same part number overwrites the
    /// previous data, which is what makes chunk retries and pause/resume
    /// safe without part deletion.
    pub async fn put_part(
        &self,
        key: &str,
        session_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> AppResult<RemotePart> {
        if part_number < 1 {
            return Err(AppError::validation(format!(
                "Remote part numbers are 1-based, got {part_number}"
            )));
        }
        self.store
            .upload_part(key, session_id, part_number, data)
            .await
    }

    /// Finalize the session from the recorded parts. Parts are sorted
    /// ascending by part number before submission, regardless of arrival
    /// order.
    pub async fn finalize(
        &self,
        key: &str,
        session_id: &str,
        parts: Vec<RemotePart>,
    ) -> AppResult<()> {
        let parts = sort_parts(parts);
        self.store.complete_multipart(key, session_id, &parts).await
    }

    /// Abort the session, discarding all uploaded parts.
    pub async fn abort(&self, key: &str, session_id: &str) -> AppResult<()> {
        self.store.abort_multipart(key, session_id).await
    }
}

/// Sort parts ascending by part number — the remote protocol requirement.
pub fn sort_parts(mut parts: Vec<RemotePart>) -> Vec<RemotePart> {
    parts.sort_by_key(|p| p.part_number);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;

    #[test]
    fn test_sort_parts_ascending() {
        let parts = vec![
            RemotePart {
                part_number: 3,
                etag: "c".to_string(),
            },
            RemotePart {
                part_number: 1,
                etag: "a".to_string(),
            },
            RemotePart {
                part_number: 2,
                etag: "b".to_string(),
            },
        ];
        let sorted = sort_parts(parts);
        let numbers: Vec<i32> = sorted.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_finalize_sorts_out_of_order_arrivals() {
        let store = Arc::new(MemoryObjectStore::new());
        let coordinator = MultipartCoordinator::new(store.clone());

        let session = coordinator.open("data.bin").await.unwrap();
        let mut parts = Vec::new();
        for number in [3, 1, 2] {
            let data = Bytes::from(vec![b'0' + number as u8; 4]);
            parts.push(
                coordinator
                    .put_part("data.bin", &session, number, data)
                    .await
                    .unwrap(),
            );
        }

        coordinator
            .finalize("data.bin", &session, parts)
            .await
            .unwrap();
        assert_eq!(
            store.get("data.bin").await.unwrap(),
            Bytes::from_static(b"111122223333")
        );
    }

    #[tokio::test]
    async fn test_zero_part_number_rejected() {
        let store = Arc::new(MemoryObjectStore::new());
        let coordinator = MultipartCoordinator::new(store);
        let session = coordinator.open("k").await.unwrap();

        let err = coordinator
            .put_part("k", &session, 0, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, depot_core::error::ErrorKind::Validation);
    }
}
