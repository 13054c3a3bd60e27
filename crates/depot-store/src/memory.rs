//! In-memory object store for tests and single-node development.
//!
//! Implements the same protocol contract as the S3 backend, including the
//! ascending-part-order requirement on multipart completion, so protocol
//! mistakes surface in tests instead of against a real store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;

use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::storage::{ObjectMeta, ObjectStore, RemotePart};

/// One open multipart session.
#[derive(Debug, Default)]
struct MultipartSession {
    key: String,
    parts: BTreeMap<i32, (String, Bytes)>,
}

/// Object store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Bytes>,
    sessions: DashMap<String, MultipartSession>,
    session_counter: AtomicU64,
    aborts: AtomicU64,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of currently open multipart sessions.
    pub fn open_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of multipart sessions aborted over the store's lifetime.
    pub fn abort_count(&self) -> u64 {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Whether an object exists at the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

fn pseudo_etag(data: &Bytes) -> String {
    // FNV-1a; only needs to be deterministic and content-sensitive.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in data.iter() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("\"{hash:016x}\"")
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Object '{key}' not found")))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<ObjectMeta>> {
        Ok(self.objects.get(key).map(|entry| ObjectMeta {
            key: key.to_string(),
            size_bytes: entry.value().len() as i64,
            etag: Some(pseudo_etag(entry.value())),
            last_modified: Some(Utc::now()),
        }))
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| ObjectMeta {
                key: entry.key().clone(),
                size_bytes: entry.value().len() as i64,
                etag: Some(pseudo_etag(entry.value())),
                last_modified: Some(Utc::now()),
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        Ok(format!(
            "memory://{key}?expires={}",
            expires_in.as_secs()
        ))
    }

    async fn create_multipart(&self, key: &str) -> AppResult<String> {
        let session_id = format!(
            "mem-mp-{}",
            self.session_counter.fetch_add(1, Ordering::SeqCst)
        );
        self.sessions.insert(
            session_id.clone(),
            MultipartSession {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(session_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        session_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> AppResult<RemotePart> {
        if part_number < 1 {
            return Err(AppError::storage(format!(
                "Part numbers are 1-based, got {part_number}"
            )));
        }

        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::storage(format!("Unknown multipart session {session_id}")))?;
        if session.key != key {
            return Err(AppError::storage(format!(
                "Multipart session {session_id} belongs to a different key"
            )));
        }

        let etag = pseudo_etag(&data);
        session.parts.insert(part_number, (etag.clone(), data));
        Ok(RemotePart { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        key: &str,
        session_id: &str,
        parts: &[RemotePart],
    ) -> AppResult<()> {
        if parts.is_empty() {
            return Err(AppError::storage("Cannot complete a multipart session with no parts"));
        }
        // The real protocol rejects out-of-order part lists.
        for pair in parts.windows(2) {
            if pair[1].part_number <= pair[0].part_number {
                return Err(AppError::storage(
                    "Multipart completion requires parts in ascending part-number order",
                ));
            }
        }

        let (_, session) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| AppError::storage(format!("Unknown multipart session {session_id}")))?;

        let mut assembled = Vec::new();
        for part in parts {
            let (etag, data) = session.parts.get(&part.part_number).ok_or_else(|| {
                AppError::storage(format!("Part {} was never uploaded", part.part_number))
            })?;
            if *etag != part.etag {
                return Err(AppError::storage(format!(
                    "ETag mismatch for part {}",
                    part.part_number
                )));
            }
            assembled.extend_from_slice(data);
        }

        self.objects.insert(key.to_string(), Bytes::from(assembled));
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, session_id: &str) -> AppResult<()> {
        self.sessions.remove(session_id);
        self.aborts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_head_delete() {
        let store = MemoryObjectStore::new();
        store.put("a/b", Bytes::from_static(b"hello")).await.unwrap();

        let meta = store.head("a/b").await.unwrap().unwrap();
        assert_eq!(meta.size_bytes, 5);
        assert_eq!(store.get("a/b").await.unwrap(), Bytes::from_static(b"hello"));

        store.delete("a/b").await.unwrap();
        assert!(store.head("a/b").await.unwrap().is_none());
        assert!(store.get("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_multipart_assembles_in_part_order() {
        let store = MemoryObjectStore::new();
        let session = store.create_multipart("big.bin").await.unwrap();

        // Parts arrive out of order; completion receives them sorted.
        let p2 = store
            .upload_part("big.bin", &session, 2, Bytes::from_static(b"world"))
            .await
            .unwrap();
        let p1 = store
            .upload_part("big.bin", &session, 1, Bytes::from_static(b"hello "))
            .await
            .unwrap();

        store
            .complete_multipart("big.bin", &session, &[p1, p2])
            .await
            .unwrap();
        assert_eq!(
            store.get("big.bin").await.unwrap(),
            Bytes::from_static(b"hello world")
        );
        assert_eq!(store.open_session_count(), 0);
    }

    #[tokio::test]
    async fn test_unsorted_completion_rejected() {
        let store = MemoryObjectStore::new();
        let session = store.create_multipart("k").await.unwrap();
        let p1 = store
            .upload_part("k", &session, 1, Bytes::from_static(b"a"))
            .await
            .unwrap();
        let p2 = store
            .upload_part("k", &session, 2, Bytes::from_static(b"b"))
            .await
            .unwrap();

        let err = store
            .complete_multipart("k", &session, &[p2, p1])
            .await
            .unwrap_err();
        assert!(err.message.contains("ascending"));
    }

    #[tokio::test]
    async fn test_part_reupload_overwrites() {
        let store = MemoryObjectStore::new();
        let session = store.create_multipart("k").await.unwrap();
        store
            .upload_part("k", &session, 1, Bytes::from_static(b"old"))
            .await
            .unwrap();
        let p1 = store
            .upload_part("k", &session, 1, Bytes::from_static(b"new"))
            .await
            .unwrap();

        store.complete_multipart("k", &session, &[p1]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Bytes::from_static(b"new"));
    }
}
