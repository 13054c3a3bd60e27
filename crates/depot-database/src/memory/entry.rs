//! In-memory entry store.
//!
//! Mirrors the semantics of the PostgreSQL backend, including the atomic
//! chunk-set insert and the zero-clamped size deltas. A single mutex keeps
//! multi-entry reads (descendant scans) consistent with writers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::storage::RemotePart;
use depot_entity::entry::lineage;
use depot_entity::entry::{Entry, NewEntry, UploadStatus};

use crate::store::{ChunkAppend, EntryStore};

/// Entry store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl MemoryEntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert(&self, entry: &NewEntry) -> AppResult<Entry> {
        let mut entries = self.lock();

        let duplicate = entries
            .values()
            .any(|e| e.lineage == entry.lineage && e.name == entry.name);
        if duplicate {
            return Err(AppError::conflict(format!(
                "An entry named '{}' already exists in this folder",
                entry.name
            )));
        }

        let now = Utc::now();
        let row = Entry {
            id: entry.id,
            name: entry.name.clone(),
            is_folder: entry.is_folder,
            size_bytes: 0,
            declared_size_bytes: entry.declared_size_bytes,
            lineage: entry.lineage.clone(),
            status: entry.status.as_str().to_string(),
            total_chunks: entry.total_chunks,
            chunk_size_bytes: entry.chunk_size_bytes,
            uploaded_chunks: Vec::new(),
            remote_key: entry.remote_key.clone(),
            remote_session_id: entry.remote_session_id.clone(),
            remote_parts: serde_json::Value::Array(Vec::new()),
            content_hash: entry.content_hash.clone(),
            created_by: entry.created_by,
            last_activity: now,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        entries.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Entry>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn find_children(&self, parent_lineage: &[Uuid]) -> AppResult<Vec<Entry>> {
        let entries = self.lock();
        let mut children: Vec<Entry> = entries
            .values()
            .filter(|e| e.lineage == parent_lineage)
            .cloned()
            .collect();
        children.sort_by(|a, b| {
            b.is_folder
                .cmp(&a.is_folder)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(children)
    }

    async fn find_descendants(&self, prefix: &[Uuid]) -> AppResult<Vec<Entry>> {
        let entries = self.lock();
        let mut descendants: Vec<Entry> = entries
            .values()
            .filter(|e| lineage::starts_with(&e.lineage, prefix))
            .cloned()
            .collect();
        descendants.sort_by(|a, b| {
            a.lineage
                .len()
                .cmp(&b.lineage.len())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(descendants)
    }

    async fn find_sibling(&self, parent_lineage: &[Uuid], name: &str) -> AppResult<Option<Entry>> {
        let entries = self.lock();
        Ok(entries
            .values()
            .find(|e| e.lineage == parent_lineage && e.name == name)
            .cloned())
    }

    async fn append_chunk(&self, id: Uuid, index: i32, part: &RemotePart) -> AppResult<ChunkAppend> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Upload session {id} not found")))?;

        let inserted = if entry.uploaded_chunks.contains(&index) {
            false
        } else {
            entry.uploaded_chunks.push(index);
            if let serde_json::Value::Array(parts) = &mut entry.remote_parts {
                parts.push(serde_json::to_value(part)?);
            }
            true
        };

        entry.status = UploadStatus::Uploading.as_str().to_string();
        entry.last_activity = Utc::now();
        entry.updated_at = entry.last_activity;

        Ok(ChunkAppend {
            inserted,
            uploaded_count: entry.uploaded_chunks.len() as i32,
            total_chunks: entry.total_chunks,
        })
    }

    async fn remove_chunk(&self, id: Uuid, index: i32) -> AppResult<()> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Upload session {id} not found")))?;

        entry.uploaded_chunks.retain(|i| *i != index);
        let parts: Vec<RemotePart> = entry
            .remote_part_list()
            .into_iter()
            .filter(|p| p.part_number != index + 1)
            .collect();
        entry.remote_parts = serde_json::to_value(parts)?;
        entry.status = UploadStatus::Paused.as_str().to_string();
        entry.last_activity = Utc::now();
        entry.updated_at = entry.last_activity;
        Ok(())
    }

    async fn apply_size_delta(&self, ids: &[Uuid], delta: i64) -> AppResult<()> {
        if ids.is_empty() || delta == 0 {
            return Ok(());
        }

        let mut entries = self.lock();
        for id in ids {
            if let Some(entry) = entries.get_mut(id) {
                entry.size_bytes = (entry.size_bytes + delta).max(0);
                entry.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: UploadStatus) -> AppResult<()> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.status = status.as_str().to_string();
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid, size_bytes: i64) -> AppResult<()> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.status = UploadStatus::Completed.as_str().to_string();
        entry.size_bytes = size_bytes;
        entry.remote_session_id = None;
        entry.remote_parts = serde_json::Value::Array(Vec::new());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn set_lineage(&self, id: Uuid, new_lineage: &[Uuid]) -> AppResult<()> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.lineage = new_lineage.to_vec();
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock().remove(&id).is_some())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut entries = self.lock();
        let mut removed = 0;
        for id in ids {
            if entries.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Entry>> {
        let entries = self.lock();
        let mut stale: Vec<Entry> = entries
            .values()
            .filter(|e| !e.is_folder && !e.is_completed() && e.last_activity < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|e| e.last_activity);
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(name: &str, lineage: Vec<Uuid>, total_chunks: i32) -> NewEntry {
        NewEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_folder: false,
            lineage,
            status: UploadStatus::Initiated,
            declared_size_bytes: 1000,
            total_chunks,
            chunk_size_bytes: 500,
            remote_key: Some(format!("entries/{name}")),
            remote_session_id: Some("sess".to_string()),
            content_hash: None,
            created_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_append_chunk_is_idempotent() {
        let store = MemoryEntryStore::new();
        let entry = store.insert(&new_file("a.bin", vec![], 2)).await.unwrap();
        let part = RemotePart {
            part_number: 1,
            etag: "\"e1\"".to_string(),
        };

        let first = store.append_chunk(entry.id, 0, &part).await.unwrap();
        assert!(first.inserted);
        assert_eq!(first.uploaded_count, 1);

        let retry = store.append_chunk(entry.id, 0, &part).await.unwrap();
        assert!(!retry.inserted);
        assert_eq!(retry.uploaded_count, 1);

        let row = store.find_by_id(entry.id).await.unwrap().unwrap();
        assert_eq!(row.remote_part_list().len(), 1);
    }

    #[tokio::test]
    async fn test_size_delta_clamps_at_zero() {
        let store = MemoryEntryStore::new();
        let folder = NewEntry {
            is_folder: true,
            status: UploadStatus::Completed,
            ..new_file("docs", vec![], 0)
        };
        let folder = store.insert(&folder).await.unwrap();

        store.apply_size_delta(&[folder.id], -500).await.unwrap();
        let row = store.find_by_id(folder.id).await.unwrap().unwrap();
        assert_eq!(row.size_bytes, 0);
    }

    #[tokio::test]
    async fn test_duplicate_sibling_rejected() {
        let store = MemoryEntryStore::new();
        store.insert(&new_file("a.bin", vec![], 1)).await.unwrap();
        let err = store.insert(&new_file("a.bin", vec![], 1)).await.unwrap_err();
        assert_eq!(err.kind, depot_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_descendants_by_prefix() {
        let store = MemoryEntryStore::new();
        let root = store
            .insert(&NewEntry {
                is_folder: true,
                status: UploadStatus::Completed,
                ..new_file("root", vec![], 0)
            })
            .await
            .unwrap();
        let child = store
            .insert(&NewEntry {
                is_folder: true,
                status: UploadStatus::Completed,
                ..new_file("child", vec![root.id], 0)
            })
            .await
            .unwrap();
        store
            .insert(&new_file("deep.bin", vec![root.id, child.id], 1))
            .await
            .unwrap();
        store.insert(&new_file("other.bin", vec![], 1)).await.unwrap();

        let descendants = store.find_descendants(&[root.id]).await.unwrap();
        assert_eq!(descendants.len(), 2);
    }
}
