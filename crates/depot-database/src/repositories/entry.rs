//! PostgreSQL entry store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::traits::storage::RemotePart;
use depot_entity::entry::{Entry, NewEntry, UploadStatus};

use crate::store::{ChunkAppend, EntryStore};

/// Entry store backed by PostgreSQL.
///
/// Lineage is a `UUID[]` column with a GIN index; children and descendant
/// queries are array-equality and array-slice comparisons. Size deltas and
/// chunk-set inserts are single conditional statements so concurrent
/// writers never lose updates.
#[derive(Debug, Clone)]
pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    /// Create a new entry store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn insert(&self, entry: &NewEntry) -> AppResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "INSERT INTO entries (id, name, is_folder, size_bytes, declared_size_bytes, lineage, \
             status, total_chunks, chunk_size_bytes, uploaded_chunks, remote_key, \
             remote_session_id, remote_parts, content_hash, created_by, last_activity, version, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, 0, $4, $5, $6, $7, $8, '{}', $9, $10, '[]'::jsonb, $11, $12, \
             NOW(), 1, NOW(), NOW()) RETURNING *",
        )
        .bind(entry.id)
        .bind(&entry.name)
        .bind(entry.is_folder)
        .bind(entry.declared_size_bytes)
        .bind(entry.lineage.clone())
        .bind(entry.status.as_str())
        .bind(entry.total_chunks)
        .bind(entry.chunk_size_bytes)
        .bind(&entry.remote_key)
        .bind(&entry.remote_session_id)
        .bind(&entry.content_hash)
        .bind(entry.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("idx_entries_sibling_name") =>
            {
                AppError::conflict(format!(
                    "An entry named '{}' already exists in this folder",
                    entry.name
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to insert entry", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Entry>> {
        sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find entry", e))
    }

    async fn find_children(&self, lineage: &[Uuid]) -> AppResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(
            "SELECT * FROM entries WHERE lineage = $1 ORDER BY is_folder DESC, name ASC",
        )
        .bind(lineage.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn find_descendants(&self, prefix: &[Uuid]) -> AppResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(
            "SELECT * FROM entries WHERE lineage[1:$2] = $1 \
             ORDER BY cardinality(lineage) ASC, name ASC",
        )
        .bind(prefix.to_vec())
        .bind(prefix.len() as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list descendants", e))
    }

    async fn find_sibling(&self, lineage: &[Uuid], name: &str) -> AppResult<Option<Entry>> {
        sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE lineage = $1 AND name = $2")
            .bind(lineage.to_vec())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check sibling name", e)
            })
    }

    async fn append_chunk(&self, id: Uuid, index: i32, part: &RemotePart) -> AppResult<ChunkAppend> {
        let part_json = serde_json::to_value(std::slice::from_ref(part))?;

        // The CTE snapshots the pre-update chunk set under a row lock so
        // `inserted` reflects whether THIS statement added the index, even
        // under concurrent retries of the same chunk.
        let row: Option<(bool, i32, i32)> = sqlx::query_as(
            "WITH prior AS ( \
                SELECT uploaded_chunks AS chunks FROM entries WHERE id = $1 FOR UPDATE \
             ) \
             UPDATE entries e SET \
                uploaded_chunks = CASE WHEN prior.chunks @> ARRAY[$2::int4] \
                    THEN prior.chunks ELSE array_append(prior.chunks, $2::int4) END, \
                remote_parts = CASE WHEN prior.chunks @> ARRAY[$2::int4] \
                    THEN e.remote_parts ELSE e.remote_parts || $3::jsonb END, \
                status = 'uploading', \
                last_activity = NOW(), \
                updated_at = NOW() \
             FROM prior \
             WHERE e.id = $1 \
             RETURNING NOT (prior.chunks @> ARRAY[$2::int4]) AS inserted, \
                       cardinality(e.uploaded_chunks) AS uploaded_count, \
                       e.total_chunks",
        )
        .bind(id)
        .bind(index)
        .bind(part_json)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record chunk", e))?;

        let (inserted, uploaded_count, total_chunks) =
            row.ok_or_else(|| AppError::not_found(format!("Upload session {id} not found")))?;

        Ok(ChunkAppend {
            inserted,
            uploaded_count,
            total_chunks,
        })
    }

    async fn remove_chunk(&self, id: Uuid, index: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE entries SET \
                uploaded_chunks = array_remove(uploaded_chunks, $2::int4), \
                remote_parts = COALESCE(( \
                    SELECT jsonb_agg(p) FROM jsonb_array_elements(remote_parts) AS p \
                    WHERE (p->>'part_number')::int4 <> $2 + 1 \
                ), '[]'::jsonb), \
                status = 'paused', \
                last_activity = NOW(), \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(index)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to remove chunk", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Upload session {id} not found")));
        }
        Ok(())
    }

    async fn apply_size_delta(&self, ids: &[Uuid], delta: i64) -> AppResult<()> {
        if ids.is_empty() || delta == 0 {
            return Ok(());
        }

        sqlx::query(
            "UPDATE entries SET size_bytes = GREATEST(size_bytes + $2, 0), updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to apply size delta", e))?;

        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: UploadStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE entries SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set status", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid, size_bytes: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE entries SET status = 'completed', size_bytes = $2, \
                remote_session_id = NULL, remote_parts = '[]'::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(size_bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark completed", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }

    async fn set_lineage(&self, id: Uuid, lineage: &[Uuid]) -> AppResult<()> {
        let result = sqlx::query("UPDATE entries SET lineage = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(lineage.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set lineage", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete entry", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM entries WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete entries", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(
            "SELECT * FROM entries \
             WHERE is_folder = FALSE AND status <> 'completed' AND last_activity < $1 \
             ORDER BY last_activity ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan stale sessions", e)
        })
    }
}
