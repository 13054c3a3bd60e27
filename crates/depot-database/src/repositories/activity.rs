//! Activity log repository.

use sqlx::PgPool;
use uuid::Uuid;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_entity::activity::{ActivityRecord, NewActivity};

/// Repository for the activity log consumed by the revision/history
/// collaborator.
#[derive(Debug, Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    /// Create a new activity log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist one activity record.
    pub async fn record(&self, activity: &NewActivity) -> AppResult<ActivityRecord> {
        sqlx::query_as::<_, ActivityRecord>(
            "INSERT INTO activity_log (id, entry_id, actor, action, item_name, old_parent, \
             new_parent, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(activity.entry_id)
        .bind(activity.actor)
        .bind(activity.action.as_str())
        .bind(&activity.item_name)
        .bind(&activity.old_parent)
        .bind(&activity.new_parent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record activity", e))
    }

    /// List records for one entry, newest first.
    pub async fn list_for_entry(&self, entry_id: Uuid) -> AppResult<Vec<ActivityRecord>> {
        sqlx::query_as::<_, ActivityRecord>(
            "SELECT * FROM activity_log WHERE entry_id = $1 ORDER BY created_at DESC",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list activity", e))
    }

    /// Delete all records for the given entries (cascade on entry removal).
    pub async fn delete_for_entries(&self, entry_ids: &[Uuid]) -> AppResult<u64> {
        if entry_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM activity_log WHERE entry_id = ANY($1)")
            .bind(entry_ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete activity", e)
            })?;
        Ok(result.rows_affected())
    }
}
