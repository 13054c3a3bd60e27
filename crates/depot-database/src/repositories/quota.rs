//! PostgreSQL quota accountant.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::traits::quota::QuotaAccountant;

/// Quota accountant backed by the `accounts` table.
///
/// Rows are created lazily with the configured default limit the first
/// time a user is seen. Adjustments are single atomic upserts clamped at
/// zero, so concurrent accounting never loses updates.
#[derive(Debug, Clone)]
pub struct PgQuotaAccountant {
    pool: PgPool,
    default_limit_bytes: i64,
}

impl PgQuotaAccountant {
    /// Create a new quota accountant.
    pub fn new(pool: PgPool, default_limit_bytes: i64) -> Self {
        Self {
            pool,
            default_limit_bytes,
        }
    }

    async fn ensure_account(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (user_id, storage_used_bytes, storage_limit_bytes) \
             VALUES ($1, 0, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(self.default_limit_bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to ensure account", e))?;
        Ok(())
    }
}

#[async_trait]
impl QuotaAccountant for PgQuotaAccountant {
    async fn check_quota(&self, user_id: Uuid, additional_bytes: i64) -> AppResult<()> {
        self.ensure_account(user_id).await?;

        let (used, limit): (i64, i64) = sqlx::query_as(
            "SELECT storage_used_bytes, storage_limit_bytes FROM accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read quota", e))?;

        if used + additional_bytes > limit {
            return Err(AppError::quota_exceeded(format!(
                "Storage quota exceeded: {used} + {additional_bytes} bytes would exceed the \
                 {limit} byte limit"
            )));
        }
        Ok(())
    }

    async fn adjust_used(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (user_id, storage_used_bytes, storage_limit_bytes) \
             VALUES ($1, GREATEST($2, 0), $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET storage_used_bytes = GREATEST(accounts.storage_used_bytes + $2, 0), \
                 updated_at = NOW()",
        )
        .bind(user_id)
        .bind(delta_bytes)
        .bind(self.default_limit_bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to adjust quota", e))?;
        Ok(())
    }

    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64> {
        let used: Option<i64> =
            sqlx::query_scalar("SELECT storage_used_bytes FROM accounts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read usage", e)
                })?;
        Ok(used.unwrap_or(0))
    }
}
