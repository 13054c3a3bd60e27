//! Quota accountant trait — the consumed interface of the user-account
//! collaborator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Per-user storage usage accounting.
///
/// Only completed, non-folder entries count toward usage; folder sizes are
/// derived sums and are never separately counted. The check runs before any
/// remote transfer begins, the adjustment at completion and deletion.
#[async_trait]
pub trait QuotaAccountant: Send + Sync + std::fmt::Debug + 'static {
    /// Fail with a quota error when `used + additional_bytes` would exceed
    /// the user's limit.
    async fn check_quota(&self, user_id: Uuid, additional_bytes: i64) -> AppResult<()>;

    /// Apply a signed delta to the user's used-storage counter, clamped
    /// at zero.
    async fn adjust_used(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<()>;

    /// Current used-storage counter for a user.
    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64>;
}
