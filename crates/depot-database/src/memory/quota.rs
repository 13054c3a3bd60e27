//! In-memory quota accountant.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::quota::QuotaAccountant;

/// Quota accountant held in process memory.
#[derive(Debug)]
pub struct MemoryQuotaAccountant {
    used: Mutex<HashMap<Uuid, i64>>,
    default_limit_bytes: i64,
}

impl MemoryQuotaAccountant {
    /// Create a new accountant with the given per-user limit.
    pub fn new(default_limit_bytes: i64) -> Self {
        Self {
            used: Mutex::new(HashMap::new()),
            default_limit_bytes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, i64>> {
        self.used.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QuotaAccountant for MemoryQuotaAccountant {
    async fn check_quota(&self, user_id: Uuid, additional_bytes: i64) -> AppResult<()> {
        let used = *self.lock().get(&user_id).unwrap_or(&0);
        if used + additional_bytes > self.default_limit_bytes {
            return Err(AppError::quota_exceeded(format!(
                "Storage quota exceeded: {used} + {additional_bytes} bytes would exceed the \
                 {} byte limit",
                self.default_limit_bytes
            )));
        }
        Ok(())
    }

    async fn adjust_used(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<()> {
        let mut used = self.lock();
        let counter = used.entry(user_id).or_insert(0);
        *counter = (*counter + delta_bytes).max(0);
        Ok(())
    }

    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(*self.lock().get(&user_id).unwrap_or(&0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_rejects_over_limit() {
        let quota = MemoryQuotaAccountant::new(1000);
        let user = Uuid::new_v4();

        quota.check_quota(user, 1000).await.unwrap();
        quota.adjust_used(user, 800).await.unwrap();
        assert!(quota.check_quota(user, 300).await.is_err());
        quota.check_quota(user, 200).await.unwrap();
    }

    #[tokio::test]
    async fn test_adjust_clamps_at_zero() {
        let quota = MemoryQuotaAccountant::new(1000);
        let user = Uuid::new_v4();

        quota.adjust_used(user, -50).await.unwrap();
        assert_eq!(quota.used_bytes(user).await.unwrap(), 0);
    }
}
