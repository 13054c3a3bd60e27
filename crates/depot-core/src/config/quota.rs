//! Per-user storage quota configuration.

use serde::{Deserialize, Serialize};

/// Storage quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Default per-user storage limit in bytes (default 50 GB).
    #[serde(default = "default_limit")]
    pub default_limit_bytes: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_limit_bytes: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    53_687_091_200 // 50 GB
}
