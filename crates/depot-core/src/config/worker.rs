//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background maintenance worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron schedule for the stale-session sweep (default hourly).
    #[serde(default = "default_reaper_schedule")]
    pub reaper_schedule: String,
    /// Sessions inactive longer than this many hours are reclaimed.
    #[serde(default = "default_stale_after")]
    pub stale_after_hours: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            reaper_schedule: default_reaper_schedule(),
            stale_after_hours: default_stale_after(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reaper_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_stale_after() -> i64 {
    24
}
