//! # depot-worker
//!
//! Background maintenance for Depot: the stale-session reaper and the
//! cron scheduler that drives it.

pub mod reaper;
pub mod scheduler;

pub use reaper::StaleSessionReaper;
pub use scheduler::CronScheduler;
