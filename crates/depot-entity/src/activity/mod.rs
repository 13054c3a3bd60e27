//! Activity/audit entities.

pub mod model;

pub use model::{ActivityAction, ActivityRecord, NewActivity};
