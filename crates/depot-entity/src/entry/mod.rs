//! Tree entry entities.

pub mod lineage;
pub mod model;
pub mod status;

pub use model::{Entry, NewEntry};
pub use status::UploadStatus;
