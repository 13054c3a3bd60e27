//! # depot-store
//!
//! Object store layer for Depot: the S3-compatible client, the in-memory
//! backend used by tests and single-node development, and the multipart
//! coordinator that maps upload sessions onto remote multipart sessions.

pub mod keys;
pub mod memory;
pub mod multipart;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use multipart::MultipartCoordinator;
pub use s3::S3ObjectStore;
