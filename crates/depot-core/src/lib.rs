//! # depot-core
//!
//! Core crate for the Depot storage service. Contains configuration
//! schemas, the unified error system, and the trait seams implemented by
//! the database and object-store crates.
//!
//! This crate has **no** internal dependencies on other Depot crates.

pub mod config;
pub mod error;
pub mod http;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
