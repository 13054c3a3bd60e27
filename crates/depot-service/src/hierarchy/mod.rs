//! Folder hierarchy management.

pub mod service;

pub use service::HierarchyService;
