//! Application state shared across all handlers.

use std::sync::Arc;

use depot_core::config::AppConfig;
use depot_core::traits::quota::QuotaAccountant;
use depot_core::traits::storage::ObjectStore;
use depot_database::store::EntryStore;
use depot_service::hierarchy::HierarchyService;
use depot_service::upload::UploadEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Entry persistence.
    pub entries: Arc<dyn EntryStore>,
    /// Remote object store.
    pub object_store: Arc<dyn ObjectStore>,
    /// Quota collaborator.
    pub quota: Arc<dyn QuotaAccountant>,
    /// Upload session engine.
    pub upload_engine: Arc<UploadEngine>,
    /// Folder hierarchy manager.
    pub hierarchy: Arc<HierarchyService>,
}
