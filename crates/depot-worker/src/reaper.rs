//! Stale session reclamation.
//!
//! Upload sessions that stop sending chunks hold a remote multipart
//! session, an entry row, and an optimistic ancestor-size delta. The
//! reaper sweeps sessions inactive beyond the threshold and reclaims all
//! three. Failures are logged and never surface to user requests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use depot_core::result::AppResult;
use depot_core::traits::storage::ObjectStore;
use depot_database::store::EntryStore;
use depot_entity::entry::Entry;
use depot_service::activity::ActivityNotifier;
use depot_store::multipart::MultipartCoordinator;

/// Outcome of one reaper sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReapSummary {
    /// Stale sessions found.
    pub scanned: usize,
    /// Sessions fully reclaimed.
    pub reclaimed: usize,
}

/// Periodic sweep that reclaims abandoned upload sessions.
#[derive(Debug, Clone)]
pub struct StaleSessionReaper {
    /// Entry persistence.
    entries: Arc<dyn EntryStore>,
    /// Remote object store.
    object_store: Arc<dyn ObjectStore>,
    /// Multipart protocol adapter.
    coordinator: MultipartCoordinator,
    /// Activity collaborator, for cascading dependent records.
    activity: Arc<dyn ActivityNotifier>,
    /// Inactivity threshold.
    stale_after: Duration,
}

impl StaleSessionReaper {
    /// Create a new reaper with the given inactivity threshold.
    pub fn new(
        entries: Arc<dyn EntryStore>,
        object_store: Arc<dyn ObjectStore>,
        activity: Arc<dyn ActivityNotifier>,
        stale_after: Duration,
    ) -> Self {
        let coordinator = MultipartCoordinator::new(Arc::clone(&object_store));
        Self {
            entries,
            object_store,
            coordinator,
            activity,
            stale_after,
        }
    }

    /// Run one sweep: find inactive incomplete sessions and reclaim each.
    pub async fn run(&self) -> AppResult<ReapSummary> {
        let cutoff = Utc::now() - self.stale_after;
        let stale = self.entries.find_stale(cutoff).await?;

        let mut summary = ReapSummary {
            scanned: stale.len(),
            ..ReapSummary::default()
        };

        for entry in &stale {
            match self.reclaim(entry).await {
                Ok(()) => summary.reclaimed += 1,
                Err(e) => {
                    warn!(
                        upload_id = %entry.id,
                        name = %entry.name,
                        error = %e,
                        "Failed to reclaim stale session"
                    );
                }
            }
        }

        if summary.scanned > 0 {
            info!(
                scanned = summary.scanned,
                reclaimed = summary.reclaimed,
                "Stale session sweep finished"
            );
        }

        Ok(summary)
    }

    /// Reclaim one session: abort/delete remote artifacts (best-effort),
    /// reverse the optimistic ancestor-size delta, drop dependent records
    /// and the entry itself.
    async fn reclaim(&self, entry: &Entry) -> AppResult<()> {
        if let (Some(key), Some(session_id)) = (&entry.remote_key, &entry.remote_session_id) {
            if let Err(e) = self.coordinator.abort(key, session_id).await {
                warn!(upload_id = %entry.id, error = %e, "Failed to abort remote multipart session");
            }
        }
        if let Some(key) = &entry.remote_key {
            if let Err(e) = self.object_store.delete(key).await {
                warn!(upload_id = %entry.id, error = %e, "Failed to delete remote object");
            }
        }

        // Incomplete sessions carried their declared size on every
        // ancestor since initiation; reclaiming must reverse it or the
        // size invariant corrodes over time.
        self.entries
            .apply_size_delta(&entry.lineage, -entry.accounted_size())
            .await?;

        self.activity.purge(&[entry.id]).await?;
        self.entries.delete(entry.id).await?;

        info!(
            upload_id = %entry.id,
            name = %entry.name,
            "Stale session reclaimed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use uuid::Uuid;

    use depot_core::config::store::StoreConfig;
    use depot_core::traits::quota::QuotaAccountant;
    use depot_database::memory::{MemoryEntryStore, MemoryQuotaAccountant};
    use depot_service::activity::LogActivity;
    use depot_service::context::RequestContext;
    use depot_service::hierarchy::HierarchyService;
    use depot_service::upload::{InitiateUpload, ResourceKind, UploadEngine};
    use depot_store::MemoryObjectStore;

    struct Fixture {
        entries: Arc<MemoryEntryStore>,
        object_store: Arc<MemoryObjectStore>,
        engine: UploadEngine,
        hierarchy: HierarchyService,
        ctx: RequestContext,
    }

    fn fixture() -> Fixture {
        let entries = Arc::new(MemoryEntryStore::new());
        let object_store = Arc::new(MemoryObjectStore::new());
        let quota = Arc::new(MemoryQuotaAccountant::new(i64::MAX));
        let activity = Arc::new(LogActivity);

        let engine = UploadEngine::new(
            entries.clone() as Arc<dyn EntryStore>,
            object_store.clone(),
            quota as Arc<dyn QuotaAccountant>,
            activity.clone() as Arc<dyn ActivityNotifier>,
            StoreConfig::default(),
        );
        let hierarchy = HierarchyService::new(
            entries.clone() as Arc<dyn EntryStore>,
            activity as Arc<dyn ActivityNotifier>,
        );

        Fixture {
            entries,
            object_store,
            engine,
            hierarchy,
            ctx: RequestContext::new(Uuid::new_v4()),
        }
    }

    fn reaper(f: &Fixture, stale_after: Duration) -> StaleSessionReaper {
        StaleSessionReaper::new(
            f.entries.clone() as Arc<dyn EntryStore>,
            f.object_store.clone(),
            Arc::new(LogActivity) as Arc<dyn ActivityNotifier>,
            stale_after,
        )
    }

    #[tokio::test]
    async fn test_reaper_reclaims_inactive_sessions_and_reverses_sizes() {
        let f = fixture();
        let docs = f.hierarchy.create_folder(&f.ctx, "docs", None).await.unwrap();

        let upload = f
            .engine
            .initiate(
                &f.ctx,
                InitiateUpload {
                    name: "stalled.bin".to_string(),
                    size_bytes: 8_000_000,
                    parent: Some(docs.id),
                    content_hash: None,
                    kind: ResourceKind::Chunked,
                },
            )
            .await
            .unwrap();
        f.engine
            .accept_chunk(&f.ctx, upload.upload_id, 0, Bytes::from_static(b"x"))
            .await
            .unwrap();

        // A zero threshold makes any past activity stale.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let summary = reaper(&f, Duration::zero()).run().await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.reclaimed, 1);
        assert!(f.entries.find_by_id(upload.upload_id).await.unwrap().is_none());
        assert_eq!(f.object_store.abort_count(), 1);
        assert_eq!(
            f.entries.find_by_id(docs.id).await.unwrap().unwrap().size_bytes,
            0,
            "reclaiming must reverse the optimistic ancestor delta"
        );
    }

    #[tokio::test]
    async fn test_reaper_keeps_active_and_completed_sessions() {
        let f = fixture();

        // A completed upload.
        let done = f
            .engine
            .initiate(
                &f.ctx,
                InitiateUpload {
                    name: "done.bin".to_string(),
                    size_bytes: 10,
                    parent: None,
                    content_hash: None,
                    kind: ResourceKind::Chunked,
                },
            )
            .await
            .unwrap();
        f.engine
            .accept_chunk(&f.ctx, done.upload_id, 0, Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        // A session inside the threshold window.
        let fresh = f
            .engine
            .initiate(
                &f.ctx,
                InitiateUpload {
                    name: "fresh.bin".to_string(),
                    size_bytes: 8_000_000,
                    parent: None,
                    content_hash: None,
                    kind: ResourceKind::Chunked,
                },
            )
            .await
            .unwrap();

        let summary = reaper(&f, Duration::hours(24)).run().await.unwrap();

        assert_eq!(summary.scanned, 0);
        assert!(f.entries.find_by_id(done.upload_id).await.unwrap().is_some());
        assert!(f.entries.find_by_id(fresh.upload_id).await.unwrap().is_some());
    }
}
