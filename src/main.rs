//! Depot Server — resumable chunked-upload storage manager.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use depot_core::config::AppConfig;
use depot_core::error::AppError;
use depot_core::traits::quota::QuotaAccountant;
use depot_core::traits::storage::ObjectStore;
use depot_database::store::EntryStore;
use depot_service::activity::ActivityNotifier;

#[tokio::main]
async fn main() {
    let env = std::env::var("DEPOT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Depot v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Object store ─────────────────────────────────────
    tracing::info!(provider = %config.store.provider, "Initializing object store...");
    let object_store: Arc<dyn ObjectStore> = match config.store.provider.as_str() {
        "s3" => Arc::new(depot_store::S3ObjectStore::new(&config.store.s3).await?),
        "memory" => Arc::new(depot_store::MemoryObjectStore::new()),
        other => {
            return Err(AppError::configuration(format!(
                "Unknown store provider '{other}' (expected \"s3\" or \"memory\")"
            )));
        }
    };

    // ── Step 2: Persistence ──────────────────────────────────────
    tracing::info!(provider = %config.database.provider, "Initializing persistence...");
    let (entries, quota, activity): (
        Arc<dyn EntryStore>,
        Arc<dyn QuotaAccountant>,
        Arc<dyn ActivityNotifier>,
    ) = match config.database.provider.as_str() {
        "postgres" => {
            let pool = depot_database::connection::DatabasePool::connect(&config.database)
                .await?
                .into_pool();

            tracing::info!("Running database migrations...");
            depot_database::migration::run_migrations(&pool).await?;

            let activity_repo = Arc::new(
                depot_database::repositories::activity::ActivityLogRepository::new(pool.clone()),
            );

            (
                Arc::new(depot_database::repositories::entry::PgEntryStore::new(
                    pool.clone(),
                )),
                Arc::new(depot_database::repositories::quota::PgQuotaAccountant::new(
                    pool,
                    config.quota.default_limit_bytes,
                )),
                Arc::new(depot_service::activity::ActivityLogger::new(activity_repo)),
            )
        }
        "memory" => (
            Arc::new(depot_database::memory::MemoryEntryStore::new()),
            Arc::new(depot_database::memory::MemoryQuotaAccountant::new(
                config.quota.default_limit_bytes,
            )),
            Arc::new(depot_service::activity::LogActivity),
        ),
        other => {
            return Err(AppError::configuration(format!(
                "Unknown database provider '{other}' (expected \"postgres\" or \"memory\")"
            )));
        }
    };

    // ── Step 3: Services ─────────────────────────────────────────
    let upload_engine = Arc::new(depot_service::upload::UploadEngine::new(
        Arc::clone(&entries),
        Arc::clone(&object_store),
        Arc::clone(&quota),
        Arc::clone(&activity),
        config.store.clone(),
    ));
    let hierarchy = Arc::new(depot_service::hierarchy::HierarchyService::new(
        Arc::clone(&entries),
        Arc::clone(&activity),
    ));
    tracing::info!("Services initialized");

    // ── Step 4: Background worker ────────────────────────────────
    let mut scheduler = if config.worker.enabled {
        let reaper = Arc::new(depot_worker::StaleSessionReaper::new(
            Arc::clone(&entries),
            Arc::clone(&object_store),
            Arc::clone(&activity),
            chrono::Duration::hours(config.worker.stale_after_hours),
        ));

        let scheduler = depot_worker::CronScheduler::new().await?;
        scheduler
            .register_reaper(reaper, &config.worker.reaper_schedule)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 5: HTTP server ──────────────────────────────────────
    let app_state = depot_api::state::AppState {
        config: Arc::new(config.clone()),
        entries,
        object_store,
        quota,
        upload_engine,
        hierarchy,
    };
    let app = depot_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Depot server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 6: Drain background tasks ───────────────────────────
    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    tracing::info!("Depot server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
