//! Points Ledger Service - HTTP API for points, quotas and admin adjustments
//!
//! This is the main entry point for the points ledger service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use points_ledger_service::{create_router, AppState, ServiceConfig, StoreBackend};
use points_ledger_store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,points_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Points Ledger Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = %config.store_backend,
        data_dir = %config.data_dir,
        auth_configured = %config.auth_jwt_secret.is_some(),
        bootstrap_admin = ?config.bootstrap_admin_email,
        max_transaction_attempts = config.max_transaction_attempts,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the configured storage backend.
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store - data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb-backend")]
        StoreBackend::Rocksdb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(points_ledger_store::RocksStore::open(
                &config.data_dir,
            )?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StoreBackend::Rocksdb => {
            Err("STORE_BACKEND=rocksdb requires building with the rocksdb-backend feature".into())
        }
    }
}
