//! Session share hub server.
//!
//! Run with: cargo run -p share-hub-server -- --archive-dir ./archive
//!
//! Owners publish through `POST /share_*`, viewers connect to
//! `ws://localhost:3000/share_poll?id=<short id>`.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use share_hub_core::{ArchiveStore, KeyValueStore};
use share_hub_session::{
    ShareRegistry,
    storage::{FsArchiveStore, MemoryArchiveStore, MemoryKeyValueStore},
};
use share_hub_transport::{HubState, router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::parse();

    let registry = Arc::new(
        ShareRegistry::new(open_state_store(&config).await?, open_archive(&config))
            .with_page_limit(config.archive_page_limit)
            .with_idle_timeout(config.idle_timeout())
            .with_viewer_capacity(config.viewer_buffer),
    );
    let state = HubState::new(Arc::clone(&registry), config.hub_config());

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("Share hub listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.shutdown().await;
    tracing::info!("Share hub stopped");
    Ok(())
}

fn open_archive(config: &ServerConfig) -> Arc<dyn ArchiveStore> {
    match &config.archive_dir {
        Some(dir) => {
            tracing::info!("Archiving shares under {}", dir.display());
            Arc::new(FsArchiveStore::new(dir))
        }
        None => {
            tracing::warn!("No archive directory configured, archive is in memory only");
            Arc::new(MemoryArchiveStore::new())
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_state_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    use share_hub_session::storage::SqliteKeyValueStore;

    match &config.database_url {
        Some(url) => {
            let store = SqliteKeyValueStore::connect(url)
                .await
                .context("failed to open state database")?;
            tracing::info!("Share state stored in {url}");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryKeyValueStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
async fn open_state_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.database_url.is_some() {
        anyhow::bail!("--database-url requires the `sqlite` feature");
    }
    Ok(Arc::new(MemoryKeyValueStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
