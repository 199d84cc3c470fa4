//! Server bootstrap: store wiring, listener and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tollgate_core::{ConfigError, Department, TollgateError};
use tollgate_storage::{
    InMemoryKeyValueStore, InMemoryRecordStore, PgConfig, PgRecordStore, RedisConfig,
    RedisKeyValueStore,
};

use crate::config::{ApiConfig, StoreBackend};
use crate::error::ApiError;
use crate::routes::create_api_router;
use crate::state::AppState;

/// Failures that stop the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store unavailable: {0}")]
    Store(#[from] TollgateError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] ApiError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Connect the configured backend and build the shared state.
pub async fn build_state(config: &ApiConfig) -> Result<AppState, StartupError> {
    let policy = config.rate_limit.clone();

    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; state is lost on restart");
            Ok(AppState::from_stores(
                Arc::new(InMemoryRecordStore::<Department>::new()),
                Arc::new(InMemoryKeyValueStore::new()),
                config.cache.clone(),
                policy,
            ))
        }
        StoreBackend::External => {
            let redis_config = RedisConfig::from_env();
            let kv = RedisKeyValueStore::connect(&redis_config).await?;
            kv.ping().await?;

            let records = PgRecordStore::from_config(&PgConfig::from_env())?;
            records.ensure_schema().await?;
            tracing::info!(pool_size = records.pool_size(), "PostgreSQL schema ready");

            Ok(AppState::from_stores(
                Arc::new(records),
                Arc::new(kv),
                config.cache.clone(),
                policy,
            ))
        }
    }
}

/// Serve the API until Ctrl-C.
pub async fn serve(config: ApiConfig) -> Result<(), StartupError> {
    let state = build_state(&config).await?;
    let app = create_api_router(state, &config);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(%addr, backend = ?config.backend, "Starting Tollgate API server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(StartupError::Serve)?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
