//! Tollgate API Server Entry Point
//!
//! Bootstraps tracing and configuration, connects the stores and starts the
//! Axum HTTP server.

use tollgate_api::server::{serve, StartupError};
use tollgate_api::telemetry::{init_tracing, TelemetryConfig};
use tollgate_api::ApiConfig;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let result = serve(api_config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Tollgate API server failed");
    }
    result
}
