//! Claims Orchestrator - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin claims-api
//!
//! API_PORT=9000 CLAIMS__DATABASE_URL=sqlite://claims.db cargo run --bin claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_LOG_LEVEL` - Filter used when `RUST_LOG` is unset (default: info)
//! * `CLAIMS__DATABASE_URL` - SQLite URL (default: sqlite::memory:)
//! * `CLAIMS__REFERENCE_DATA_PATH` - Policies and vehicle values JSON file
//! * `CLAIMS__STAGE_TIMEOUT_SECS` - Per-call budget for classification and stages
//! * `CLAIMS__ESCALATION__HIGH_VALUE_THRESHOLD` and the other rule overrides

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use claims_engine::{ClaimWorkflow, EngineConfig};
use infra_db::{DatabaseConfig, SqliteClaimStore};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;
    let engine = EngineConfig::from_env().context("loading engine configuration")?;

    init_tracing(&config);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        database = %engine.database_url,
        "Starting claims API server"
    );

    let store = Arc::new(
        SqliteClaimStore::connect(
            DatabaseConfig::new(engine.database_url.clone())
                .max_connections(engine.database_max_connections),
        )
        .await
        .context("opening claim store")?,
    );
    tracing::info!("Claim store ready");

    let workflow =
        ClaimWorkflow::from_config(store.clone(), &engine).context("building claim workflow")?;
    let app = create_router(AppState::new(workflow, store, config.clone()));

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level; `API_LOG_JSON` picks the format.
fn init_tracing(config: &ApiConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
