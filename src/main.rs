//! Credit Default AI server
//!
//! Serves the scoring form and JSON API.
//!
//! Usage:
//!   cargo run --bin credit_default_ai
//!
//! Environment:
//!   PORT / CREDIT_PORT  - Server port (default: 8080)
//!   CREDIT_HOST         - Server host (default: 0.0.0.0)
//!   CREDIT_MODEL_DIR    - Directory with model artifacts (default: .)
//!   CREDIT_RATE_LIMIT   - Requests per minute per client (default: 100)
//!   RUST_LOG            - Log filter (default: info)

use credit_default_ai::api::{create_router, start_cleanup_task, AppState};
use credit_default_ai::utils::constants::{APP_NAME, APP_VERSION};
use credit_default_ai::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = AppConfig::from_env();
    let addr = config.socket_addr()?;

    // Artifacts are resolved once; a missing model still serves the error page
    let state = Arc::new(AppState::from_config(&config));
    if state.artifacts().is_none() {
        warn!(
            dir = %config.model_dir.display(),
            "Scoring disabled until model artifacts are provided"
        );
    }

    // Start background cleanup task for rate limiter
    start_cleanup_task(state.rate_limiter.clone());
    info!("Background cleanup task started");

    let telemetry = state.telemetry.clone();
    let app = create_router(state);

    info!("{} starting on http://{}", APP_NAME, addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /            - Scoring form");
    info!("  POST /predict     - Form submission");
    info!("  POST /v1/score    - JSON scoring");
    info!("  GET  /v1/model    - Loaded artifacts");
    info!("  GET  /v1/stats    - Scoring statistics");
    info!("  GET  /v1/health   - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    // Peer address backs the rate limit key when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Shutdown signal received");
    let stats = telemetry.get_stats();
    info!(
        total_scored = stats.total_scored,
        refused = stats.refused_unconfigured,
        avg_latency_ms = stats.avg_latency_ms,
        "Final statistics"
    );
    info!("{} v{} shutdown complete", APP_NAME, APP_VERSION);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║                 💳  C R E D I T   D E F A U L T  A I          ║
    ║                                                              ║
    ║          XGBoost + StandardScaler risk assessment            ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#
    );
}
