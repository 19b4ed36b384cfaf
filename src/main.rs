//! brokerd - Simulated Brokerage Backend
//!
//! Boots the in-memory brokerage state, starts the market simulation
//! clock, and serves the API until a shutdown signal stops both.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brokerd::api::{create_router, AppState};
use brokerd::auth::ApiKeyDirectory;
use brokerd::config::{default_api_keys, Config};
use brokerd::engine::{Brokerage, MarketSimulationClock, OrderExecutionEngine, RiskAnalysisEngine};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env();
    info!(
        port = config.port,
        tick_interval_ms = config.tick_interval_ms,
        volatility = config.volatility_factor,
        "starting brokerd"
    );

    let store = Arc::new(RwLock::new(Brokerage::seeded(&config)));
    let clock = MarketSimulationClock::new(store.clone(), &config);
    clock.start();

    let state = AppState {
        store,
        orders: OrderExecutionEngine::from_config(&config),
        risk: RiskAnalysisEngine::new(),
        clock: clock.clone(),
        min_order_quantity: config.min_order_quantity,
        max_order_quantity: config.max_order_quantity,
    };
    let keys = Arc::new(ApiKeyDirectory::new(default_api_keys()));

    let app = create_router(state, keys);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(clock))
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brokerd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on SIGINT or SIGTERM, stopping the simulation clock so no tick
/// fires while the server drains.
async fn shutdown_signal(clock: MarketSimulationClock) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping market simulation");
    clock.stop();
}
