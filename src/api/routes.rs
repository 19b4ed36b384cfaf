//! API router.
//!
//! Everything except `/health` sits behind the API-key middleware; handlers
//! receive the resolved account id through request extensions.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers;
use crate::auth::{api_key_auth, ApiKeyDirectory};
use crate::engine::{Brokerage, MarketSimulationClock, OrderExecutionEngine, RiskAnalysisEngine};
use crate::middleware::logging::request_logging;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Brokerage>>,
    pub orders: OrderExecutionEngine,
    pub risk: RiskAnalysisEngine,
    pub clock: MarketSimulationClock,
    pub min_order_quantity: f64,
    pub max_order_quantity: f64,
}

/// Create the API router
pub fn create_router(state: AppState, keys: Arc<ApiKeyDirectory>) -> Router {
    let protected = Router::new()
        .route("/api/market/prices", get(handlers::get_prices))
        .route("/api/market/prices/:symbol", get(handlers::get_price_by_symbol))
        .route("/api/trading/buy", post(handlers::buy_asset))
        .route("/api/trading/sell", post(handlers::sell_asset))
        .route("/api/trading/transactions", get(handlers::get_transaction_history))
        .route("/api/portfolio", get(handlers::get_portfolio))
        .route("/api/portfolio/performance", get(handlers::get_performance))
        .route("/api/analysis/risk", get(handlers::get_risk_analysis))
        .route("/api/analysis/recommendations", get(handlers::get_recommendations))
        .route("/api/analysis/technical/:symbol", get(handlers::get_technical))
        .route(
            "/api/account/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/api/simulation/status", get(handlers::get_simulation_status))
        .route("/api/simulation/start", post(handlers::start_simulation))
        .route("/api/simulation/stop", post(handlers::stop_simulation))
        .route("/api/simulation/event", post(handlers::trigger_market_event))
        .route_layer(middleware::from_fn_with_state(keys, api_key_auth))
        .with_state(state.clone());

    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
