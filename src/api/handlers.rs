//! Route handlers.
//!
//! Thin request/response shaping over the engine: validate the inputs,
//! take the store lock, call the core operation, serialize the result.
//! Handlers never hold a lock across an await point.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::routes::AppState;
use crate::auth::CallerAccount;
use crate::engine::{
    Account, AssetQuote, EngineError, Holding, MarketEvent, OrderKind, RiskTolerance,
    SimulationStatus, Transaction,
};

// ===== Route Handlers =====

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// All current market quotes.
pub async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let store = state.store.read();
    Json(PricesResponse {
        prices: store.assets.all().to_vec(),
        timestamp: Utc::now(),
    })
}

/// One quote by symbol.
pub async fn get_price_by_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<AssetQuote>, ApiError> {
    let symbol = symbol.to_uppercase();
    let store = state.store.read();
    let quote = store.assets.get(&symbol)?.clone();
    Ok(Json(quote))
}

pub async fn buy_asset(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
    Json(order): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    execute_order(&state, &caller, OrderKind::Buy, order)
}

pub async fn sell_asset(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
    Json(order): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    execute_order(&state, &caller, OrderKind::Sell, order)
}

fn execute_order(
    state: &AppState,
    caller: &CallerAccount,
    kind: OrderKind,
    order: OrderRequest,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let symbol = order.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("symbol is required".to_string()));
    }
    // Order-size bounds are a request-layer concern; the engine only sees
    // orders inside them.
    if !order.quantity.is_finite()
        || order.quantity < state.min_order_quantity
        || order.quantity > state.max_order_quantity
    {
        return Err(ApiError::BadRequest(format!(
            "quantity must be between {} and {}",
            state.min_order_quantity, state.max_order_quantity
        )));
    }

    let transaction = {
        let mut store = state.store.write();
        state
            .orders
            .execute(&mut store, kind, &caller.0, &symbol, order.quantity)?
    };

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: format!("{} order executed", kind.as_str()),
            transaction,
        }),
    ))
}

/// The caller's transaction history, oldest first.
pub async fn get_transaction_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Json<TransactionsResponse> {
    let store = state.store.read();
    let transactions = store.transactions.for_account(&caller.0);
    Json(TransactionsResponse {
        count: transactions.len(),
        transactions,
    })
}

/// The caller's portfolio with current valuations.
pub async fn get_portfolio(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.read();
    let portfolio = store.portfolios.portfolio(&caller.0)?.clone();
    Ok(Json(json!({ "portfolio": portfolio })))
}

/// Performance summary: totals, best and worst performer, held sectors.
pub async fn get_performance(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Result<Json<PerformanceSummary>, ApiError> {
    let store = state.store.read();
    let portfolio = store.portfolios.portfolio(&caller.0)?;

    let mut sectors: Vec<String> = Vec::new();
    for holding in &portfolio.holdings {
        let sector = store
            .assets
            .get(&holding.symbol)
            .map(|q| q.sector.clone())
            .unwrap_or_else(|_| "Unknown".to_string());
        if !sectors.contains(&sector) {
            sectors.push(sector);
        }
    }

    let mut ranked: Vec<&Holding> = portfolio.holdings.iter().collect();
    ranked.sort_by(|a, b| {
        b.unrealized_return_pct
            .partial_cmp(&a.unrealized_return_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(Json(PerformanceSummary {
        total_value: portfolio.total_value,
        total_invested: portfolio.total_invested,
        total_return: portfolio.total_return,
        total_return_pct: portfolio.total_return_pct,
        holdings_count: portfolio.holdings.len(),
        sectors,
        best_performer: ranked.first().map(|h| (*h).clone()),
        worst_performer: ranked.last().map(|h| (*h).clone()),
    }))
}

/// Risk profile for the caller's portfolio.
pub async fn get_risk_analysis(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.read();
    let profile = state.risk.analyze(&store, &caller.0)?;
    Ok(Json(json!({ "risk_analysis": profile })))
}

/// Up to five unheld assets scored against the caller's risk tolerance.
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut store = state.store.write();
    let recommendations = state.risk.recommend(&mut store, &caller.0)?;
    Ok(Json(json!({ "recommendations": recommendations })))
}

/// Synthetic technical snapshot for one symbol.
pub async fn get_technical(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = symbol.to_uppercase();
    let mut store = state.store.write();
    let snapshot = state.risk.technical(&mut store, &symbol)?;
    Ok(Json(json!({ "technical": snapshot })))
}

/// The caller's account profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let store = state.store.read();
    let account = store.accounts.get(&caller.0)?.clone();
    Ok(Json(ProfileResponse { account }))
}

/// Update the caller's risk tolerance.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerAccount>,
    Json(update): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut store = state.store.write();
    if let Some(tolerance) = update.risk_tolerance {
        store.accounts.set_risk_tolerance(&caller.0, tolerance)?;
    }
    let account = store.accounts.get(&caller.0)?.clone();
    Ok(Json(ProfileResponse { account }))
}

pub async fn get_simulation_status(State(state): State<AppState>) -> Json<SimulationStatus> {
    Json(state.clock.status())
}

pub async fn start_simulation(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.clock.start();
    Json(json!({ "message": "market simulation running", "running": true }))
}

pub async fn stop_simulation(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.clock.stop();
    Json(json!({ "message": "market simulation stopped", "running": false }))
}

/// Apply a one-shot market event across every asset.
pub async fn trigger_market_event(
    State(state): State<AppState>,
    Json(request): Json<MarketEventRequest>,
) -> Json<serde_json::Value> {
    state.clock.trigger_event(request.event);
    Json(json!({
        "message": format!("{} event applied", request.event.as_str()),
    }))
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: String,
    pub transaction: Transaction,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct PricesResponse {
    pub prices: Vec<AssetQuote>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub count: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct PerformanceSummary {
    pub total_value: f64,
    pub total_invested: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub holdings_count: usize,
    pub sectors: Vec<String>,
    pub best_performer: Option<Holding>,
    pub worst_performer: Option<Holding>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub risk_tolerance: Option<RiskTolerance>,
}

#[derive(Debug, Deserialize)]
pub struct MarketEventRequest {
    pub event: MarketEvent,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AccountNotFound(_)
            | EngineError::AssetNotFound(_)
            | EngineError::PortfolioNotFound(_) => ApiError::NotFound(err.to_string()),
            EngineError::InsufficientFunds { .. }
            | EngineError::InsufficientHoldings { .. }
            | EngineError::InvalidAmount(_)
            | EngineError::UnsupportedOrderKind(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_the_right_status_family() {
        let not_found: ApiError = EngineError::AssetNotFound("NOPE".to_string()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let rejected: ApiError = EngineError::InsufficientFunds {
            needed: 100.0,
            available: 1.0,
        }
        .into();
        assert!(matches!(rejected, ApiError::BadRequest(_)));

        let unsupported: ApiError =
            EngineError::UnsupportedOrderKind("short".to_string()).into();
        assert!(matches!(unsupported, ApiError::BadRequest(_)));
    }
}
