//! Application configuration.
//!
//! Everything is driven by environment variables with sane defaults, plus
//! the static seed catalogs (assets, accounts, API keys) the simulation
//! starts from. State is process-lifetime only; there is nothing to point
//! at a database.

use crate::engine::accounts::RiskTolerance;

/// Default tick cadence and volatility; `FAST_MARKET=1` switches to the
/// more aggressive values used for local testing.
const TICK_INTERVAL_MS: u64 = 5_000;
const FAST_TICK_INTERVAL_MS: u64 = 3_000;
const VOLATILITY_FACTOR: f64 = 0.02;
const FAST_VOLATILITY_FACTOR: f64 = 0.15;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Fee rate charged on gross amount for buys (0.001 = 0.1%).
    pub buy_fee_rate: f64,
    /// Fee rate charged on gross amount for sells.
    pub sell_fee_rate: f64,
    /// Floor applied to every fee.
    pub minimum_fee: f64,
    /// Order-size bounds, enforced by the request layer before the engine
    /// ever sees the order.
    pub min_order_quantity: f64,
    pub max_order_quantity: f64,
    /// Market simulation tick cadence.
    pub tick_interval_ms: u64,
    /// Scale of the random walk applied on each tick.
    pub volatility_factor: f64,
    /// Seed for the simulation RNG. Unset means seed from OS entropy;
    /// set it to make runs (and tests) reproducible.
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let fast_market = std::env::var("FAST_MARKET")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let buy_fee_rate = env_f64("BUY_FEE_RATE", 0.001);
        let sell_fee_rate = env_f64("SELL_FEE_RATE", 0.001);
        let minimum_fee = env_f64("MINIMUM_FEE", 1.0);

        let min_order_quantity = env_f64("MIN_ORDER_QUANTITY", 1.0);
        let max_order_quantity = env_f64("MAX_ORDER_QUANTITY", 10_000.0);

        let default_interval = if fast_market {
            FAST_TICK_INTERVAL_MS
        } else {
            TICK_INTERVAL_MS
        };
        let tick_interval_ms = std::env::var("MARKET_TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(default_interval);

        let default_volatility = if fast_market {
            FAST_VOLATILITY_FACTOR
        } else {
            VOLATILITY_FACTOR
        };
        let volatility_factor = std::env::var("VOLATILITY_FACTOR")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v: &f64| v > 0.0)
            .unwrap_or(default_volatility);

        let rng_seed = std::env::var("MARKET_SEED")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            port,
            buy_fee_rate,
            sell_fee_rate,
            minimum_fee,
            min_order_quantity,
            max_order_quantity,
            tick_interval_ms,
            volatility_factor,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            buy_fee_rate: 0.001,
            sell_fee_rate: 0.001,
            minimum_fee: 1.0,
            min_order_quantity: 1.0,
            max_order_quantity: 10_000.0,
            tick_interval_ms: TICK_INTERVAL_MS,
            volatility_factor: VOLATILITY_FACTOR,
            rng_seed: None,
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

/// One tradable asset in the seeded universe.
pub struct AssetSeed {
    pub symbol: &'static str,
    pub name: &'static str,
    pub base_price: f64,
    pub sector: &'static str,
}

/// One pre-provisioned trading account.
pub struct AccountSeed {
    pub id: &'static str,
    pub username: &'static str,
    pub balance: f64,
    pub risk_tolerance: RiskTolerance,
}

/// The fixed asset universe the simulation prices.
pub fn default_assets() -> Vec<AssetSeed> {
    vec![
        AssetSeed { symbol: "AAPL", name: "Apple Inc.", base_price: 150.0, sector: "Technology" },
        AssetSeed { symbol: "GOOGL", name: "Alphabet Inc.", base_price: 2500.0, sector: "Technology" },
        AssetSeed { symbol: "MSFT", name: "Microsoft Corporation", base_price: 300.0, sector: "Technology" },
        AssetSeed { symbol: "TSLA", name: "Tesla Inc.", base_price: 800.0, sector: "Automotive" },
        AssetSeed { symbol: "AMZN", name: "Amazon.com Inc.", base_price: 3200.0, sector: "E-commerce" },
        AssetSeed { symbol: "JPM", name: "JPMorgan Chase & Co.", base_price: 140.0, sector: "Financial" },
        AssetSeed { symbol: "JNJ", name: "Johnson & Johnson", base_price: 160.0, sector: "Healthcare" },
        AssetSeed { symbol: "V", name: "Visa Inc.", base_price: 220.0, sector: "Financial" },
    ]
}

/// Pre-provisioned accounts, one empty portfolio each.
pub fn default_accounts() -> Vec<AccountSeed> {
    vec![
        AccountSeed {
            id: "demo_user",
            username: "demo_user",
            balance: 10_000.0,
            risk_tolerance: RiskTolerance::Medium,
        },
        AccountSeed {
            id: "admin_user",
            username: "admin_user",
            balance: 50_000.0,
            risk_tolerance: RiskTolerance::High,
        },
        AccountSeed {
            id: "trader_user",
            username: "trader_user",
            balance: 25_000.0,
            risk_tolerance: RiskTolerance::Low,
        },
    ]
}

/// Static API keys, resolved to account ids by the auth middleware.
/// Hardcoded on purpose: this is a simulation, not a production credential
/// store.
pub fn default_api_keys() -> Vec<(&'static str, &'static str)> {
    vec![
        ("demo-key-123", "demo_user"),
        ("admin-key-456", "admin_user"),
        ("trader-key-789", "trader_user"),
    ]
}
