//! Trading and portfolio valuation engine.
//!
//! Plain synchronous operations over one in-memory state container; the
//! request layer and the simulation clock are the only callers. Everything
//! here is transport-agnostic: no HTTP, no headers, no credentials.

pub mod accounts;
pub mod assets;
pub mod error;
pub mod orders;
pub mod portfolio;
pub mod risk;
pub mod simulation;


pub use accounts::{Account, AccountStore, RiskTolerance};
pub use assets::{AssetQuote, AssetRegistry, PRICE_FLOOR};
pub use error::{EngineError, Result};
pub use orders::{OrderExecutionEngine, OrderKind, Transaction, TransactionLog, TransactionStatus};
pub use portfolio::{Holding, Portfolio, PortfolioLedger};
pub use risk::{Recommendation, RiskAnalysisEngine, RiskProfile, RiskTier, TechnicalSnapshot};
pub use simulation::{
    run_market_pass, MarketEvent, MarketSimulationClock, PriceMove, SimulationStatus,
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::Config;

/// The whole in-memory brokerage state: asset quotes, cash balances,
/// portfolios and the transaction log, plus the one RNG every random draw
/// goes through.
///
/// Owned explicitly and injected into the engines; callers share it behind
/// `Arc<parking_lot::RwLock<..>>` so order execution and simulation ticks
/// serialize against each other (each takes the write lock for its whole
/// pass).
pub struct Brokerage {
    pub assets: AssetRegistry,
    pub accounts: AccountStore,
    pub portfolios: PortfolioLedger,
    pub transactions: TransactionLog,
    /// Seeded simulation RNG. A fixed seed makes tick sequences, synthetic
    /// scores and transaction-id suffixes reproducible.
    pub(crate) rng: ChaCha8Rng,
}

impl Brokerage {
    /// Empty state with no seed data, for tests that build their own world.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            assets: AssetRegistry::new(),
            accounts: AccountStore::new(),
            portfolios: PortfolioLedger::new(),
            transactions: TransactionLog::new(),
            rng: match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            },
        }
    }

    /// State seeded with the default asset universe and accounts.
    pub fn seeded(config: &Config) -> Self {
        use rand::Rng;

        let mut brokerage = Self::new(config.rng_seed);
        for asset in crate::config::default_assets() {
            let volume = brokerage.rng.gen_range(0..1_000_000);
            brokerage.assets.insert(
                asset.symbol,
                asset.name,
                asset.sector,
                asset.base_price,
                volume,
            );
        }
        for account in crate::config::default_accounts() {
            brokerage.accounts.insert(
                account.id,
                account.username,
                account.balance,
                account.risk_tolerance,
            );
            brokerage.portfolios.create(account.id);
        }
        brokerage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_state_contains_the_default_world() {
        let brokerage = Brokerage::seeded(&Config::default());
        assert_eq!(brokerage.assets.all().len(), 8);
        assert_eq!(brokerage.accounts.ids().len(), 3);
        for id in brokerage.accounts.ids() {
            let portfolio = brokerage.portfolios.portfolio(&id).unwrap();
            assert!(portfolio.holdings.is_empty());
        }
    }

    #[test]
    fn equal_seeds_produce_equal_initial_volumes() {
        let config = Config {
            rng_seed: Some(42),
            ..Config::default()
        };
        let a = Brokerage::seeded(&config);
        let b = Brokerage::seeded(&config);
        let volumes_a: Vec<u64> = a.assets.all().iter().map(|q| q.volume).collect();
        let volumes_b: Vec<u64> = b.assets.all().iter().map(|q| q.volume).collect();
        assert_eq!(volumes_a, volumes_b);
    }
}
