//! Portfolio ledger.
//!
//! Holdings with weighted-average cost basis, revalued against the asset
//! registry after every mutation. Average cost is recomputed on buys only;
//! sells reduce quantity and leave the cost basis untouched (average-cost
//! accounting, not FIFO lot tracking).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::assets::AssetRegistry;
use super::error::{EngineError, Result};

/// Below this a position counts as flat and the holding is removed.
const FLAT_EPSILON: f64 = 1e-9;

/// One position inside a portfolio. Exists only while quantity > 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub average_cost: f64,
    pub current_value: f64,
    pub unrealized_return: f64,
    pub unrealized_return_pct: f64,
}

impl Holding {
    fn new(symbol: &str, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            average_cost: price,
            current_value: 0.0,
            unrealized_return: 0.0,
            unrealized_return_pct: 0.0,
        }
    }

    /// Fold a new lot into the position at the quantity-weighted mean cost.
    fn add_shares(&mut self, quantity: f64, price: f64) {
        let total_quantity = self.quantity + quantity;
        let total_cost = self.quantity * self.average_cost + quantity * price;
        self.quantity = total_quantity;
        self.average_cost = total_cost / total_quantity;
    }

    fn invested(&self) -> f64 {
        self.quantity * self.average_cost
    }

    fn mark(&mut self, price: f64) {
        self.current_value = self.quantity * price;
        let invested = self.invested();
        self.unrealized_return = self.current_value - invested;
        self.unrealized_return_pct = if invested > 0.0 {
            self.unrealized_return / invested * 100.0
        } else {
            0.0
        };
    }
}

/// One account's holdings plus aggregate valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub account_id: String,
    pub holdings: Vec<Holding>,
    pub total_value: f64,
    pub total_invested: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub last_valued_at: DateTime<Utc>,
}

impl Portfolio {
    fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            holdings: Vec::new(),
            total_value: 0.0,
            total_invested: 0.0,
            total_return: 0.0,
            total_return_pct: 0.0,
            last_valued_at: Utc::now(),
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn held_quantity(&self, symbol: &str) -> f64 {
        self.holding(symbol).map(|h| h.quantity).unwrap_or(0.0)
    }
}

/// Ledger of every account's portfolio.
#[derive(Debug, Default)]
pub struct PortfolioLedger {
    portfolios: HashMap<String, Portfolio>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self {
            portfolios: HashMap::new(),
        }
    }

    /// Create the (empty) portfolio for an account. Called once at seeding;
    /// portfolios are never destroyed afterwards.
    pub fn create(&mut self, account_id: &str) {
        self.portfolios
            .entry(account_id.to_string())
            .or_insert_with(|| Portfolio::new(account_id));
    }

    pub fn portfolio(&self, account_id: &str) -> Result<&Portfolio> {
        self.portfolios
            .get(account_id)
            .ok_or_else(|| EngineError::PortfolioNotFound(account_id.to_string()))
    }

    /// Record a buy: fold into the existing holding at the weighted-average
    /// cost, or open a new holding at the execution price. Revalues the
    /// portfolio before returning.
    pub fn apply_buy(
        &mut self,
        registry: &AssetRegistry,
        account_id: &str,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> Result<()> {
        let portfolio = self
            .portfolios
            .get_mut(account_id)
            .ok_or_else(|| EngineError::PortfolioNotFound(account_id.to_string()))?;

        match portfolio.holdings.iter_mut().find(|h| h.symbol == symbol) {
            Some(holding) => holding.add_shares(quantity, price),
            None => portfolio.holdings.push(Holding::new(symbol, quantity, price)),
        }

        Self::revalue_portfolio(portfolio, registry);
        Ok(())
    }

    /// Record a sell: reduce quantity, dropping the holding once flat.
    /// Average cost is deliberately untouched. Revalues before returning.
    pub fn apply_decrease(
        &mut self,
        registry: &AssetRegistry,
        account_id: &str,
        symbol: &str,
        quantity: f64,
    ) -> Result<()> {
        let portfolio = self
            .portfolios
            .get_mut(account_id)
            .ok_or_else(|| EngineError::PortfolioNotFound(account_id.to_string()))?;

        let held = portfolio.held_quantity(symbol);
        if held < quantity {
            return Err(EngineError::InsufficientHoldings {
                symbol: symbol.to_string(),
                needed: quantity,
                held,
            });
        }

        if let Some(holding) = portfolio.holdings.iter_mut().find(|h| h.symbol == symbol) {
            holding.quantity -= quantity;
        }
        portfolio.holdings.retain(|h| h.quantity > FLAT_EPSILON);

        Self::revalue_portfolio(portfolio, registry);
        Ok(())
    }

    /// Recompute every holding's valuation and the aggregates from current
    /// registry prices.
    pub fn revalue(&mut self, registry: &AssetRegistry, account_id: &str) -> Result<()> {
        let portfolio = self
            .portfolios
            .get_mut(account_id)
            .ok_or_else(|| EngineError::PortfolioNotFound(account_id.to_string()))?;
        Self::revalue_portfolio(portfolio, registry);
        Ok(())
    }

    /// Revalue every portfolio that has at least one holding. Called after
    /// each market tick.
    pub fn revalue_all(&mut self, registry: &AssetRegistry) {
        for portfolio in self.portfolios.values_mut() {
            if !portfolio.holdings.is_empty() {
                Self::revalue_portfolio(portfolio, registry);
            }
        }
    }

    fn revalue_portfolio(portfolio: &mut Portfolio, registry: &AssetRegistry) {
        let mut total_value = 0.0;
        let mut total_invested = 0.0;

        for holding in &mut portfolio.holdings {
            // A symbol missing from the registry keeps its last marks and
            // is excluded from this pass's aggregates.
            let Ok(quote) = registry.get(&holding.symbol) else {
                continue;
            };
            holding.mark(quote.price);
            total_value += holding.current_value;
            total_invested += holding.invested();
        }

        portfolio.total_value = total_value;
        portfolio.total_invested = total_invested;
        portfolio.total_return = total_value - total_invested;
        portfolio.total_return_pct = if total_invested > 0.0 {
            portfolio.total_return / total_invested * 100.0
        } else {
            0.0
        };
        portfolio.last_valued_at = Utc::now();
    }
}
