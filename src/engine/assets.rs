//! Asset registry.
//!
//! Catalog of tradable assets and their latest simulated quotes. Quotes are
//! mutated by the market simulation clock and by the order engine's
//! market-impact step; every mutation goes through [`AssetRegistry::apply_price_change`]
//! so the price floor and change bookkeeping cannot be bypassed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

/// No mutation may take a price below this floor.
pub const PRICE_FLOOR: f64 = 0.01;

/// Latest simulated market quote for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetQuote {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub last_change: f64,
    pub last_change_percent: f64,
    pub volume: u64,
    pub updated_at: DateTime<Utc>,
}

/// Insertion-ordered asset catalog.
///
/// The universe is small and fixed, so a Vec with linear lookup beats a map
/// here and keeps tick iteration order (and therefore the seeded RNG
/// stream) stable across runs.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    quotes: Vec<AssetQuote>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self { quotes: Vec::new() }
    }

    /// Register an asset. Last write wins on duplicate symbols.
    pub fn insert(&mut self, symbol: &str, name: &str, sector: &str, price: f64, volume: u64) {
        let quote = AssetQuote {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            price: price.max(PRICE_FLOOR),
            last_change: 0.0,
            last_change_percent: 0.0,
            volume,
            updated_at: Utc::now(),
        };
        match self.quotes.iter_mut().find(|q| q.symbol == symbol) {
            Some(existing) => *existing = quote,
            None => self.quotes.push(quote),
        }
    }

    pub fn get(&self, symbol: &str) -> Result<&AssetQuote> {
        self.quotes
            .iter()
            .find(|q| q.symbol == symbol)
            .ok_or_else(|| EngineError::AssetNotFound(symbol.to_string()))
    }

    /// All quotes in registration order.
    pub fn all(&self) -> &[AssetQuote] {
        &self.quotes
    }

    /// Symbols in registration order; the tick loop iterates over this.
    pub fn symbols(&self) -> Vec<String> {
        self.quotes.iter().map(|q| q.symbol.clone()).collect()
    }

    /// Move a quote to `new_price` (clamped to the floor), recording the
    /// change against the prior price and bumping volume by `volume_bump`.
    /// Returns the clamped price actually applied.
    pub fn apply_price_change(
        &mut self,
        symbol: &str,
        new_price: f64,
        volume_bump: u64,
    ) -> Result<f64> {
        let quote = self
            .quotes
            .iter_mut()
            .find(|q| q.symbol == symbol)
            .ok_or_else(|| EngineError::AssetNotFound(symbol.to_string()))?;

        let clamped = new_price.max(PRICE_FLOOR);
        let previous = quote.price;
        quote.last_change = clamped - previous;
        quote.last_change_percent = if previous > 0.0 {
            quote.last_change / previous * 100.0
        } else {
            0.0
        };
        quote.price = clamped;
        quote.volume += volume_bump;
        quote.updated_at = Utc::now();
        Ok(clamped)
    }
}
