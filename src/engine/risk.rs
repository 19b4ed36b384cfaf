//! Risk analysis and recommendations.
//!
//! Diversification and volatility scoring over an already-valuated
//! portfolio snapshot, tier classification, rule-based advisories, and an
//! unheld-asset recommender keyed off the account's risk tolerance.
//! Profiles are recomputed on demand and never cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::accounts::RiskTolerance;
use super::error::Result;
use super::Brokerage;

/// Sector volatility lookup. Sectors outside the table score 50.
fn sector_volatility(sector: &str) -> f64 {
    match sector {
        "Technology" => 65.0,
        "Healthcare" => 45.0,
        "Financial" => 55.0,
        "Automotive" => 70.0,
        "E-commerce" => 60.0,
        _ => 50.0,
    }
}

/// Holdings above this portfolio weight draw a concentration penalty.
const CONCENTRATION_LIMIT: f64 = 0.3;
const MAX_SECTORS: f64 = 5.0;
const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Derived risk view of one portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct RiskProfile {
    pub account_id: String,
    pub tier: RiskTier,
    pub diversification_score: f64,
    pub volatility_score: f64,
    pub advisories: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

/// One suggested asset for an account.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub rationale: String,
    pub priority: u8,
    pub risk_level: RiskTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSignal {
    Buy,
    Sell,
    Hold,
}

/// Synthetic indicator snapshot for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub price: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub rsi: f64,
    pub signal: TradeSignal,
    pub computed_at: DateTime<Utc>,
}

/// Computes risk profiles and investment recommendations. Stateless; all
/// inputs come from the injected brokerage state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAnalysisEngine;

impl RiskAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score the account's portfolio and classify its risk tier.
    pub fn analyze(&self, store: &Brokerage, account_id: &str) -> Result<RiskProfile> {
        let portfolio = store.portfolios.portfolio(account_id)?;

        let diversification = diversification_score(portfolio, store);
        let volatility = volatility_score(portfolio, store);

        let tier = if volatility < 30.0 && diversification > 70.0 {
            RiskTier::Low
        } else if volatility < 60.0 && diversification > 40.0 {
            RiskTier::Medium
        } else {
            RiskTier::High
        };

        Ok(RiskProfile {
            account_id: account_id.to_string(),
            tier,
            diversification_score: diversification,
            volatility_score: volatility,
            advisories: advisories(diversification, volatility, tier),
            computed_at: Utc::now(),
        })
    }

    /// Suggest up to five unheld assets, scored against the account's risk
    /// tolerance. Synthetic per-asset volatility comes from the seeded RNG.
    pub fn recommend(&self, store: &mut Brokerage, account_id: &str) -> Result<Vec<Recommendation>> {
        use rand::Rng;

        let tolerance = store.accounts.get(account_id)?.risk_tolerance;
        let held: HashSet<String> = store
            .portfolios
            .portfolio(account_id)?
            .holdings
            .iter()
            .map(|h| h.symbol.clone())
            .collect();

        let Brokerage { assets, rng, .. } = store;

        let mut recommendations = Vec::new();
        for quote in assets.all() {
            if held.contains(&quote.symbol) {
                continue;
            }

            let volatility: f64 = rng.gen_range(0.0..100.0);
            let (rationale, priority) = match tolerance {
                RiskTolerance::Low if volatility < 50.0 => {
                    ("Low-risk asset recommended for conservative profile", 1)
                }
                RiskTolerance::High if volatility > 60.0 => {
                    ("High-growth potential asset for aggressive profile", 2)
                }
                RiskTolerance::Medium => ("Balanced asset recommended for moderate profile", 1),
                _ => continue,
            };

            recommendations.push(Recommendation {
                symbol: quote.symbol.clone(),
                name: quote.name.clone(),
                price: quote.price,
                rationale: rationale.to_string(),
                priority,
                risk_level: if volatility > 60.0 {
                    RiskTier::High
                } else {
                    RiskTier::Medium
                },
            });
        }

        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        recommendations.truncate(MAX_RECOMMENDATIONS);
        Ok(recommendations)
    }

    /// Synthetic moving-average / RSI snapshot for one symbol.
    pub fn technical(&self, store: &mut Brokerage, symbol: &str) -> Result<TechnicalSnapshot> {
        use rand::Rng;

        let price = store.assets.get(symbol)?.price;
        let rng = &mut store.rng;

        let sma20 = price * (1.0 + rng.gen_range(-0.05..0.05));
        let sma50 = price * (1.0 + rng.gen_range(-0.05..0.05));
        let rsi = rng.gen_range(20.0..80.0);

        let signal = if price > sma20 && sma20 > sma50 && rsi < 70.0 {
            TradeSignal::Buy
        } else if price < sma20 && sma20 < sma50 && rsi > 30.0 {
            TradeSignal::Sell
        } else {
            TradeSignal::Hold
        };

        Ok(TechnicalSnapshot {
            symbol: symbol.to_string(),
            price,
            sma20,
            sma50,
            rsi,
            signal,
            computed_at: Utc::now(),
        })
    }
}

/// Sector breadth plus concentration penalty, 0-100.
fn diversification_score(portfolio: &super::Portfolio, store: &Brokerage) -> f64 {
    if portfolio.holdings.is_empty() {
        return 0.0;
    }

    let sectors: HashSet<&str> = portfolio
        .holdings
        .iter()
        .filter_map(|h| store.assets.get(&h.symbol).ok())
        .map(|q| q.sector.as_str())
        .collect();
    let sector_score = (sectors.len() as f64 / MAX_SECTORS).min(1.0) * 50.0;

    let total_value = portfolio.total_value;
    let mut concentration_penalty = 0.0;
    if total_value > 0.0 {
        for holding in &portfolio.holdings {
            let weight = holding.current_value / total_value;
            if weight > CONCENTRATION_LIMIT {
                concentration_penalty += (weight - CONCENTRATION_LIMIT) * 100.0;
            }
        }
    }
    let distribution_score = (50.0 - concentration_penalty).max(0.0);

    (sector_score + distribution_score).min(100.0)
}

/// Value-weighted sector volatility, 0-100.
fn volatility_score(portfolio: &super::Portfolio, store: &Brokerage) -> f64 {
    if portfolio.holdings.is_empty() {
        return 0.0;
    }

    let total_value = portfolio.total_value;
    if total_value <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = portfolio
        .holdings
        .iter()
        .map(|h| {
            let weight = h.current_value / total_value;
            let volatility = store
                .assets
                .get(&h.symbol)
                .map(|q| sector_volatility(&q.sector))
                .unwrap_or(50.0);
            weight * volatility
        })
        .sum();

    weighted.min(100.0)
}

/// Ordered, rule-based advisories; falls back to a neutral note when no
/// rule fires.
fn advisories(diversification: f64, volatility: f64, tier: RiskTier) -> Vec<String> {
    let mut advisories = Vec::new();

    if diversification < 40.0 {
        advisories.push("Consider diversifying into more sectors".to_string());
    }
    if volatility > 70.0 {
        advisories.push("Reduce volatile assets, add more stable ones".to_string());
    }
    if tier == RiskTier::High {
        advisories.push("High risk detected, review your investment strategy".to_string());
    }
    if diversification > 80.0 && volatility < 30.0 {
        advisories.push("Excellent diversification and low risk, keep this strategy".to_string());
    }

    if advisories.is_empty() {
        advisories.push("Portfolio looks balanced, keep monitoring".to_string());
    }
    advisories
}
