//! Order execution.
//!
//! One contract, two directions: buys and sells share the fee and
//! market-impact logic and differ only in which way cash and holdings move.
//! Validation runs in full before the first write, so a failed order leaves
//! the store exactly as it found it. Every completed order is recorded in
//! the append-only transaction log and feeds a size-proportional price
//! nudge back into the asset registry.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::{EngineError, Result};
use super::Brokerage;
use crate::config::Config;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Buy,
    Sell,
}

impl OrderKind {
    pub fn as_str(&self) -> &str {
        match self {
            OrderKind::Buy => "buy",
            OrderKind::Sell => "sell",
        }
    }
}

impl FromStr for OrderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(OrderKind::Buy),
            "sell" => Ok(OrderKind::Sell),
            other => Err(EngineError::UnsupportedOrderKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable record of an executed order. Never mutated or deleted once
/// its status leaves `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub kind: OrderKind,
    pub symbol: String,
    pub quantity: f64,
    pub execution_price: f64,
    pub fee: f64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        id: String,
        account_id: &str,
        kind: OrderKind,
        symbol: &str,
        quantity: f64,
        execution_price: f64,
        fee: f64,
    ) -> Self {
        Self {
            id,
            account_id: account_id.to_string(),
            kind,
            symbol: symbol.to_string(),
            quantity,
            execution_price,
            fee,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn complete(&mut self) {
        self.status = TransactionStatus::Completed;
    }
}

/// Append-only transaction history.
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, transaction: Transaction) {
        self.entries.push(transaction);
    }

    pub fn for_account(&self, account_id: &str) -> Vec<Transaction> {
        self.entries
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orders larger than this fraction of a million units start to move the
/// quote; the nudge is `price * (quantity / 1_000_000) * 0.001`.
const IMPACT_BASE: f64 = 1_000_000.0;
const IMPACT_SCALE: f64 = 0.001;

/// Executes buy and sell orders against the brokerage state.
#[derive(Debug, Clone)]
pub struct OrderExecutionEngine {
    buy_fee_rate: f64,
    sell_fee_rate: f64,
    minimum_fee: f64,
}

impl OrderExecutionEngine {
    pub fn new(buy_fee_rate: f64, sell_fee_rate: f64, minimum_fee: f64) -> Self {
        Self {
            buy_fee_rate,
            sell_fee_rate,
            minimum_fee,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.buy_fee_rate, config.sell_fee_rate, config.minimum_fee)
    }

    /// Fee on the gross amount, floored at the configured minimum. Charged
    /// on top of the gross for buys and out of the proceeds for sells.
    pub fn fee(&self, gross: f64, kind: OrderKind) -> f64 {
        let rate = match kind {
            OrderKind::Buy => self.buy_fee_rate,
            OrderKind::Sell => self.sell_fee_rate,
        };
        (gross * rate).max(self.minimum_fee)
    }

    /// Execute an order at the current quote. All-or-nothing: validation
    /// precedes every write, and all writes happen under the caller's lock
    /// hold.
    pub fn execute(
        &self,
        store: &mut Brokerage,
        kind: OrderKind,
        account_id: &str,
        symbol: &str,
        quantity: f64,
    ) -> Result<Transaction> {
        let account = store.accounts.get(account_id)?;
        let quote = store.assets.get(symbol)?;
        let portfolio = store.portfolios.portfolio(account_id)?;
        let execution_price = quote.price;

        let gross = quantity * execution_price;
        let fee = self.fee(gross, kind);

        match kind {
            OrderKind::Buy => {
                let total_cost = gross + fee;
                if account.cash_balance < total_cost {
                    return Err(EngineError::InsufficientFunds {
                        needed: total_cost,
                        available: account.cash_balance,
                    });
                }
            }
            OrderKind::Sell => {
                let held = portfolio.held_quantity(symbol);
                if held < quantity {
                    return Err(EngineError::InsufficientHoldings {
                        symbol: symbol.to_string(),
                        needed: quantity,
                        held,
                    });
                }
            }
        }

        let mut transaction = Transaction::new(
            next_transaction_id(&mut store.rng),
            account_id,
            kind,
            symbol,
            quantity,
            execution_price,
            fee,
        );

        match kind {
            OrderKind::Buy => {
                store.accounts.debit(account_id, gross + fee)?;
                store.portfolios.apply_buy(
                    &store.assets,
                    account_id,
                    symbol,
                    quantity,
                    execution_price,
                )?;
            }
            OrderKind::Sell => {
                store.accounts.credit(account_id, gross - fee)?;
                store
                    .portfolios
                    .apply_decrease(&store.assets, account_id, symbol, quantity)?;
            }
        }

        transaction.complete();
        store.transactions.append(transaction.clone());

        self.apply_market_impact(store, kind, symbol, quantity);

        Ok(transaction)
    }

    /// Nudge the quote in the direction of the order, proportionally to its
    /// size, then revalue holders against the moved price.
    fn apply_market_impact(&self, store: &mut Brokerage, kind: OrderKind, symbol: &str, quantity: f64) {
        let Ok(quote) = store.assets.get(symbol) else {
            return;
        };
        let impact = quote.price * (quantity / IMPACT_BASE) * IMPACT_SCALE;
        let new_price = match kind {
            OrderKind::Buy => quote.price + impact,
            OrderKind::Sell => quote.price - impact,
        };
        if store.assets.apply_price_change(symbol, new_price, 0).is_ok() {
            store.portfolios.revalue_all(&store.assets);
        }
    }
}

/// Opaque transaction id: millisecond timestamp plus a suffix drawn from
/// the seeded RNG.
fn next_transaction_id(rng: &mut ChaCha8Rng) -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..9)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("txn_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accounts::RiskTolerance;

    fn engine() -> OrderExecutionEngine {
        OrderExecutionEngine::new(0.001, 0.001, 1.0)
    }

    fn seeded_store() -> Brokerage {
        let mut store = Brokerage::new(Some(7));
        store.assets.insert("AAPL", "Apple Inc.", "Technology", 150.0, 0);
        store
            .accounts
            .insert("demo_user", "demo_user", 10_000.0, RiskTolerance::Medium);
        store.portfolios.create("demo_user");
        store
    }

    #[test]
    fn buy_charges_gross_plus_fee_and_opens_the_holding() {
        let mut store = seeded_store();
        let txn = engine()
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
            .unwrap();

        // fee = max(1500 * 0.001, 1.0) = 1.5, total cost 1501.5
        assert!((txn.fee - 1.5).abs() < 1e-9);
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert!((store.accounts.get("demo_user").unwrap().cash_balance - 8_498.5).abs() < 1e-9);

        let holding = store
            .portfolios
            .portfolio("demo_user")
            .unwrap()
            .holding("AAPL")
            .unwrap()
            .clone();
        assert_eq!(holding.quantity, 10.0);
        assert_eq!(holding.average_cost, 150.0);
    }

    #[test]
    fn minimum_fee_applies_to_small_orders() {
        let mut store = seeded_store();
        let txn = engine()
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 1.0)
            .unwrap();
        // 150 * 0.001 = 0.15 < 1.0 minimum
        assert_eq!(txn.fee, 1.0);
    }

    #[test]
    fn unaffordable_buy_leaves_every_store_untouched() {
        let mut store = seeded_store();
        let err = engine()
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 100.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));

        assert_eq!(store.accounts.get("demo_user").unwrap().cash_balance, 10_000.0);
        assert!(store.portfolios.portfolio("demo_user").unwrap().holdings.is_empty());
        assert!(store.transactions.is_empty());
        assert_eq!(store.assets.get("AAPL").unwrap().price, 150.0);
    }

    #[test]
    fn sell_credits_net_proceeds_and_reduces_the_holding() {
        let mut store = seeded_store();
        let engine = engine();
        engine
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
            .unwrap();
        let balance_before = store.accounts.get("demo_user").unwrap().cash_balance;
        let price_before = store.assets.get("AAPL").unwrap().price;

        let txn = engine
            .execute(&mut store, OrderKind::Sell, "demo_user", "AAPL", 4.0)
            .unwrap();

        let gross = 4.0 * price_before;
        let expected_fee = (gross * 0.001).max(1.0);
        assert!((txn.fee - expected_fee).abs() < 1e-9);

        let balance = store.accounts.get("demo_user").unwrap().cash_balance;
        assert!((balance - (balance_before + gross - expected_fee)).abs() < 1e-9);

        let holding = store
            .portfolios
            .portfolio("demo_user")
            .unwrap()
            .holding("AAPL")
            .unwrap()
            .clone();
        assert_eq!(holding.quantity, 6.0);
        assert_eq!(holding.average_cost, 150.0);
    }

    #[test]
    fn overselling_fails_before_any_mutation() {
        let mut store = seeded_store();
        let engine = engine();
        engine
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
            .unwrap();
        let balance_before = store.accounts.get("demo_user").unwrap().cash_balance;
        let transactions_before = store.transactions.len();

        let err = engine
            .execute(&mut store, OrderKind::Sell, "demo_user", "AAPL", 11.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientHoldings { .. }));
        assert_eq!(store.accounts.get("demo_user").unwrap().cash_balance, balance_before);
        assert_eq!(store.transactions.len(), transactions_before);
        assert_eq!(
            store
                .portfolios
                .portfolio("demo_user")
                .unwrap()
                .held_quantity("AAPL"),
            10.0
        );
    }

    #[test]
    fn buys_push_the_quote_up_and_sells_pull_it_down() {
        let mut store = seeded_store();
        let engine = engine();

        let before = store.assets.get("AAPL").unwrap().price;
        engine
            .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 50.0)
            .unwrap();
        let after_buy = store.assets.get("AAPL").unwrap().price;
        assert!(after_buy > before);

        engine
            .execute(&mut store, OrderKind::Sell, "demo_user", "AAPL", 50.0)
            .unwrap();
        let after_sell = store.assets.get("AAPL").unwrap().price;
        assert!(after_sell < after_buy);
    }

    #[test]
    fn a_sale_netting_negative_is_rejected_whole() {
        let mut store = seeded_store();
        store.assets.insert("PENNY", "Penny Co", "Frontier", 0.05, 0);
        let engine = engine();
        engine
            .execute(&mut store, OrderKind::Buy, "demo_user", "PENNY", 4.0)
            .unwrap();
        let balance_before = store.accounts.get("demo_user").unwrap().cash_balance;

        // Gross proceeds 0.20 cannot cover the 1.0 minimum fee; crediting a
        // negative net is refused and nothing moves.
        let err = engine
            .execute(&mut store, OrderKind::Sell, "demo_user", "PENNY", 4.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(
            store.accounts.get("demo_user").unwrap().cash_balance,
            balance_before
        );
        assert_eq!(
            store
                .portfolios
                .portfolio("demo_user")
                .unwrap()
                .held_quantity("PENNY"),
            4.0
        );
    }

    #[test]
    fn unknown_account_and_symbol_are_rejected() {
        let mut store = seeded_store();
        assert!(matches!(
            engine().execute(&mut store, OrderKind::Buy, "ghost", "AAPL", 1.0),
            Err(EngineError::AccountNotFound(_))
        ));
        assert!(matches!(
            engine().execute(&mut store, OrderKind::Buy, "demo_user", "NOPE", 1.0),
            Err(EngineError::AssetNotFound(_))
        ));
    }

    #[test]
    fn order_kind_parses_strictly() {
        assert_eq!("buy".parse::<OrderKind>().unwrap(), OrderKind::Buy);
        assert_eq!("sell".parse::<OrderKind>().unwrap(), OrderKind::Sell);
        assert!(matches!(
            "short".parse::<OrderKind>(),
            Err(EngineError::UnsupportedOrderKind(_))
        ));
    }

    #[test]
    fn transaction_ids_are_unique() {
        let mut store = seeded_store();
        let engine = engine();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..20 {
            let txn = engine
                .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 1.0)
                .unwrap();
            assert!(ids.insert(txn.id));
        }
    }
}
