//! Account store.
//!
//! Cash balances and risk-tolerance profiles. Cash moves only through
//! `debit`/`credit`, which the order engine calls after its validation
//! pass, so a balance can never go negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::{EngineError, Result};

/// How much volatility an account holder is willing to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

/// One trading account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub cash_balance: f64,
    pub risk_tolerance: RiskTolerance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: &str, username: &str, balance: f64, tolerance: RiskTolerance) {
        self.accounts.insert(
            id.to_string(),
            Account {
                id: id.to_string(),
                username: username.to_string(),
                cash_balance: balance,
                risk_tolerance: tolerance,
                created_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, id: &str) -> Result<&Account> {
        self.accounts
            .get(id)
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    /// Lower the balance by `amount`. Fails without mutating when the
    /// account cannot cover it.
    pub fn debit(&mut self, id: &str, amount: f64) -> Result<()> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))?;
        if amount > account.cash_balance {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available: account.cash_balance,
            });
        }
        account.cash_balance -= amount;
        Ok(())
    }

    /// Raise the balance by `amount` (must be non-negative).
    pub fn credit(&mut self, id: &str, amount: f64) -> Result<()> {
        if amount < 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))?;
        account.cash_balance += amount;
        Ok(())
    }

    pub fn set_risk_tolerance(&mut self, id: &str, tolerance: RiskTolerance) -> Result<()> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))?;
        account.risk_tolerance = tolerance;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_demo() -> AccountStore {
        let mut store = AccountStore::new();
        store.insert("demo_user", "demo_user", 10_000.0, RiskTolerance::Medium);
        store
    }

    #[test]
    fn debit_and_credit_move_cash() {
        let mut store = store_with_demo();
        store.debit("demo_user", 1_500.0).unwrap();
        store.credit("demo_user", 250.0).unwrap();
        assert!((store.get("demo_user").unwrap().cash_balance - 8_750.0).abs() < 1e-9);
    }

    #[test]
    fn overdraft_is_rejected_and_leaves_balance_unchanged() {
        let mut store = store_with_demo();
        let err = store.debit("demo_user", 10_000.01).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert_eq!(store.get("demo_user").unwrap().cash_balance, 10_000.0);
    }

    #[test]
    fn negative_credit_is_rejected() {
        let mut store = store_with_demo();
        let err = store.credit("demo_user", -1.0).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount(-1.0));
    }

    #[test]
    fn unknown_account_is_rejected() {
        let mut store = store_with_demo();
        assert!(matches!(
            store.debit("ghost", 1.0),
            Err(EngineError::AccountNotFound(_))
        ));
        assert!(matches!(
            store.get("ghost"),
            Err(EngineError::AccountNotFound(_))
        ));
    }

    #[test]
    fn risk_tolerance_can_be_updated() {
        let mut store = store_with_demo();
        store
            .set_risk_tolerance("demo_user", RiskTolerance::High)
            .unwrap();
        assert_eq!(
            store.get("demo_user").unwrap().risk_tolerance,
            RiskTolerance::High
        );
    }
}
