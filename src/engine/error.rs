//! Typed engine errors.
//!
//! Every failure is terminal for the operation that raised it: validation
//! runs before any mutation, so an error always leaves the store unchanged.
//! The request layer maps these to status codes; the engine never formats
//! user-facing responses itself.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("portfolio not found for account: {0}")]
    PortfolioNotFound(String),

    #[error("insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("insufficient holdings of {symbol}: need {needed}, have {held}")]
    InsufficientHoldings {
        symbol: String,
        needed: f64,
        held: f64,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("unsupported order kind: {0}")]
    UnsupportedOrderKind(String),
}
