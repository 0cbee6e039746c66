use ipr_shares::Amount;
use thiserror::Error;

/// Errors that can occur while moving value between accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("transfer amount must be greater than zero")]
    ZeroAmount,

    #[error("account not found")]
    AccountNotFound,

    #[error("arithmetic overflow")]
    Overflow,
}
