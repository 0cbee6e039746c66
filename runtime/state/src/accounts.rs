use ipr_shares::Amount;
use serde::{Deserialize, Serialize};

use crate::types::TransferError;

/// Balance held by one account in one asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountState {
    pub balance: Amount,
}

impl AccountState {
    /// Create a new account with the given balance.
    pub fn new(balance: Amount) -> Self {
        Self { balance }
    }

    /// Subtract `amount` from balance. Fails if insufficient.
    pub fn debit(&mut self, amount: Amount) -> Result<(), TransferError> {
        if self.balance < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Add `amount` to balance. Fails on overflow.
    pub fn credit(&mut self, amount: Amount) -> Result<(), TransferError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        Ok(())
    }
}
