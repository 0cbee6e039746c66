use std::collections::BTreeMap;

use ipr_shares::{Amount, Principal, TokenId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::accounts::AccountState;
use crate::transfer::{FungibleToken, ValueTransfer};
use crate::types::TransferError;

/// Balances of a single fungible token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    token_id: TokenId,
    symbol: String,
    balances: BTreeMap<Principal, AccountState>,
    total_supply: Amount,
}

impl TokenLedger {
    /// Create an empty ledger for the token at `token_id`.
    pub fn new(token_id: TokenId, symbol: impl Into<String>) -> Self {
        Self {
            token_id,
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create `amount` new units in `to`'s balance.
    pub fn mint(&mut self, to: &Principal, amount: Amount) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        self.balances.entry(*to).or_default().credit(amount)?;
        self.total_supply = supply;
        Ok(())
    }

    /// Number of holders with an entry in the ledger.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}

impl ValueTransfer for TokenLedger {
    fn transfer(
        &mut self,
        amount: Amount,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        self.balance_of(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.balances.entry(*from).or_default().debit(amount)?;
        self.balances.entry(*to).or_default().credit(amount)?;

        debug!(
            token = %self.symbol,
            from = %hex::encode(from),
            to = %hex::encode(to),
            amount = %amount,
            "token transfer applied"
        );
        Ok(())
    }

    fn balance_of(&self, who: &Principal) -> Amount {
        self.balances.get(who).map_or(0, |a| a.balance)
    }

    fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.token_id);
        for (holder, state) in &self.balances {
            hasher.update(holder);
            hasher.update(state.balance.to_le_bytes());
        }
        hasher.update(self.total_supply.to_le_bytes());

        let digest = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&digest);
        root
    }
}

impl FungibleToken for TokenLedger {
    fn token_id(&self) -> TokenId {
        self.token_id
    }
}
