use std::collections::HashMap;

use ipr_shares::{Amount, Principal};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::accounts::AccountState;
use crate::transfer::ValueTransfer;
use crate::types::TransferError;

/// In-memory native currency balances.
#[derive(Debug, Clone)]
pub struct StateDB {
    accounts: HashMap<Principal, AccountState>,
}

impl StateDB {
    /// Create a new, empty state database.
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Look up an account by public key.
    pub fn get_account(&self, pubkey: &Principal) -> Option<&AccountState> {
        self.accounts.get(pubkey)
    }

    /// Get an existing account or create a zero-balance one.
    pub fn get_or_create_account(&mut self, pubkey: &Principal) -> &mut AccountState {
        self.accounts.entry(*pubkey).or_default()
    }

    /// Insert or overwrite an account.
    pub fn set_account(&mut self, pubkey: Principal, state: AccountState) {
        self.accounts.insert(pubkey, state);
    }

    /// Apply a single transfer: debit sender, credit receiver.
    ///
    /// Every check runs before either balance changes.
    pub fn apply_transfer(
        &mut self,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }

        let sender = self
            .accounts
            .get(from)
            .ok_or(TransferError::AccountNotFound)?;

        if sender.balance < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available: sender.balance,
            });
        }

        if from == to {
            return Ok(());
        }

        // Check the credit side before debiting so a failure leaves no trace.
        let receiver_balance = self.accounts.get(to).map_or(0, |a| a.balance);
        receiver_balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        if let Some(sender) = self.accounts.get_mut(from) {
            sender.debit(amount)?;
        }
        self.get_or_create_account(to).credit(amount)?;

        debug!(
            from = %hex::encode(from),
            to = %hex::encode(to),
            amount = %amount,
            "native transfer applied"
        );
        Ok(())
    }

    /// Compute a deterministic state root by hashing sorted serialized accounts.
    pub fn compute_state_root(&self) -> [u8; 32] {
        let mut entries: Vec<_> = self.accounts.iter().collect();
        entries.sort_by_key(|(k, _)| *k);

        let mut hasher = Sha256::new();
        for (pubkey, state) in &entries {
            hasher.update(pubkey);
            hasher.update(state.balance.to_le_bytes());
        }

        let digest = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&digest);
        root
    }

    /// Number of accounts in the state.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Sum of all account balances.
    pub fn total_supply(&self) -> Amount {
        self.accounts.values().map(|a| a.balance).sum()
    }
}

impl Default for StateDB {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTransfer for StateDB {
    fn transfer(
        &mut self,
        amount: Amount,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        self.apply_transfer(from, to, amount)
    }

    fn balance_of(&self, who: &Principal) -> Amount {
        self.get_account(who).map_or(0, |a| a.balance)
    }

    fn state_root(&self) -> [u8; 32] {
        self.compute_state_root()
    }
}
