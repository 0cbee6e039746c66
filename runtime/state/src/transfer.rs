use ipr_shares::{Amount, Principal, TokenId};

use crate::types::TransferError;

/// Capability to move an asset between two accounts.
///
/// A transfer either completes or leaves both balances untouched.
pub trait ValueTransfer {
    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, amount: Amount, from: &Principal, to: &Principal)
        -> Result<(), TransferError>;

    /// Current balance of `who`; unknown accounts hold zero.
    fn balance_of(&self, who: &Principal) -> Amount;

    /// Commitment over every balance, independent of insertion order.
    fn state_root(&self) -> [u8; 32];
}

/// A [`ValueTransfer`] for a specific fungible token.
pub trait FungibleToken: ValueTransfer {
    /// Address of the token ledger.
    fn token_id(&self) -> TokenId;
}
