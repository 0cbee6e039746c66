use ipr_shares::Principal;

use crate::types::{GlobalState, RoyaltyError};

/// Fails with `NotAuthorized` unless `caller` is the contract owner.
pub fn require_owner(state: &GlobalState, caller: &Principal) -> Result<(), RoyaltyError> {
    if &state.owner != caller {
        return Err(RoyaltyError::NotAuthorized);
    }
    Ok(())
}

/// Fails with `Paused` while the contract is paused.
pub fn require_unpaused(state: &GlobalState) -> Result<(), RoyaltyError> {
    if state.paused {
        return Err(RoyaltyError::Paused);
    }
    Ok(())
}
