use ipr_registry::PatentDirectory;
use ipr_shares::{
    preview_distribution, validate_share_set, Amount, PatentId, Principal, ShareSet, TokenType,
};
use ipr_state::{FungibleToken, ValueTransfer};

use crate::call::CallContext;
use crate::guard::{require_owner, require_unpaused};
use crate::ledger::RoyaltyLedger;
use crate::types::*;

/// Patent royalty contract: ledger plus its two injected capabilities.
///
/// `D` answers ownership and contributor questions, `V` moves the native
/// currency between the caller, the custody account and contributors. Token
/// distributions use a ledger supplied per call.
///
/// Operations do not undo their own partial work when a later step fails;
/// run them through [`crate::RoyaltyHost`] for all-or-nothing calls.
#[derive(Debug, Clone)]
pub struct RoyaltyContract<D, V> {
    params: RoyaltyParams,
    ledger: RoyaltyLedger,
    directory: D,
    native: V,
}

impl<D: PatentDirectory, V: ValueTransfer> RoyaltyContract<D, V> {
    /// Deploy a new contract owned by `owner`.
    pub fn new(owner: Principal, params: RoyaltyParams, directory: D, native: V) -> Self {
        Self {
            params,
            ledger: RoyaltyLedger::new(owner),
            directory,
            native,
        }
    }

    pub fn params(&self) -> &RoyaltyParams {
        &self.params
    }

    pub fn ledger(&self) -> &RoyaltyLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    pub fn native(&self) -> &V {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut V {
        &mut self.native
    }

    /// Store `shares` as the active share set of `patent_id`.
    ///
    /// Only the patent's registered owner may do this. The set is validated
    /// and stored exactly as given.
    pub fn set_patent_shares(
        &mut self,
        ctx: &CallContext,
        patent_id: PatentId,
        shares: ShareSet,
    ) -> Result<(), RoyaltyError> {
        require_unpaused(self.ledger.global())?;

        if !self.directory.is_registered(&patent_id) {
            return Err(RoyaltyError::InvalidPatent);
        }
        let owner = self
            .directory
            .get_owner(&patent_id)
            .map_err(|_| RoyaltyError::InvalidPatent)?;
        if &owner != ctx.caller() {
            return Err(RoyaltyError::NotAuthorized);
        }

        let shares = validate_share_set(shares, self.params.max_contributors)?;
        let count = shares.len();
        self.ledger.put_shares(patent_id, shares);

        tracing::info!(
            patent = %hex::encode(patent_id),
            contributors = count,
            "patent shares set"
        );
        Ok(())
    }

    /// Run every distribution precondition without touching state.
    ///
    /// Checked in order: not paused, amount at least the minimum deposit,
    /// shares set, directory lists at least one contributor.
    pub fn check_distribution(&self, patent_id: &PatentId, amount: Amount) -> Result<(), RoyaltyError> {
        require_unpaused(self.ledger.global())?;

        if amount < self.params.min_deposit_amount {
            return Err(RoyaltyError::InvalidAmount);
        }
        if self.ledger.get_patent_shares(patent_id).is_none() {
            return Err(RoyaltyError::SharesNotSet);
        }
        let contributors = self
            .directory
            .get_contributors(patent_id)
            .map_err(|_| RoyaltyError::InvalidPatent)?;
        if contributors.is_empty() {
            return Err(RoyaltyError::NoContributors);
        }
        Ok(())
    }

    /// Collect `amount` from the caller and split it across the patent's
    /// active share set.
    ///
    /// Every leg is priced first as `floor(amount * percentage / 100)`. A leg
    /// that rounds to zero or targets the custody account aborts before any
    /// funds move. The deposit is then moved from the caller into custody and
    /// each leg is paid out of custody in share-set order, so only the
    /// rounding residue stays behind. Funds move through `token` when given,
    /// otherwise through the native channel.
    pub fn distribute_royalties(
        &mut self,
        ctx: &CallContext,
        patent_id: PatentId,
        amount: Amount,
        mut token: Option<&mut dyn FungibleToken>,
    ) -> Result<DistributionOutcome, RoyaltyError> {
        self.check_distribution(&patent_id, amount)?;

        let shares = self
            .ledger
            .get_patent_shares(&patent_id)
            .cloned()
            .ok_or(RoyaltyError::SharesNotSet)?;
        let token_type = TokenType::from(token.as_ref().map(|t| t.token_id()));
        let custody = self.params.custody;

        let plan = preview_distribution(amount, &shares)?;
        for (index, leg) in plan.legs.iter().enumerate() {
            if leg.payout == 0 {
                tracing::warn!(
                    patent = %hex::encode(patent_id),
                    index,
                    percentage = leg.percentage,
                    "payout leg rounds to zero, aborting distribution"
                );
                return Err(RoyaltyError::DistributionFailed(
                    DistributionFailure::ZeroPayout {
                        index,
                        contributor: leg.contributor,
                    },
                ));
            }
            if leg.contributor == custody {
                return Err(RoyaltyError::InvalidRecipient);
            }
        }

        let deposited = match token.as_mut() {
            Some(ledger) => ledger.transfer(amount, ctx.caller(), &custody),
            None => self.native.transfer(amount, ctx.caller(), &custody),
        };
        if let Err(error) = deposited {
            tracing::warn!(
                caller = %hex::encode(ctx.caller()),
                amount = %amount,
                error = %error,
                "deposit refused, aborting distribution"
            );
            return Err(RoyaltyError::DistributionFailed(
                DistributionFailure::Deposit { error },
            ));
        }

        let distribution_id = self.ledger.open_distribution(
            patent_id,
            amount,
            token_type,
            *ctx.caller(),
            ctx.height(),
        )?;

        let mut outcome = DistributionOutcome {
            distribution_id,
            patent_id,
            token_type,
            remaining: amount,
            legs: Vec::with_capacity(plan.legs.len()),
        };

        for (index, leg) in plan.legs.into_iter().enumerate() {
            let remaining = outcome
                .remaining
                .checked_sub(leg.payout)
                .ok_or(RoyaltyError::ArithmeticOverflow)?;

            let delivered = match token.as_mut() {
                Some(ledger) => ledger.transfer(leg.payout, &custody, &leg.contributor),
                None => self.native.transfer(leg.payout, &custody, &leg.contributor),
            };
            if let Err(error) = delivered {
                tracing::warn!(
                    distribution = distribution_id,
                    index,
                    error = %error,
                    "payout transfer failed, aborting distribution"
                );
                return Err(RoyaltyError::DistributionFailed(
                    DistributionFailure::Transfer { index, error },
                ));
            }

            self.ledger
                .credit_contributor(patent_id, leg.contributor, leg.payout)?;
            outcome.remaining = remaining;

            tracing::debug!(
                distribution = distribution_id,
                contributor = %hex::encode(leg.contributor),
                percentage = leg.percentage,
                payout = %leg.payout,
                "payout leg delivered"
            );
            outcome.legs.push(PayoutLeg {
                contributor: leg.contributor,
                percentage: leg.percentage,
                payout: leg.payout,
            });
        }

        tracing::info!(
            distribution = distribution_id,
            patent = %hex::encode(patent_id),
            amount = %amount,
            remaining = %outcome.remaining,
            legs = outcome.legs.len(),
            "royalties distributed"
        );
        Ok(outcome)
    }

    /// Owner only. Pausing an already paused contract is a no-op.
    pub fn pause_contract(&mut self, ctx: &CallContext) -> Result<(), RoyaltyError> {
        require_owner(self.ledger.global(), ctx.caller())?;
        self.ledger.set_paused(true);
        tracing::info!("contract paused");
        Ok(())
    }

    /// Owner only. Unpausing a running contract is a no-op.
    pub fn unpause_contract(&mut self, ctx: &CallContext) -> Result<(), RoyaltyError> {
        require_owner(self.ledger.global(), ctx.caller())?;
        self.ledger.set_paused(false);
        tracing::info!("contract unpaused");
        Ok(())
    }

    /// Owner only. Allowed while paused.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Principal,
    ) -> Result<(), RoyaltyError> {
        require_owner(self.ledger.global(), ctx.caller())?;
        self.ledger.set_owner(new_owner);
        tracing::info!(
            previous = %hex::encode(ctx.caller()),
            owner = %hex::encode(new_owner),
            "contract ownership transferred"
        );
        Ok(())
    }

    pub fn get_patent_shares(&self, patent_id: &PatentId) -> Option<&ShareSet> {
        self.ledger.get_patent_shares(patent_id)
    }

    pub fn get_distribution_history(&self, id: DistributionId) -> Option<&DistributionRecord> {
        self.ledger.get_distribution_history(id)
    }

    pub fn get_contributor_payouts(
        &self,
        patent_id: &PatentId,
        contributor: &Principal,
    ) -> Option<&ContributorPayout> {
        self.ledger.get_contributor_payouts(patent_id, contributor)
    }

    pub fn get_total_distributed(&self) -> Amount {
        self.ledger.get_total_distributed()
    }

    pub fn get_contract_owner(&self) -> Principal {
        self.ledger.get_contract_owner()
    }

    pub fn is_paused(&self) -> bool {
        self.ledger.is_paused()
    }

    pub fn get_distribution_counter(&self) -> DistributionId {
        self.ledger.get_distribution_counter()
    }
}
