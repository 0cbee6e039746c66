use std::collections::BTreeMap;

use ipr_shares::{Amount, PatentId, Principal, ShareSet, TokenType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::*;

/// The royalty contract's persistent tables and global counters.
///
/// Readers are public; writers are crate-private so that every mutation goes
/// through the access-guarded contract operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoyaltyLedger {
    state: GlobalState,
    /// Active share set per patent. Latest write wins.
    shares: BTreeMap<PatentId, ShareSet>,
    /// Append-only distribution history.
    distributions: BTreeMap<DistributionId, DistributionRecord>,
    /// Cumulative receipts per (patent, contributor).
    payouts: BTreeMap<(PatentId, Principal), ContributorPayout>,
}

impl RoyaltyLedger {
    /// Create an empty, unpaused ledger owned by `owner`.
    pub fn new(owner: Principal) -> Self {
        Self {
            state: GlobalState {
                owner,
                paused: false,
                total_distributed: 0,
                distribution_counter: 0,
            },
            shares: BTreeMap::new(),
            distributions: BTreeMap::new(),
            payouts: BTreeMap::new(),
        }
    }

    pub fn global(&self) -> &GlobalState {
        &self.state
    }

    pub fn get_patent_shares(&self, patent_id: &PatentId) -> Option<&ShareSet> {
        self.shares.get(patent_id)
    }

    pub fn get_distribution_history(&self, id: DistributionId) -> Option<&DistributionRecord> {
        self.distributions.get(&id)
    }

    pub fn get_contributor_payouts(
        &self,
        patent_id: &PatentId,
        contributor: &Principal,
    ) -> Option<&ContributorPayout> {
        self.payouts.get(&(*patent_id, *contributor))
    }

    pub fn get_total_distributed(&self) -> Amount {
        self.state.total_distributed
    }

    pub fn get_contract_owner(&self) -> Principal {
        self.state.owner
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn get_distribution_counter(&self) -> DistributionId {
        self.state.distribution_counter
    }

    /// All distributions recorded against `patent_id`, oldest first.
    pub fn history_for_patent(&self, patent_id: &PatentId) -> Vec<&DistributionRecord> {
        self.distributions
            .values()
            .filter(|r| &r.patent_id == patent_id)
            .collect()
    }

    /// Every contributor payout recorded for `patent_id`.
    pub fn payouts_for_patent(&self, patent_id: &PatentId) -> Vec<&ContributorPayout> {
        self.payouts
            .range((*patent_id, [0u8; 32])..=(*patent_id, [0xffu8; 32]))
            .map(|(_, p)| p)
            .collect()
    }

    pub(crate) fn put_shares(&mut self, patent_id: PatentId, shares: ShareSet) {
        self.shares.insert(patent_id, shares);
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    pub(crate) fn set_owner(&mut self, owner: Principal) {
        self.state.owner = owner;
    }

    /// Allocate the next distribution id and append its record.
    pub(crate) fn open_distribution(
        &mut self,
        patent_id: PatentId,
        amount: Amount,
        token_type: TokenType,
        caller: Principal,
        height: u64,
    ) -> Result<DistributionId, RoyaltyError> {
        let id = self
            .state
            .distribution_counter
            .checked_add(1)
            .ok_or(RoyaltyError::ArithmeticOverflow)?;
        let total = self
            .state
            .total_distributed
            .checked_add(amount)
            .ok_or(RoyaltyError::ArithmeticOverflow)?;

        self.state.distribution_counter = id;
        self.distributions.insert(
            id,
            DistributionRecord {
                id,
                patent_id,
                amount,
                token_type,
                height,
                caller,
            },
        );
        self.state.total_distributed = total;
        Ok(id)
    }

    /// Add `payout` to a contributor's cumulative receipts, creating the entry
    /// on first payout. Returns the new total.
    pub(crate) fn credit_contributor(
        &mut self,
        patent_id: PatentId,
        contributor: Principal,
        payout: Amount,
    ) -> Result<Amount, RoyaltyError> {
        let entry = self
            .payouts
            .entry((patent_id, contributor))
            .or_insert(ContributorPayout {
                patent_id,
                contributor,
                total_received: 0,
            });
        entry.total_received = entry
            .total_received
            .checked_add(payout)
            .ok_or(RoyaltyError::ArithmeticOverflow)?;
        Ok(entry.total_received)
    }

    /// SHA-256 commitment over the whole ledger. Tables are walked in key
    /// order, so equal ledgers always produce equal roots.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        hasher.update(self.state.owner);
        hasher.update([self.state.paused as u8]);
        hasher.update(self.state.total_distributed.to_le_bytes());
        hasher.update(self.state.distribution_counter.to_le_bytes());

        for (patent_id, shares) in &self.shares {
            hasher.update(patent_id);
            hasher.update((shares.len() as u64).to_le_bytes());
            for share in shares {
                hasher.update(share.contributor);
                hasher.update(share.percentage.to_le_bytes());
            }
        }

        for record in self.distributions.values() {
            hasher.update(record.id.to_le_bytes());
            hasher.update(record.patent_id);
            hasher.update(record.amount.to_le_bytes());
            match record.token_type {
                TokenType::Native => hasher.update([0u8]),
                TokenType::Token(id) => {
                    hasher.update([1u8]);
                    hasher.update(id);
                }
            }
            hasher.update(record.height.to_le_bytes());
            hasher.update(record.caller);
        }

        for payout in self.payouts.values() {
            hasher.update(payout.patent_id);
            hasher.update(payout.contributor);
            hasher.update(payout.total_received.to_le_bytes());
        }

        let digest = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&digest);
        root
    }
}
