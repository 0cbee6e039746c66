use std::fmt;

use ipr_shares::{Amount, PatentId, Principal, ShareError, TokenType, MAX_CONTRIBUTORS, MIN_DEPOSIT_AMOUNT};
use ipr_state::TransferError;
use serde::{Deserialize, Serialize};

/// Sequence number of a distribution. The first distribution is 1.
pub type DistributionId = u64;

/// Deployment parameters of a royalty contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoyaltyParams {
    /// Account that holds deposited funds and pays out every leg.
    pub custody: Principal,
    /// Upper bound on share-set length, capped at [`MAX_CONTRIBUTORS`].
    pub max_contributors: usize,
    /// Smallest amount accepted by `distribute_royalties`.
    pub min_deposit_amount: Amount,
}

impl RoyaltyParams {
    /// Default limits with the given custody account.
    pub fn with_custody(custody: Principal) -> Self {
        Self {
            custody,
            max_contributors: MAX_CONTRIBUTORS,
            min_deposit_amount: MIN_DEPOSIT_AMOUNT,
        }
    }
}

/// Contract-wide counters and flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalState {
    pub owner: Principal,
    pub paused: bool,
    /// Sum of every distributed amount. Only ever increases.
    pub total_distributed: Amount,
    /// Id of the most recent distribution, 0 before the first one.
    pub distribution_counter: DistributionId,
}

/// Immutable record of one distribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionRecord {
    pub id: DistributionId,
    pub patent_id: PatentId,
    /// Total amount deposited for this distribution.
    pub amount: Amount,
    pub token_type: TokenType,
    /// Block height at which the distribution ran.
    pub height: u64,
    /// Identity that triggered the distribution.
    pub caller: Principal,
}

/// Cumulative amount a contributor has received from one patent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributorPayout {
    pub patent_id: PatentId,
    pub contributor: Principal,
    pub total_received: Amount,
}

/// One delivered payout within a distribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayoutLeg {
    pub contributor: Principal,
    pub percentage: u32,
    pub payout: Amount,
}

/// Final accumulator of a distribution, plus the legs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionOutcome {
    pub distribution_id: DistributionId,
    pub patent_id: PatentId,
    pub token_type: TokenType,
    /// Floor-rounding residue left in custody.
    pub remaining: Amount,
    pub legs: Vec<PayoutLeg>,
}

impl DistributionOutcome {
    /// Sum of all delivered legs.
    pub fn total_paid(&self) -> Amount {
        self.legs.iter().map(|leg| leg.payout).sum()
    }
}

/// Why a distribution aborted after its preconditions passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionFailure {
    /// The caller's deposit could not be moved into custody.
    Deposit { error: TransferError },
    /// The share at `index` rounds down to nothing.
    ZeroPayout { index: usize, contributor: Principal },
    /// The value transfer for the share at `index` was refused.
    Transfer { index: usize, error: TransferError },
}

impl fmt::Display for DistributionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionFailure::Deposit { error } => write!(f, "deposit failed: {error}"),
            DistributionFailure::ZeroPayout { index, contributor } => write!(
                f,
                "share {index} pays zero to {}",
                hex::encode(contributor)
            ),
            DistributionFailure::Transfer { index, error } => {
                write!(f, "transfer for share {index} failed: {error}")
            }
        }
    }
}

/// Errors returned by royalty contract operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RoyaltyError {
    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("patent is not registered")]
    InvalidPatent,

    #[error("invalid share set: {0}")]
    InvalidShare(ShareError),

    #[error("patent has no contributors")]
    NoContributors,

    #[error("distribution failed: {0}")]
    DistributionFailed(DistributionFailure),

    #[error("amount is below the minimum deposit")]
    InvalidAmount,

    #[error("contract already initialized")]
    AlreadyInitialized,

    #[error("contract is paused")]
    Paused,

    #[error("unknown token")]
    InvalidToken,

    #[error("shares have not been set for this patent")]
    SharesNotSet,

    #[error("recipient is the contract custody account")]
    InvalidRecipient,

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("too many contributors")]
    MaxContributorsExceeded,
}

impl RoyaltyError {
    /// Stable numeric code for callers that only see an error number.
    pub fn code(&self) -> u32 {
        match self {
            RoyaltyError::NotAuthorized => 100,
            RoyaltyError::InvalidPatent => 101,
            RoyaltyError::InvalidShare(_) => 102,
            RoyaltyError::NoContributors => 103,
            RoyaltyError::DistributionFailed(_) => 104,
            RoyaltyError::InvalidAmount => 105,
            RoyaltyError::AlreadyInitialized => 106,
            RoyaltyError::Paused => 107,
            RoyaltyError::InvalidToken => 108,
            RoyaltyError::SharesNotSet => 109,
            RoyaltyError::InvalidRecipient => 110,
            RoyaltyError::ArithmeticOverflow => 111,
            RoyaltyError::MaxContributorsExceeded => 112,
        }
    }
}

impl From<ShareError> for RoyaltyError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::Overflow | ShareError::PayoutExceedsRemaining { .. } => {
                RoyaltyError::ArithmeticOverflow
            }
            other => RoyaltyError::InvalidShare(other),
        }
    }
}
