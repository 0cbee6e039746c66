use serde::{Deserialize, Serialize};

/// An identity as a 32-byte Ed25519 public key.
pub type Principal = [u8; 32];

/// Opaque patent identifier, assigned by the patent directory.
pub type PatentId = [u8; 32];

/// Address of a fungible token ledger.
pub type TokenId = [u8; 32];

/// Monetary amounts in the smallest unit of the asset.
pub type Amount = u128;

/// Maximum number of entries in a single share set.
pub const MAX_CONTRIBUTORS: usize = 50;

/// Smallest amount accepted for a distribution.
pub const MIN_DEPOSIT_AMOUNT: Amount = 1;

/// Percentages are whole numbers out of this denominator.
pub const PERCENT_DENOMINATOR: u32 = 100;

/// A contributor's entitlement to a fixed percentage of royalty proceeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Share {
    /// The identity that receives the payout.
    pub contributor: Principal,
    /// Whole percentage in (0, 100].
    pub percentage: u32,
}

impl Share {
    pub fn new(contributor: Principal, percentage: u32) -> Self {
        Self {
            contributor,
            percentage,
        }
    }
}

/// An ordered share list. Order fixes payout iteration order.
pub type ShareSet = Vec<Share>;

/// Which asset a distribution is paid in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenType {
    /// The chain's native currency.
    Native,
    /// A fungible token identified by its ledger address.
    Token(TokenId),
}

impl TokenType {
    /// The token id, or `None` for the native currency.
    pub fn token_id(&self) -> Option<&TokenId> {
        match self {
            TokenType::Native => None,
            TokenType::Token(id) => Some(id),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, TokenType::Native)
    }
}

impl From<Option<TokenId>> for TokenType {
    fn from(token: Option<TokenId>) -> Self {
        token.map_or(TokenType::Native, TokenType::Token)
    }
}

/// One computed payout leg of a dry-run distribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedPayout {
    pub contributor: Principal,
    pub percentage: u32,
    pub payout: Amount,
}

/// Result of folding an amount over a share set without moving funds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayoutPlan {
    /// Amount that was split.
    pub amount: Amount,
    /// One leg per share, in share-set order.
    pub legs: Vec<PlannedPayout>,
    /// Floor-rounding residue left after the last leg.
    pub remaining: Amount,
}

impl PayoutPlan {
    /// Sum of all payout legs.
    pub fn total_paid(&self) -> Amount {
        self.legs.iter().map(|leg| leg.payout).sum()
    }
}

/// Errors raised while validating share sets or computing payouts.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("share set is empty")]
    Empty,

    #[error("share set has {count} entries, maximum is {max}")]
    TooManyContributors { count: usize, max: usize },

    #[error("share at index {index} has percentage {percentage}, expected 1..=100")]
    InvalidPercentage { index: usize, percentage: u32 },

    #[error("percentages must sum to 100, got {0}")]
    InvalidTotal(u64),

    #[error("percentage {0} outside 1..=100")]
    PercentageOutOfRange(u32),

    #[error("payout {payout} exceeds remaining {remaining}")]
    PayoutExceedsRemaining { payout: Amount, remaining: Amount },

    #[error("arithmetic overflow")]
    Overflow,
}
