use ipr_shares::{PatentId, Principal};
use serde::{Deserialize, Serialize};

/// Directory entry for a registered patent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatentEntry {
    /// The patent's identifier.
    pub patent_id: PatentId,
    /// Identity allowed to configure the patent's shares.
    pub owner: Principal,
    /// Registered contributors, in registration order.
    pub contributors: Vec<Principal>,
    /// Block height at which the patent was registered.
    pub registered_at: u64,
}

/// Errors returned by a patent directory.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("patent not found: {}", hex::encode(.0))]
    NotFound(PatentId),

    #[error("patent already registered: {}", hex::encode(.0))]
    AlreadyRegistered(PatentId),

    #[error("contributor already registered for patent")]
    DuplicateContributor,
}
