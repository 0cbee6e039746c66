use ipr_shares::{PatentId, Principal};

use crate::types::DirectoryError;

/// Read-only view of patent ownership and contributor membership.
pub trait PatentDirectory {
    /// The identity that owns `patent_id`.
    fn get_owner(&self, patent_id: &PatentId) -> Result<Principal, DirectoryError>;

    /// Contributors registered against `patent_id`.
    fn get_contributors(&self, patent_id: &PatentId) -> Result<Vec<Principal>, DirectoryError>;

    fn is_registered(&self, patent_id: &PatentId) -> bool;
}
