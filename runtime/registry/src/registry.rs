use std::collections::HashMap;

use ipr_shares::{PatentId, Principal};

use crate::directory::PatentDirectory;
use crate::types::*;

/// In-memory patent directory: who owns each patent and who contributed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct PatentRegistry {
    patents: HashMap<PatentId, PatentEntry>,
}

impl PatentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patent with its owner.
    pub fn register_patent(
        &mut self,
        patent_id: PatentId,
        owner: Principal,
        height: u64,
    ) -> Result<(), DirectoryError> {
        if self.patents.contains_key(&patent_id) {
            return Err(DirectoryError::AlreadyRegistered(patent_id));
        }

        self.patents.insert(
            patent_id,
            PatentEntry {
                patent_id,
                owner,
                contributors: Vec::new(),
                registered_at: height,
            },
        );

        tracing::info!(
            patent = %hex::encode(patent_id),
            owner = %hex::encode(owner),
            height,
            "patent registered"
        );
        Ok(())
    }

    /// Add a contributor to a registered patent.
    pub fn add_contributor(
        &mut self,
        patent_id: &PatentId,
        contributor: Principal,
    ) -> Result<(), DirectoryError> {
        let entry = self
            .patents
            .get_mut(patent_id)
            .ok_or(DirectoryError::NotFound(*patent_id))?;

        if entry.contributors.contains(&contributor) {
            return Err(DirectoryError::DuplicateContributor);
        }
        entry.contributors.push(contributor);
        Ok(())
    }

    /// Get the directory entry for a patent.
    pub fn get_patent(&self, patent_id: &PatentId) -> Option<&PatentEntry> {
        self.patents.get(patent_id)
    }

    /// Number of registered patents.
    pub fn patent_count(&self) -> usize {
        self.patents.len()
    }
}

impl PatentDirectory for PatentRegistry {
    fn get_owner(&self, patent_id: &PatentId) -> Result<Principal, DirectoryError> {
        self.patents
            .get(patent_id)
            .map(|e| e.owner)
            .ok_or(DirectoryError::NotFound(*patent_id))
    }

    fn get_contributors(&self, patent_id: &PatentId) -> Result<Vec<Principal>, DirectoryError> {
        self.patents
            .get(patent_id)
            .map(|e| e.contributors.clone())
            .ok_or(DirectoryError::NotFound(*patent_id))
    }

    fn is_registered(&self, patent_id: &PatentId) -> bool {
        self.patents.contains_key(patent_id)
    }
}
