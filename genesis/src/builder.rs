use chrono::{DateTime, Utc};
use ipr_shares::{Amount, PatentId, Principal, TokenId};

use crate::config::GenesisConfig;
use crate::types::*;

/// Builder for constructing a `GenesisConfig` step by step.
pub struct GenesisBuilder {
    chain_id: String,
    genesis_time: DateTime<Utc>,
    owner: Principal,
    params: ContractParams,
    accounts: Vec<GenesisAccount>,
    tokens: Vec<GenesisToken>,
    patents: Vec<GenesisPatent>,
}

impl GenesisBuilder {
    /// Start building a genesis config for a contract owned by `owner`.
    pub fn new(chain_id: impl Into<String>, owner: Principal) -> Self {
        Self {
            chain_id: chain_id.into(),
            genesis_time: Utc::now(),
            owner,
            params: ContractParams::default(),
            accounts: Vec::new(),
            tokens: Vec::new(),
            patents: Vec::new(),
        }
    }

    /// Set the genesis timestamp.
    pub fn with_genesis_time(mut self, time: DateTime<Utc>) -> Self {
        self.genesis_time = time;
        self
    }

    /// Set the contract parameters.
    pub fn with_params(mut self, params: ContractParams) -> Self {
        self.params = params;
        self
    }

    /// Set only the custody account, keeping the other parameters.
    pub fn with_custody(mut self, custody: Principal) -> Self {
        self.params.custody = custody;
        self
    }

    /// Add an account with an initial native balance.
    pub fn with_account(mut self, pubkey: Principal, balance: Amount) -> Self {
        self.accounts.push(GenesisAccount { pubkey, balance });
        self
    }

    /// Add a token ledger with its initial holders.
    pub fn with_token(
        mut self,
        token_id: TokenId,
        symbol: impl Into<String>,
        balances: &[(Principal, Amount)],
    ) -> Self {
        self.tokens.push(GenesisToken {
            token_id,
            symbol: symbol.into(),
            balances: balances
                .iter()
                .map(|&(pubkey, balance)| GenesisAccount { pubkey, balance })
                .collect(),
        });
        self
    }

    /// Register a patent with its owner and contributors.
    pub fn with_patent(
        mut self,
        patent_id: PatentId,
        owner: Principal,
        contributors: Vec<Principal>,
    ) -> Self {
        self.patents.push(GenesisPatent {
            patent_id,
            owner,
            contributors,
        });
        self
    }

    /// Build the final genesis configuration.
    /// Validates all invariants before returning.
    pub fn build(self) -> Result<GenesisConfig, GenesisError> {
        let mut config = GenesisConfig {
            chain_id: self.chain_id,
            genesis_time: self.genesis_time,
            owner: self.owner,
            genesis_hash: [0u8; 32],
            params: self.params,
            accounts: self.accounts,
            tokens: self.tokens,
            patents: self.patents,
        };

        config.validate()?;
        config.genesis_hash = config.compute_genesis_hash();
        Ok(config)
    }
}
