use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use ipr_registry::PatentRegistry;
use ipr_royalties::{RoyaltyContract, RoyaltyHost, RoyaltyParams};
use ipr_shares::{Principal, MAX_CONTRIBUTORS};
use ipr_state::{StateDB, TokenLedger};
use sha2::{Digest, Sha256};

use crate::types::*;

/// Host type produced by [`GenesisConfig::into_host`].
pub type GenesisHost = RoyaltyHost<PatentRegistry, StateDB>;

/// The full genesis configuration for a royalty deployment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GenesisConfig {
    /// Human-readable chain identifier.
    pub chain_id: String,
    /// Timestamp when the chain starts.
    pub genesis_time: DateTime<Utc>,
    /// Initial contract owner.
    #[serde(with = "hex_serde")]
    pub owner: Principal,
    /// Hash of the canonical genesis (computed, not stored from file).
    #[serde(with = "hex_serde")]
    pub genesis_hash: [u8; 32],
    /// Contract deployment parameters.
    pub params: ContractParams,
    /// Initial native balances.
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    /// Token ledgers the contract may pay in.
    #[serde(default)]
    pub tokens: Vec<GenesisToken>,
    /// Patents known to the directory.
    #[serde(default)]
    pub patents: Vec<GenesisPatent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Result<Self, GenesisError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(GenesisError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl GenesisConfig {
    /// Load a genesis config from a `.json` or `.toml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GenesisError> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        let mut config: GenesisConfig = match format {
            FileFormat::Json => serde_json::from_str(&contents)?,
            FileFormat::Toml => toml::from_str(&contents)?,
        };
        config.genesis_hash = config.compute_genesis_hash();
        Ok(config)
    }

    /// Save the genesis config; the format follows the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GenesisError> {
        let path = path.as_ref();
        let contents = match FileFormat::from_path(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate all invariants of the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.chain_id.trim().is_empty() {
            return Err(GenesisError::EmptyChainId);
        }

        let max = self.params.max_contributors;
        if max == 0 || max > MAX_CONTRIBUTORS {
            return Err(GenesisError::InvalidMaxContributors(max));
        }
        if self.params.min_deposit_amount == 0 {
            return Err(GenesisError::ZeroMinDeposit);
        }
        if self.params.custody == self.owner {
            return Err(GenesisError::CustodyIsOwner);
        }

        let mut seen = HashSet::new();
        for (i, acct) in self.accounts.iter().enumerate() {
            if !seen.insert(acct.pubkey) {
                return Err(GenesisError::DuplicateAccount(i));
            }
        }

        let mut seen_tokens = HashSet::new();
        for (t, token) in self.tokens.iter().enumerate() {
            if !seen_tokens.insert(token.token_id) {
                return Err(GenesisError::DuplicateToken(t));
            }
            let mut holders = HashSet::new();
            for (i, holder) in token.balances.iter().enumerate() {
                if !holders.insert(holder.pubkey) {
                    return Err(GenesisError::DuplicateTokenHolder { token: t, index: i });
                }
                if holder.balance == 0 {
                    return Err(GenesisError::ZeroTokenBalance { token: t, index: i });
                }
            }
        }

        let mut seen_patents = HashSet::new();
        for (i, patent) in self.patents.iter().enumerate() {
            if !seen_patents.insert(patent.patent_id) {
                return Err(GenesisError::DuplicatePatent(i));
            }
            if patent.contributors.is_empty() {
                return Err(GenesisError::NoContributors { index: i });
            }
            let mut contributors = HashSet::new();
            for (c, contributor) in patent.contributors.iter().enumerate() {
                if !contributors.insert(*contributor) {
                    return Err(GenesisError::DuplicateContributor {
                        index: i,
                        contributor: c,
                    });
                }
            }
        }

        Ok(())
    }

    /// Compute a SHA-256 hash of the canonical JSON representation.
    pub fn compute_genesis_hash(&self) -> [u8; 32] {
        let canonical = CanonicalGenesis {
            chain_id: &self.chain_id,
            genesis_time: &self.genesis_time,
            owner: hex::encode(self.owner),
            params: &self.params,
            accounts: &self.accounts,
            tokens: &self.tokens,
            patents: &self.patents,
        };
        let json = serde_json::to_string(&canonical).expect("genesis serialization should not fail");
        let digest = Sha256::digest(json.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }

    /// Validate the config and deploy it: directory, native balances,
    /// token ledgers and the contract, wrapped in a host at height 0.
    pub fn into_host(self) -> Result<GenesisHost, GenesisError> {
        self.validate()?;

        let mut registry = PatentRegistry::new();
        for patent in &self.patents {
            registry.register_patent(patent.patent_id, patent.owner, 0)?;
            for contributor in &patent.contributors {
                registry.add_contributor(&patent.patent_id, *contributor)?;
            }
        }

        let mut native = StateDB::new();
        for acct in &self.accounts {
            native.get_or_create_account(&acct.pubkey).credit(acct.balance)?;
        }

        let mut tokens = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let mut ledger = TokenLedger::new(token.token_id, token.symbol.clone());
            for holder in &token.balances {
                ledger.mint(&holder.pubkey, holder.balance)?;
            }
            tokens.push(ledger);
        }

        let params = RoyaltyParams {
            custody: self.params.custody,
            max_contributors: self.params.max_contributors,
            min_deposit_amount: self.params.min_deposit_amount,
        };

        tracing::info!(
            chain_id = %self.chain_id,
            genesis_hash = %hex::encode(self.genesis_hash),
            owner = %hex::encode(self.owner),
            patents = self.patents.len(),
            accounts = self.accounts.len(),
            tokens = tokens.len(),
            "bootstrapping royalty host from genesis"
        );

        let contract = RoyaltyContract::new(self.owner, params, registry, native);
        Ok(RoyaltyHost::new(contract, tokens, 0))
    }

    /// Create a default single-patent devnet configuration.
    ///
    /// Key `[1, 0, ..]` owns the contract, `[2, 0, ..]` owns the patent and
    /// `[3, 0, ..]`/`[4, 0, ..]` are its contributors. Every key holds native
    /// currency, the owner also holds the one token, and custody starts with
    /// a native float.
    pub fn default_devnet() -> Self {
        let key = |n: u8| {
            let mut k = [0u8; 32];
            k[0] = n;
            k
        };
        let params = ContractParams::default();
        let custody = params.custody;

        let mut accounts: Vec<GenesisAccount> = (1..=4)
            .map(|i| GenesisAccount {
                pubkey: key(i),
                balance: 1_000_000,
            })
            .collect();
        accounts.push(GenesisAccount {
            pubkey: custody,
            balance: 100_000_000,
        });

        let mut config = GenesisConfig {
            chain_id: "ipr-devnet-1".to_string(),
            genesis_time: Utc::now(),
            owner: key(1),
            genesis_hash: [0u8; 32],
            params,
            accounts,
            tokens: vec![GenesisToken {
                token_id: [0x70; 32],
                symbol: "USDX".to_string(),
                balances: vec![GenesisAccount {
                    pubkey: key(1),
                    balance: 50_000_000,
                }],
            }],
            patents: vec![GenesisPatent {
                patent_id: [0xa1; 32],
                owner: key(2),
                contributors: vec![key(3), key(4)],
            }],
        };
        config.genesis_hash = config.compute_genesis_hash();
        config
    }
}

/// Internal type for canonical hashing (excludes genesis_hash field).
#[derive(serde::Serialize)]
struct CanonicalGenesis<'a> {
    chain_id: &'a str,
    genesis_time: &'a DateTime<Utc>,
    owner: String,
    params: &'a ContractParams,
    accounts: &'a [GenesisAccount],
    tokens: &'a [GenesisToken],
    patents: &'a [GenesisPatent],
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipr_registry::PatentDirectory;
    use ipr_state::ValueTransfer;
    use std::env;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("ipr_genesis_{tag}_{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn default_devnet_is_valid() {
        let config = GenesisConfig::default_devnet();
        config.validate().unwrap();
        assert_eq!(config.accounts.len(), 5);
        assert_eq!(config.tokens.len(), 1);
        assert_eq!(config.patents.len(), 1);
        assert_eq!(config.chain_id, "ipr-devnet-1");
    }

    #[test]
    fn genesis_hash_is_deterministic() {
        let mut c1 = GenesisConfig::default_devnet();
        let mut c2 = c1.clone();
        c1.genesis_time = fixed_time();
        c2.genesis_time = fixed_time();

        let h1 = c1.compute_genesis_hash();
        let h2 = c2.compute_genesis_hash();
        assert_eq!(h1, h2);
        assert_ne!(h1, [0u8; 32]);
    }

    #[test]
    fn genesis_hash_changes_with_data() {
        let mut c1 = GenesisConfig::default_devnet();
        c1.genesis_time = fixed_time();
        let h1 = c1.compute_genesis_hash();

        let mut c2 = c1.clone();
        c2.patents[0].contributors.pop();
        assert_ne!(h1, c2.compute_genesis_hash());

        let mut c3 = c1.clone();
        c3.params.min_deposit_amount = 10;
        assert_ne!(h1, c3.compute_genesis_hash());
    }

    #[test]
    fn validate_empty_chain_id_fails() {
        let mut config = GenesisConfig::default_devnet();
        config.chain_id = "  ".to_string();
        assert!(matches!(config.validate(), Err(GenesisError::EmptyChainId)));
    }

    #[test]
    fn validate_max_contributors_range() {
        let mut config = GenesisConfig::default_devnet();
        config.params.max_contributors = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisError::InvalidMaxContributors(0))
        ));
        config.params.max_contributors = 51;
        assert!(matches!(
            config.validate(),
            Err(GenesisError::InvalidMaxContributors(51))
        ));
        config.params.max_contributors = 10;
        config.validate().unwrap();
    }

    #[test]
    fn validate_zero_min_deposit_fails() {
        let mut config = GenesisConfig::default_devnet();
        config.params.min_deposit_amount = 0;
        assert!(matches!(config.validate(), Err(GenesisError::ZeroMinDeposit)));
    }

    #[test]
    fn validate_custody_is_owner_fails() {
        let mut config = GenesisConfig::default_devnet();
        config.params.custody = config.owner;
        assert!(matches!(config.validate(), Err(GenesisError::CustodyIsOwner)));
    }

    #[test]
    fn validate_duplicate_account_fails() {
        let mut config = GenesisConfig::default_devnet();
        config.accounts[2].pubkey = config.accounts[0].pubkey;
        assert!(matches!(
            config.validate(),
            Err(GenesisError::DuplicateAccount(2))
        ));
    }

    #[test]
    fn validate_token_rules() {
        let mut config = GenesisConfig::default_devnet();
        config.tokens.push(config.tokens[0].clone());
        assert!(matches!(config.validate(), Err(GenesisError::DuplicateToken(1))));

        let mut config = GenesisConfig::default_devnet();
        let holder = config.tokens[0].balances[0].clone();
        config.tokens[0].balances.push(holder);
        assert!(matches!(
            config.validate(),
            Err(GenesisError::DuplicateTokenHolder { token: 0, index: 1 })
        ));

        let mut config = GenesisConfig::default_devnet();
        config.tokens[0].balances[0].balance = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisError::ZeroTokenBalance { token: 0, index: 0 })
        ));
    }

    #[test]
    fn validate_patent_rules() {
        let mut config = GenesisConfig::default_devnet();
        config.patents.push(config.patents[0].clone());
        assert!(matches!(config.validate(), Err(GenesisError::DuplicatePatent(1))));

        let mut config = GenesisConfig::default_devnet();
        config.patents[0].contributors.clear();
        assert!(matches!(
            config.validate(),
            Err(GenesisError::NoContributors { index: 0 })
        ));

        let mut config = GenesisConfig::default_devnet();
        let first = config.patents[0].contributors[0];
        config.patents[0].contributors.push(first);
        assert!(matches!(
            config.validate(),
            Err(GenesisError::DuplicateContributor {
                index: 0,
                contributor: 2
            })
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let config = GenesisConfig::default_devnet();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let config2: GenesisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.chain_id, config2.chain_id);
        assert_eq!(config.patents, config2.patents);
        assert_eq!(config.genesis_hash, config2.genesis_hash);
    }

    #[test]
    fn json_file_roundtrip() {
        let config = GenesisConfig::default_devnet();
        let dir = temp_dir("json");
        let path = dir.join("genesis.json");

        config.to_file(&path).unwrap();
        let loaded = GenesisConfig::from_file(&path).unwrap();

        assert_eq!(config.chain_id, loaded.chain_id);
        assert_eq!(config.accounts, loaded.accounts);
        assert_eq!(config.compute_genesis_hash(), loaded.genesis_hash);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn toml_file_roundtrip() {
        let mut config = GenesisConfig::default_devnet();
        // TOML has no native u128; amounts travel as strings.
        config.accounts[0].balance = u64::MAX as u128 + 1;
        config.genesis_hash = config.compute_genesis_hash();
        let dir = temp_dir("toml");
        let path = dir.join("genesis.toml");

        config.to_file(&path).unwrap();
        let loaded = GenesisConfig::from_file(&path).unwrap();

        assert_eq!(loaded.accounts[0].balance, u64::MAX as u128 + 1);
        assert_eq!(config.tokens, loaded.tokens);
        assert_eq!(config.params, loaded.params);
        assert_eq!(config.compute_genesis_hash(), loaded.genesis_hash);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_extension_rejected() {
        let config = GenesisConfig::default_devnet();
        let dir = temp_dir("ext");
        let path = dir.join("genesis.yaml");
        assert!(matches!(
            config.to_file(&path),
            Err(GenesisError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            GenesisConfig::from_file(&path),
            Err(GenesisError::UnsupportedFormat(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn into_host_seeds_state() {
        let config = GenesisConfig::default_devnet();
        let owner = config.owner;
        let custody = config.params.custody;
        let patent = config.patents[0].clone();
        let token_id = config.tokens[0].token_id;

        let host = config.into_host().unwrap();
        assert_eq!(host.height(), 0);

        host.view(|contract| {
            assert_eq!(contract.get_contract_owner(), owner);
            assert!(!contract.is_paused());
            assert_eq!(contract.params().custody, custody);
            assert_eq!(contract.native().balance_of(&custody), 100_000_000);
            assert!(contract.directory().is_registered(&patent.patent_id));
            assert_eq!(
                contract.directory().get_owner(&patent.patent_id).unwrap(),
                patent.owner
            );
            assert_eq!(
                contract
                    .directory()
                    .get_contributors(&patent.patent_id)
                    .unwrap(),
                patent.contributors
            );
        });

        let supply = host.view_token(&token_id, |t| (t.total_supply(), t.balance_of(&owner)));
        assert_eq!(supply, Some((50_000_000, 50_000_000)));
    }

    #[test]
    fn into_host_rejects_invalid_config() {
        let mut config = GenesisConfig::default_devnet();
        config.params.min_deposit_amount = 0;
        assert!(matches!(
            config.into_host(),
            Err(GenesisError::ZeroMinDeposit)
        ));
    }
}
