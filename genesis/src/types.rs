use ipr_registry::DirectoryError;
use ipr_shares::{Amount, PatentId, Principal, TokenId, MAX_CONTRIBUTORS, MIN_DEPOSIT_AMOUNT};
use ipr_state::TransferError;
use serde::{Deserialize, Serialize};

/// A native-currency account funded at genesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisAccount {
    /// The account's Ed25519 public key (hex in config files).
    #[serde(with = "hex_serde")]
    pub pubkey: Principal,
    /// Initial balance in the smallest unit.
    #[serde(with = "amount_serde")]
    pub balance: Amount,
}

/// A fungible token ledger created at genesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisToken {
    #[serde(with = "hex_serde")]
    pub token_id: TokenId,
    pub symbol: String,
    /// Initial holders; each balance is minted.
    #[serde(default)]
    pub balances: Vec<GenesisAccount>,
}

/// A patent seeded into the directory at genesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisPatent {
    #[serde(with = "hex_serde")]
    pub patent_id: PatentId,
    /// Identity allowed to set the patent's shares.
    #[serde(with = "hex_serde")]
    pub owner: Principal,
    #[serde(with = "hex_list")]
    pub contributors: Vec<Principal>,
}

/// Royalty contract parameters fixed at deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractParams {
    /// Account that holds deposits and pays every payout leg.
    #[serde(with = "hex_serde")]
    pub custody: Principal,
    /// Maximum share-set length (1..=50).
    pub max_contributors: usize,
    /// Smallest accepted distribution amount.
    #[serde(with = "amount_serde")]
    pub min_deposit_amount: Amount,
}

impl Default for ContractParams {
    fn default() -> Self {
        Self {
            custody: [0xcc; 32],
            max_contributors: MAX_CONTRIBUTORS,
            min_deposit_amount: MIN_DEPOSIT_AMOUNT,
        }
    }
}

/// Genesis configuration error.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("chain id must not be empty")]
    EmptyChainId,

    #[error("max contributors must be between 1 and {MAX_CONTRIBUTORS}, got {0}")]
    InvalidMaxContributors(usize),

    #[error("minimum deposit amount must be > 0")]
    ZeroMinDeposit,

    #[error("custody account must differ from the contract owner")]
    CustodyIsOwner,

    #[error("duplicate account at index {0}")]
    DuplicateAccount(usize),

    #[error("duplicate token at index {0}")]
    DuplicateToken(usize),

    #[error("token at index {token} lists holder {index} twice")]
    DuplicateTokenHolder { token: usize, index: usize },

    #[error("token at index {token} mints zero to holder {index}")]
    ZeroTokenBalance { token: usize, index: usize },

    #[error("duplicate patent at index {0}")]
    DuplicatePatent(usize),

    #[error("patent at index {index} has no contributors")]
    NoContributors { index: usize },

    #[error("patent at index {index} lists contributor {contributor} twice")]
    DuplicateContributor { index: usize, contributor: usize },

    #[error("unsupported genesis file format: {0}")]
    UnsupportedFormat(String),

    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("balance error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Serialize [u8; 32] as a hex string.
pub mod hex_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_key(&s).map_err(serde::de::Error::custom)
    }
}

/// Serialize a list of [u8; 32] as hex strings.
pub mod hex_list {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(keys: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(keys.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<String>::deserialize(deserializer)?;
        items
            .iter()
            .map(|s| super::decode_key(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Amounts are written as decimal strings; TOML integers stop at i64.
/// Plain integers are accepted on input.
pub mod amount_serde {
    use ipr_shares::Amount;
    use serde::{self, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse::<Amount>().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(n as Amount),
        }
    }
}

/// Decode a 64-character hex string into a 32-byte key.
pub fn decode_key(s: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
