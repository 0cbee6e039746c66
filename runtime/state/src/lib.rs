pub mod accounts;
pub mod state_db;
pub mod token;
pub mod transfer;
pub mod types;

pub use accounts::AccountState;
pub use state_db::StateDB;
pub use token::TokenLedger;
pub use transfer::{FungibleToken, ValueTransfer};
pub use types::*;
