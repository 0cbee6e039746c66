pub mod call;
pub mod engine;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod types;

pub use call::{CallContext, RoyaltyCall, SignedCall};
pub use engine::RoyaltyContract;
pub use host::{CallOutput, HostError, RoyaltyHost};
pub use ledger::RoyaltyLedger;
pub use types::*;
