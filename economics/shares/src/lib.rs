pub mod payout;
pub mod types;
pub mod validation;

pub use payout::{calculate_payout, preview_distribution};
pub use types::*;
pub use validation::{total_percentage, validate_share_set, validate_shares};
