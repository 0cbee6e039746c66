use crate::types::*;

/// Compute one payout leg: `floor(base * percentage / 100)`.
///
/// Multiplies before dividing so no fractional share is lost early. A product
/// that does not fit in [`Amount`] is reported as [`ShareError::Overflow`]
/// rather than wrapped or saturated.
pub fn calculate_payout(base: Amount, percentage: u32) -> Result<Amount, ShareError> {
    if percentage == 0 || percentage > PERCENT_DENOMINATOR {
        return Err(ShareError::PercentageOutOfRange(percentage));
    }

    let scaled = base
        .checked_mul(percentage as Amount)
        .ok_or(ShareError::Overflow)?;
    let payout = scaled / PERCENT_DENOMINATOR as Amount;

    debug_assert!(payout <= base);
    Ok(payout)
}

/// Fold `amount` over `shares` without moving any funds.
///
/// Every leg is priced against the deposited amount and taken out of the
/// running remainder, so the final `remaining` is exactly the floor-rounding
/// residue. Zero-valued legs are reported as-is; rejecting them is the
/// caller's policy.
pub fn preview_distribution(amount: Amount, shares: &[Share]) -> Result<PayoutPlan, ShareError> {
    let mut remaining = amount;
    let mut legs = Vec::with_capacity(shares.len());

    for share in shares {
        let payout = calculate_payout(amount, share.percentage)?;
        remaining = remaining
            .checked_sub(payout)
            .ok_or(ShareError::PayoutExceedsRemaining { payout, remaining })?;
        legs.push(PlannedPayout {
            contributor: share.contributor,
            percentage: share.percentage,
            payout,
        });
    }

    Ok(PayoutPlan {
        amount,
        legs,
        remaining,
    })
}
