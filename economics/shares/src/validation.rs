use crate::types::*;

/// Sum of all percentages in a share list, widened so it cannot overflow.
pub fn total_percentage(shares: &[Share]) -> u64 {
    shares.iter().map(|s| s.percentage as u64).sum()
}

/// Validate a share set against the default contributor limit.
pub fn validate_shares(shares: ShareSet) -> Result<ShareSet, ShareError> {
    validate_share_set(shares, MAX_CONTRIBUTORS)
}

/// Validate a share set and hand it back unchanged.
///
/// - between 1 and `max_contributors` entries (never more than
///   [`MAX_CONTRIBUTORS`], whatever the caller asks for)
/// - every percentage in 1..=100
/// - percentages sum to exactly 100
///
/// Contributors are not deduplicated and the order is preserved.
pub fn validate_share_set(shares: ShareSet, max_contributors: usize) -> Result<ShareSet, ShareError> {
    let max = max_contributors.min(MAX_CONTRIBUTORS);

    if shares.is_empty() {
        return Err(ShareError::Empty);
    }
    if shares.len() > max {
        return Err(ShareError::TooManyContributors {
            count: shares.len(),
            max,
        });
    }

    for (index, share) in shares.iter().enumerate() {
        if share.percentage == 0 || share.percentage > PERCENT_DENOMINATOR {
            return Err(ShareError::InvalidPercentage {
                index,
                percentage: share.percentage,
            });
        }
    }

    let total = total_percentage(&shares);
    if total != PERCENT_DENOMINATOR as u64 {
        return Err(ShareError::InvalidTotal(total));
    }

    Ok(shares)
}
