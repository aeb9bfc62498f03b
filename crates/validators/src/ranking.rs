use stakecache_types::{AccountId, ValidatorRecord};

/// Validators keeping more than this share of rewards are not recommended.
pub const MAX_COMMISSION_FRACTION: f64 = 0.20;

/// Whether a validator is a sound nomination target.
pub fn is_nominatable(record: &ValidatorRecord) -> bool {
    record.commission_fraction <= MAX_COMMISSION_FRACTION
        && !record.is_over_subscribed
        && !record.is_blocking_nominations
        && !record.is_slashed_this_period
        && record.has_verified_identity
}

/// Rank nominatable validators by total stake, highest first, keeping at
/// most `limit`. The sort is stable, so equal stakes keep their input order.
pub fn rank_top<'a, I>(candidates: I, limit: usize) -> Vec<AccountId>
where
    I: IntoIterator<Item = (&'a AccountId, &'a ValidatorRecord)>,
{
    let mut eligible: Vec<_> = candidates
        .into_iter()
        .filter(|(_, record)| is_nominatable(record))
        .collect();
    eligible.sort_by(|(_, a), (_, b)| b.total_stake_units.cmp(&a.total_stake_units));
    eligible
        .into_iter()
        .take(limit)
        .map(|(address, _)| address.clone())
        .collect()
}
