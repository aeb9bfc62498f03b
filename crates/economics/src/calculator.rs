//! Network-wide staking economics.
//!
//! Per-era yields are decimal ratios of the raw planck amounts; only the
//! averaged yield is compounded in floating point.

use crate::errors::{EconomicsError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stakecache_chain::ChainApi;
use stakecache_types::{units_per_token, Balance, EconomicsSummary, EraIndex, ProtocolConstants};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Sessions per era on BABE-based relay chains.
const SESSIONS_PER_ERA: f64 = 6.0;
const DAYS_PER_YEAR: i32 = 365;

/// Largest mantissa a [`Decimal`] can carry (96 bits).
const MAX_DECIMAL_MANTISSA: u128 = (1 << 96) - 1;

#[derive(Debug, Clone, Copy)]
pub struct EconomicsCalculator {
    constants: ProtocolConstants,
}

impl EconomicsCalculator {
    pub fn new(constants: ProtocolConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &ProtocolConstants {
        &self.constants
    }

    /// Recompute the summary for `era`, or for the chain's active era when
    /// none is given.
    pub async fn compute<C: ChainApi + ?Sized>(
        &self,
        chain: &C,
        era: Option<EraIndex>,
    ) -> Result<EconomicsSummary> {
        let active_era = match era {
            Some(era) => era,
            None => chain.active_era().await?,
        };

        let totals: BTreeMap<EraIndex, Balance> =
            chain.eras_total_stake_entries().await?.into_iter().collect();
        let rewards = chain.eras_validator_reward_entries().await?;
        let decimals = chain.token_decimals().await?;
        let min_stake_units = chain.min_nominator_bond().await?;
        let max_nominators = chain.max_nominators_count().await?;
        let nominator_count = chain.counter_for_nominators().await?;

        let units_per_token =
            units_per_token(decimals).ok_or(EconomicsError::UnsupportedDecimals(decimals))?;

        let average = average_period_yield(&totals, &rewards)
            .ok_or(EconomicsError::NoKnownPeriods { era: active_era })?;
        let period_hours = period_duration_hours(&self.constants);
        let apy = compound_apy(average, period_hours)?;

        let summary = EconomicsSummary {
            active_era,
            min_stake_units,
            max_nominations: self.constants.max_nominations,
            max_rewarded_per_validator: self.constants.max_rewarded_per_validator,
            is_accepting_new_nominators: nominator_count >= max_nominators.unwrap_or(0),
            average_apy_percent: apy,
            decimal_places: decimals,
            units_per_token,
            period_duration_hours: period_hours,
            unbonding_period_days: period_hours * f64::from(self.constants.bonding_duration)
                / 24.0,
        };
        info!(
            era = active_era,
            apy = summary.average_apy_percent,
            "economics summary recomputed"
        );
        Ok(summary)
    }
}

/// Hours per era: block time (ms) times blocks per session times sessions.
pub fn period_duration_hours(constants: &ProtocolConstants) -> f64 {
    constants.expected_block_time as f64 * constants.period_duration as f64 * SESSIONS_PER_ERA
        / 1000.0
        / 3600.0
}

/// Mean reward/total ratio over every era that has both values. Eras that
/// cannot contribute are skipped; `None` when none can.
///
/// Both amounts share the token's decimals, so the ratio is taken on the raw
/// values directly.
pub fn average_period_yield(
    totals: &BTreeMap<EraIndex, Balance>,
    rewards: &[(EraIndex, Option<Balance>)],
) -> Option<Decimal> {
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;

    for (era, reward) in rewards {
        let Some(reward) = reward else {
            debug!(era, "era reward not paid yet, skipping");
            continue;
        };
        let Some(total) = totals.get(era) else {
            warn!(era, "no total stake recorded for rewarded era, skipping");
            continue;
        };

        match period_yield(*total, *reward).and_then(|y| sum.checked_add(y)) {
            Some(next) => {
                sum = next;
                count += 1;
            }
            None => warn!(era, total, reward, "era yield not representable, skipping"),
        }
    }

    if count == 0 {
        return None;
    }
    sum.checked_div(Decimal::from(count))
}

fn period_yield(mut total: Balance, mut reward: Balance) -> Option<Decimal> {
    if total == 0 {
        return None;
    }
    // Drop the same trailing digits from both until they fit a mantissa.
    while total.max(reward) > MAX_DECIMAL_MANTISSA {
        total /= 10;
        reward /= 10;
    }
    let total = Decimal::try_from_i128_with_scale(i128::try_from(total).ok()?, 0).ok()?;
    if total.is_zero() {
        return None;
    }
    let reward = Decimal::try_from_i128_with_scale(i128::try_from(reward).ok()?, 0).ok()?;
    reward.checked_div(total)
}

/// Compound the average per-era yield into an annual percentage, truncated
/// to two decimals.
pub fn compound_apy(average_period_yield: Decimal, period_hours: f64) -> Result<f64> {
    let average = average_period_yield
        .to_f64()
        .ok_or(EconomicsError::NonFiniteYield)?;
    let daily = average / period_hours * 24.0;
    let compounded = ((1.0 + daily).powi(DAYS_PER_YEAR) - 1.0) * 10_000.0;
    if !compounded.is_finite() {
        return Err(EconomicsError::NonFiniteYield);
    }
    Ok(compounded.floor() / 100.0)
}
