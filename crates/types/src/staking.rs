//! Derived staking datasets held by the cache.

use crate::wire::{decimal_string, n_suffixed};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Era (staking period) index.
pub type EraIndex = u32;

/// SS58 account or validator identifier as reported by the chain.
pub type AccountId = String;

/// Amount in base units (planck).
pub type Balance = u128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakingTypeError {
    #[error("ledger for {address} has active {active} above total {total}")]
    ActiveExceedsTotal {
        address: AccountId,
        total: Balance,
        active: Balance,
    },
}

/// Immutable protocol parameters, loaded once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConstants {
    pub max_nominations: u32,
    pub max_rewarded_per_validator: u32,
    /// Milliseconds per block.
    pub expected_block_time: u64,
    /// Blocks per session (epoch); an era spans six sessions.
    pub period_duration: u64,
    /// Eras an unbonding entry stays locked.
    pub bonding_duration: u32,
}

/// Network-wide staking economics, replaced wholesale on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicsSummary {
    pub active_era: EraIndex,
    #[serde(with = "n_suffixed")]
    pub min_stake_units: Balance,
    pub max_nominations: u32,
    pub max_rewarded_per_validator: u32,
    pub is_accepting_new_nominators: bool,
    /// Compound annual yield in percent, truncated to two decimals.
    pub average_apy_percent: f64,
    pub decimal_places: u32,
    #[serde(with = "n_suffixed")]
    pub units_per_token: Balance,
    pub period_duration_hours: f64,
    pub unbonding_period_days: f64,
}

/// Per-validator view for one era.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRecord {
    #[serde(with = "decimal_string")]
    pub own_stake_units: BigUint,
    #[serde(with = "decimal_string")]
    pub total_stake_units: BigUint,
    /// 0..=1
    pub commission_fraction: f64,
    pub is_blocking_nominations: bool,
    pub is_slashed_this_period: bool,
    pub is_over_subscribed: bool,
    pub has_verified_identity: bool,
}

/// Validator records and the ranked top list computed from them. Both are
/// swapped in together so readers never see a list from another era.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRegistry {
    pub era: EraIndex,
    pub records: BTreeMap<AccountId, ValidatorRecord>,
    pub top: Vec<AccountId>,
}

impl ValidatorRegistry {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockEntry {
    #[serde(with = "n_suffixed")]
    pub value_units: Balance,
    pub unlock_period: EraIndex,
}

/// Staking position of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPosition {
    #[serde(with = "n_suffixed")]
    pub total_units: Balance,
    #[serde(with = "n_suffixed")]
    pub active_units: Balance,
    pub has_pending_withdrawal: bool,
    pub nomination_targets: Vec<AccountId>,
    pub unlocking_entries: Vec<UnlockEntry>,
}

impl AccountPosition {
    /// Build a position, deriving `has_pending_withdrawal` from the unlocking
    /// entries: any entry whose unlock era is already behind `active_era` can
    /// be withdrawn.
    pub fn new(
        address: &str,
        total_units: Balance,
        active_units: Balance,
        nomination_targets: Vec<AccountId>,
        unlocking_entries: Vec<UnlockEntry>,
        active_era: EraIndex,
    ) -> Result<Self, StakingTypeError> {
        if active_units > total_units {
            return Err(StakingTypeError::ActiveExceedsTotal {
                address: address.to_string(),
                total: total_units,
                active: active_units,
            });
        }

        let has_pending_withdrawal = unlocking_entries
            .iter()
            .any(|entry| entry.unlock_period < active_era);

        Ok(Self {
            total_units,
            active_units,
            has_pending_withdrawal,
            nomination_targets,
            unlocking_entries,
        })
    }
}
