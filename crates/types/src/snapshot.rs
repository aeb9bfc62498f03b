use crate::staking::{AccountId, AccountPosition, EconomicsSummary, ValidatorRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Document served by the cache endpoint for one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingSnapshot {
    pub validators: BTreeMap<AccountId, ValidatorRecord>,
    pub top_validators: Vec<AccountId>,
    pub staking_info: EconomicsSummary,
    pub users_staking: HashMap<AccountId, AccountPosition>,
}

impl StakingSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::UnlockEntry;
    use num_bigint::BigUint;

    fn sample() -> StakingSnapshot {
        let mut validators = BTreeMap::new();
        validators.insert(
            "validator0".to_string(),
            ValidatorRecord {
                own_stake_units: BigUint::from(10_000_000u64),
                total_stake_units: BigUint::parse_bytes(
                    b"123456789012345678901234567890123456789012",
                    10,
                )
                .unwrap(),
                commission_fraction: 0.001,
                is_blocking_nominations: false,
                is_slashed_this_period: false,
                is_over_subscribed: false,
                has_verified_identity: true,
            },
        );

        let mut users_staking = HashMap::new();
        users_staking.insert(
            "user1".to_string(),
            AccountPosition {
                total_units: u128::MAX,
                active_units: 100_000,
                has_pending_withdrawal: true,
                nomination_targets: vec!["validator0".into()],
                unlocking_entries: vec![UnlockEntry {
                    value_units: 100_000,
                    unlock_period: 1,
                }],
            },
        );

        StakingSnapshot {
            validators,
            top_validators: vec!["validator0".into()],
            staking_info: EconomicsSummary {
                active_era: 1230,
                min_stake_units: 100_000,
                max_nominations: 16,
                max_rewarded_per_validator: 256,
                is_accepting_new_nominators: false,
                average_apy_percent: 15.71,
                decimal_places: 10,
                units_per_token: 10_000_000_000,
                period_duration_hours: 24.0,
                unbonding_period_days: 28.0,
            },
            users_staking,
        }
    }

    #[test]
    fn top_level_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();
        for field in ["validators", "topValidators", "stakingInfo", "usersStaking"] {
            assert!(object.contains_key(field), "missing {field}");
        }
        assert_eq!(value["stakingInfo"]["minStakeUnits"], "100000n");
        assert_eq!(
            value["validators"]["validator0"]["totalStakeUnits"],
            "123456789012345678901234567890123456789012"
        );
    }

    #[test]
    fn json_round_trip_is_exact() {
        let snapshot = sample();
        let decoded = StakingSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.users_staking["user1"].total_units, u128::MAX);
    }
}
