//! Serializable chain state backing [`crate::MemoryChain`].

use crate::api::{
    Block, BlockHash, ConstantKey, EventRecord, Exposure, IdentityRegistration, Nominations,
    StakingLedger, SuperIdentity, ValidatorPrefs,
};
use crate::errors::FixtureError;
use serde::{Deserialize, Serialize};
use stakecache_types::{AccountId, Balance, EraIndex};
use std::collections::BTreeMap;
use std::path::Path;

/// Snapshot of every storage item the cache reads. Vectors keep the node's
/// enumeration order, which the validator ranking relies on for ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainFixture {
    pub constants: BTreeMap<ConstantKey, u64>,
    pub token_decimals: u32,
    pub active_era: EraIndex,
    pub current_era: EraIndex,
    pub max_nominators_count: Option<u32>,
    pub counter_for_nominators: u32,
    pub min_nominator_bond: Balance,
    pub eras_total_stake: BTreeMap<EraIndex, Balance>,
    pub eras_validator_reward: BTreeMap<EraIndex, Option<Balance>>,
    pub validators: Vec<(AccountId, ValidatorPrefs)>,
    pub slashes: BTreeMap<EraIndex, Vec<(AccountId, Option<u32>)>>,
    pub stakers: BTreeMap<EraIndex, Vec<(AccountId, Exposure)>>,
    pub super_of: Vec<(AccountId, SuperIdentity)>,
    pub identities: Vec<(AccountId, IdentityRegistration)>,
    pub ledgers: BTreeMap<AccountId, Option<StakingLedger>>,
    pub nominators: BTreeMap<AccountId, Option<Nominations>>,
    pub blocks: BTreeMap<BlockHash, Block>,
    pub events: BTreeMap<BlockHash, Vec<EventRecord>>,
}

impl ChainFixture {
    pub fn from_json(raw: &str, origin: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(raw).map_err(|source| FixtureError::Json {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&raw, &display)
    }

    pub fn with_constants(
        mut self,
        max_nominations: u64,
        max_rewarded_per_validator: u64,
        expected_block_time: u64,
        epoch_duration: u64,
        bonding_duration: u64,
    ) -> Self {
        self.constants = BTreeMap::from([
            (ConstantKey::MaxNominations, max_nominations),
            (
                ConstantKey::MaxNominatorRewardedPerValidator,
                max_rewarded_per_validator,
            ),
            (ConstantKey::ExpectedBlockTime, expected_block_time),
            (ConstantKey::EpochDuration, epoch_duration),
            (ConstantKey::BondingDuration, bonding_duration),
        ]);
        self
    }
}
