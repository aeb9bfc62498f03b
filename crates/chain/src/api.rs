use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stakecache_types::{AccountId, Balance, EraIndex};
use tokio::sync::mpsc;

/// Hex-encoded block hash.
pub type BlockHash = String;

/// Event domain emitted by staking calls.
pub const STAKING_SECTION: &str = "staking";
pub const SYSTEM_SECTION: &str = "system";
pub const EXTRINSIC_FAILED: &str = "ExtrinsicFailed";

/// Runtime constants the cache reads once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstantKey {
    MaxNominations,
    MaxNominatorRewardedPerValidator,
    ExpectedBlockTime,
    EpochDuration,
    BondingDuration,
}

impl ConstantKey {
    pub const ALL: [ConstantKey; 5] = [
        ConstantKey::MaxNominations,
        ConstantKey::MaxNominatorRewardedPerValidator,
        ConstantKey::ExpectedBlockTime,
        ConstantKey::EpochDuration,
        ConstantKey::BondingDuration,
    ];

    /// `pallet.item` path of the constant.
    pub fn path(self) -> &'static str {
        match self {
            ConstantKey::MaxNominations => "staking.maxNominations",
            ConstantKey::MaxNominatorRewardedPerValidator => {
                "staking.maxNominatorRewardedPerValidator"
            }
            ConstantKey::ExpectedBlockTime => "babe.expectedBlockTime",
            ConstantKey::EpochDuration => "babe.epochDuration",
            ConstantKey::BondingDuration => "staking.bondingDuration",
        }
    }
}

/// Validator preferences (`staking.validators`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPrefs {
    /// Parts per billion.
    pub commission: u32,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualExposure {
    pub who: AccountId,
    pub value: Balance,
}

/// Stake backing one validator in one era (`staking.erasStakers`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    pub total: Balance,
    pub own: Balance,
    #[serde(default)]
    pub others: Vec<IndividualExposure>,
}

/// Sub-identity link (`identity.superOf`): the account that owns the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperIdentity {
    pub owner: AccountId,
    #[serde(default)]
    pub sub_name: Option<String>,
}

/// Identity registration (`identity.identityOf`). `size` is the number of
/// populated identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRegistration {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockChunk {
    pub value: Balance,
    pub era: EraIndex,
}

/// Bonded funds of one controller (`staking.ledger`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingLedger {
    pub stash: AccountId,
    pub total: Balance,
    pub active: Balance,
    #[serde(default)]
    pub unlocking: Vec<UnlockChunk>,
}

/// Nomination targets of one stash (`staking.nominators`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nominations {
    pub targets: Vec<AccountId>,
    #[serde(default)]
    pub submitted_in: EraIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extrinsic {
    /// `None` for inherents and other unsigned transactions.
    #[serde(default)]
    pub signer: Option<AccountId>,
    pub section: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: BlockHash,
    pub number: u64,
    #[serde(default)]
    pub extrinsics: Vec<Extrinsic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Emitted while applying the extrinsic at this index.
    ApplyExtrinsic(u32),
    Finalization,
    Initialization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub phase: Phase,
    pub section: String,
    pub method: String,
}

impl EventRecord {
    pub fn extrinsic_index(&self) -> Option<u32> {
        match self.phase {
            Phase::ApplyExtrinsic(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_extrinsic_failed(&self) -> bool {
        self.section == SYSTEM_SECTION && self.method == EXTRINSIC_FAILED
    }
}

/// Query surface of the upstream chain node.
///
/// Bulk `*_entries` calls return `(key, value)` pairs in the node's
/// enumeration order. Subscriptions return a receiver that yields every new
/// value the node reports; dropping the receiver ends the subscription.
#[async_trait]
pub trait ChainApi: Send + Sync + 'static {
    async fn constant(&self, key: ConstantKey) -> Result<u64>;

    async fn token_decimals(&self) -> Result<u32>;

    async fn active_era(&self) -> Result<EraIndex>;

    async fn current_era(&self) -> Result<EraIndex>;

    /// `None` when the runtime sets no upper bound.
    async fn max_nominators_count(&self) -> Result<Option<u32>>;

    async fn counter_for_nominators(&self) -> Result<u32>;

    async fn min_nominator_bond(&self) -> Result<Balance>;

    async fn eras_total_stake_entries(&self) -> Result<Vec<(EraIndex, Balance)>>;

    /// Rewards are `None` for eras that have not been paid out yet.
    async fn eras_validator_reward_entries(&self) -> Result<Vec<(EraIndex, Option<Balance>)>>;

    async fn validators_entries(&self) -> Result<Vec<(AccountId, ValidatorPrefs)>>;

    /// Slash fraction (parts per billion) per validator for `era`.
    async fn validator_slash_in_era_entries(
        &self,
        era: EraIndex,
    ) -> Result<Vec<(AccountId, Option<u32>)>>;

    async fn eras_stakers_entries(&self, era: EraIndex) -> Result<Vec<(AccountId, Exposure)>>;

    async fn super_of_entries(&self) -> Result<Vec<(AccountId, SuperIdentity)>>;

    async fn identity_of_entries(&self) -> Result<Vec<(AccountId, IdentityRegistration)>>;

    async fn ledger_entries(&self) -> Result<Vec<(AccountId, Option<StakingLedger>)>>;

    async fn nominators_entries(&self) -> Result<Vec<(AccountId, Option<Nominations>)>>;

    async fn ledger(&self, address: &str) -> Result<Option<StakingLedger>>;

    async fn nominators(&self, address: &str) -> Result<Option<Nominations>>;

    async fn block(&self, hash: &str) -> Result<Block>;

    async fn events_at(&self, hash: &str) -> Result<Vec<EventRecord>>;

    async fn subscribe_active_era(&self) -> Result<mpsc::Receiver<EraIndex>>;

    async fn subscribe_current_era(&self) -> Result<mpsc::Receiver<EraIndex>>;

    async fn subscribe_finalized_heads(&self) -> Result<mpsc::Receiver<BlockHash>>;
}
