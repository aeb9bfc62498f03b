//! In-memory [`ChainApi`] backend.

use crate::api::{
    Block, BlockHash, ChainApi, ConstantKey, EventRecord, Exposure, IdentityRegistration,
    Nominations, StakingLedger, SuperIdentity, ValidatorPrefs,
};
use crate::errors::{ChainError, Result};
use crate::fixture::ChainFixture;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use stakecache_types::{AccountId, Balance, EraIndex};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::debug;

/// Buffer of each subscription channel handed out by [`MemoryChain`].
pub const FEED_CAPACITY: usize = 64;

/// Query kinds, used for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Constant,
    TokenDecimals,
    ActiveEra,
    CurrentEra,
    MaxNominatorsCount,
    CounterForNominators,
    MinNominatorBond,
    ErasTotalStake,
    ErasValidatorReward,
    Validators,
    ValidatorSlashInEra,
    ErasStakers,
    SuperOf,
    IdentityOf,
    LedgerEntries,
    NominatorsEntries,
    Ledger,
    Nominators,
    Block,
    Events,
}

#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    counts: HashMap<Query, usize>,
    slash_eras: Vec<EraIndex>,
    staker_eras: Vec<EraIndex>,
    ledger_addresses: Vec<AccountId>,
}

impl QueryLog {
    pub fn count(&self, query: Query) -> usize {
        self.counts.get(&query).copied().unwrap_or(0)
    }

    /// Era arguments passed to `validator_slash_in_era_entries`, in call order.
    pub fn slash_eras(&self) -> &[EraIndex] {
        &self.slash_eras
    }

    /// Era arguments passed to `eras_stakers_entries`, in call order.
    pub fn staker_eras(&self) -> &[EraIndex] {
        &self.staker_eras
    }

    /// Addresses passed to single-key `ledger` lookups, in call order.
    pub fn ledger_addresses(&self) -> &[AccountId] {
        &self.ledger_addresses
    }
}

#[derive(Default)]
struct Faults {
    queries: HashSet<Query>,
    addresses: HashSet<AccountId>,
}

#[derive(Default)]
struct Feeds {
    active_era: Vec<mpsc::Sender<EraIndex>>,
    current_era: Vec<mpsc::Sender<EraIndex>>,
    finalized_heads: Vec<mpsc::Sender<BlockHash>>,
}

/// Chain backend over a mutable [`ChainFixture`].
///
/// State changes made through [`MemoryChain::set_active_era`],
/// [`MemoryChain::set_current_era`] and [`MemoryChain::finalize_block`] are
/// pushed to every live subscriber, mirroring how a node notifies storage
/// subscriptions.
#[derive(Default)]
pub struct MemoryChain {
    state: RwLock<ChainFixture>,
    feeds: Mutex<Feeds>,
    queries: Mutex<QueryLog>,
    faults: RwLock<Faults>,
}

impl MemoryChain {
    pub fn new(fixture: ChainFixture) -> Self {
        Self {
            state: RwLock::new(fixture),
            ..Default::default()
        }
    }

    /// Mutate the stored chain state without notifying subscribers.
    pub fn update(&self, apply: impl FnOnce(&mut ChainFixture)) {
        apply(&mut *self.state.write());
    }

    pub fn state(&self) -> ChainFixture {
        self.state.read().clone()
    }

    pub fn query_log(&self) -> QueryLog {
        self.queries.lock().clone()
    }

    /// Make every subsequent query of this kind fail with a transport error.
    pub fn fail_query(&self, query: Query) {
        self.faults.write().queries.insert(query);
    }

    /// Make single-key ledger and nominator lookups for `address` fail.
    pub fn fail_address(&self, address: impl Into<AccountId>) {
        self.faults.write().addresses.insert(address.into());
    }

    pub fn clear_faults(&self) {
        let mut faults = self.faults.write();
        faults.queries.clear();
        faults.addresses.clear();
    }

    pub async fn set_active_era(&self, era: EraIndex) {
        self.state.write().active_era = era;
        let subscribers = self.feeds.lock().active_era.clone();
        notify(subscribers, era).await;
    }

    pub async fn set_current_era(&self, era: EraIndex) {
        self.state.write().current_era = era;
        let subscribers = self.feeds.lock().current_era.clone();
        notify(subscribers, era).await;
    }

    /// Store a block with its events and announce it as finalized.
    pub async fn finalize_block(&self, block: Block, events: Vec<EventRecord>) {
        let hash = block.hash.clone();
        {
            let mut state = self.state.write();
            state.events.insert(hash.clone(), events);
            state.blocks.insert(hash.clone(), block);
        }
        let subscribers = self.feeds.lock().finalized_heads.clone();
        notify(subscribers, hash).await;
    }

    /// Drop every subscription sender so receivers observe a closed feed.
    pub fn close_feeds(&self) {
        *self.feeds.lock() = Feeds::default();
    }

    fn record(&self, query: Query) -> Result<()> {
        *self.queries.lock().counts.entry(query).or_insert(0) += 1;
        if self.faults.read().queries.contains(&query) {
            return Err(ChainError::Transport(format!("injected failure for {query:?}")));
        }
        Ok(())
    }

    fn check_address(&self, address: &str) -> Result<()> {
        if self.faults.read().addresses.contains(address) {
            return Err(ChainError::Transport(format!(
                "injected failure for address {address}"
            )));
        }
        Ok(())
    }
}

async fn notify<T: Clone>(subscribers: Vec<mpsc::Sender<T>>, value: T) {
    for subscriber in subscribers {
        if subscriber.send(value.clone()).await.is_err() {
            debug!("dropping notification for closed subscriber");
        }
    }
}

#[async_trait]
impl ChainApi for MemoryChain {
    async fn constant(&self, key: ConstantKey) -> Result<u64> {
        self.record(Query::Constant)?;
        self.state
            .read()
            .constants
            .get(&key)
            .copied()
            .ok_or_else(|| ChainError::Missing(key.path().to_string()))
    }

    async fn token_decimals(&self) -> Result<u32> {
        self.record(Query::TokenDecimals)?;
        Ok(self.state.read().token_decimals)
    }

    async fn active_era(&self) -> Result<EraIndex> {
        self.record(Query::ActiveEra)?;
        Ok(self.state.read().active_era)
    }

    async fn current_era(&self) -> Result<EraIndex> {
        self.record(Query::CurrentEra)?;
        Ok(self.state.read().current_era)
    }

    async fn max_nominators_count(&self) -> Result<Option<u32>> {
        self.record(Query::MaxNominatorsCount)?;
        Ok(self.state.read().max_nominators_count)
    }

    async fn counter_for_nominators(&self) -> Result<u32> {
        self.record(Query::CounterForNominators)?;
        Ok(self.state.read().counter_for_nominators)
    }

    async fn min_nominator_bond(&self) -> Result<Balance> {
        self.record(Query::MinNominatorBond)?;
        Ok(self.state.read().min_nominator_bond)
    }

    async fn eras_total_stake_entries(&self) -> Result<Vec<(EraIndex, Balance)>> {
        self.record(Query::ErasTotalStake)?;
        Ok(self
            .state
            .read()
            .eras_total_stake
            .iter()
            .map(|(era, total)| (*era, *total))
            .collect())
    }

    async fn eras_validator_reward_entries(&self) -> Result<Vec<(EraIndex, Option<Balance>)>> {
        self.record(Query::ErasValidatorReward)?;
        Ok(self
            .state
            .read()
            .eras_validator_reward
            .iter()
            .map(|(era, reward)| (*era, *reward))
            .collect())
    }

    async fn validators_entries(&self) -> Result<Vec<(AccountId, ValidatorPrefs)>> {
        self.record(Query::Validators)?;
        Ok(self.state.read().validators.clone())
    }

    async fn validator_slash_in_era_entries(
        &self,
        era: EraIndex,
    ) -> Result<Vec<(AccountId, Option<u32>)>> {
        self.queries.lock().slash_eras.push(era);
        self.record(Query::ValidatorSlashInEra)?;
        Ok(self
            .state
            .read()
            .slashes
            .get(&era)
            .cloned()
            .unwrap_or_default())
    }

    async fn eras_stakers_entries(&self, era: EraIndex) -> Result<Vec<(AccountId, Exposure)>> {
        self.queries.lock().staker_eras.push(era);
        self.record(Query::ErasStakers)?;
        Ok(self
            .state
            .read()
            .stakers
            .get(&era)
            .cloned()
            .unwrap_or_default())
    }

    async fn super_of_entries(&self) -> Result<Vec<(AccountId, SuperIdentity)>> {
        self.record(Query::SuperOf)?;
        Ok(self.state.read().super_of.clone())
    }

    async fn identity_of_entries(&self) -> Result<Vec<(AccountId, IdentityRegistration)>> {
        self.record(Query::IdentityOf)?;
        Ok(self.state.read().identities.clone())
    }

    async fn ledger_entries(&self) -> Result<Vec<(AccountId, Option<StakingLedger>)>> {
        self.record(Query::LedgerEntries)?;
        Ok(self
            .state
            .read()
            .ledgers
            .iter()
            .map(|(address, ledger)| (address.clone(), ledger.clone()))
            .collect())
    }

    async fn nominators_entries(&self) -> Result<Vec<(AccountId, Option<Nominations>)>> {
        self.record(Query::NominatorsEntries)?;
        Ok(self
            .state
            .read()
            .nominators
            .iter()
            .map(|(address, nominations)| (address.clone(), nominations.clone()))
            .collect())
    }

    async fn ledger(&self, address: &str) -> Result<Option<StakingLedger>> {
        self.queries.lock().ledger_addresses.push(address.to_string());
        self.record(Query::Ledger)?;
        self.check_address(address)?;
        Ok(self.state.read().ledgers.get(address).cloned().flatten())
    }

    async fn nominators(&self, address: &str) -> Result<Option<Nominations>> {
        self.record(Query::Nominators)?;
        self.check_address(address)?;
        Ok(self.state.read().nominators.get(address).cloned().flatten())
    }

    async fn block(&self, hash: &str) -> Result<Block> {
        self.record(Query::Block)?;
        self.state
            .read()
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| ChainError::Missing(format!("block {hash}")))
    }

    async fn events_at(&self, hash: &str) -> Result<Vec<EventRecord>> {
        self.record(Query::Events)?;
        self.state
            .read()
            .events
            .get(hash)
            .cloned()
            .ok_or_else(|| ChainError::Missing(format!("events at {hash}")))
    }

    async fn subscribe_active_era(&self) -> Result<mpsc::Receiver<EraIndex>> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.feeds.lock().active_era.push(tx);
        Ok(rx)
    }

    async fn subscribe_current_era(&self) -> Result<mpsc::Receiver<EraIndex>> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.feeds.lock().current_era.push(tx);
        Ok(rx)
    }

    async fn subscribe_finalized_heads(&self) -> Result<mpsc::Receiver<BlockHash>> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.feeds.lock().finalized_heads.push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MemoryChain {
        MemoryChain::new(ChainFixture::default().with_constants(16, 256, 6000, 2400, 28))
    }

    #[tokio::test]
    async fn constants_and_missing_values() {
        let chain = chain();
        assert_eq!(chain.constant(ConstantKey::BondingDuration).await.unwrap(), 28);

        chain.update(|state| {
            state.constants.remove(&ConstantKey::EpochDuration);
        });
        let err = chain.constant(ConstantKey::EpochDuration).await.unwrap_err();
        assert_eq!(err, ChainError::Missing("babe.epochDuration".into()));
        assert_eq!(chain.query_log().count(Query::Constant), 2);
    }

    #[tokio::test]
    async fn injected_faults_are_scoped() {
        let chain = chain();
        chain.fail_query(Query::ErasTotalStake);
        chain.fail_address("mallory");

        assert!(chain.eras_total_stake_entries().await.is_err());
        assert!(chain.ledger("mallory").await.is_err());
        assert!(chain.ledger("alice").await.unwrap().is_none());

        chain.clear_faults();
        assert!(chain.eras_total_stake_entries().await.is_ok());
        assert!(chain.ledger("mallory").await.is_ok());
    }

    #[tokio::test]
    async fn records_era_arguments() {
        let chain = chain();
        chain.validator_slash_in_era_entries(7).await.unwrap();
        chain.eras_stakers_entries(8).await.unwrap();
        let log = chain.query_log();
        assert_eq!(log.slash_eras(), &[7]);
        assert_eq!(log.staker_eras(), &[8]);
    }

    #[tokio::test]
    async fn feeds_deliver_updates_to_every_subscriber() {
        let chain = chain();
        let mut first = chain.subscribe_active_era().await.unwrap();
        let mut second = chain.subscribe_active_era().await.unwrap();
        let mut heads = chain.subscribe_finalized_heads().await.unwrap();

        chain.set_active_era(3000).await;
        assert_eq!(first.recv().await, Some(3000));
        assert_eq!(second.recv().await, Some(3000));
        assert_eq!(chain.active_era().await.unwrap(), 3000);

        chain
            .finalize_block(
                Block {
                    hash: "0xaa".into(),
                    number: 1,
                    extrinsics: vec![],
                },
                vec![],
            )
            .await;
        assert_eq!(heads.recv().await.as_deref(), Some("0xaa"));
        assert_eq!(chain.block("0xaa").await.unwrap().number, 1);

        chain.close_feeds();
        assert_eq!(first.recv().await, None);
    }
}
