//! Recompute handlers bound to one network's store.

use crate::errors::Result;
use crate::store::CacheStore;
use metrics::{counter, gauge};
use stakecache_chain::{BlockHash, ChainApi};
use stakecache_economics::{ConstantsLoader, EconomicsCalculator};
use stakecache_positions::PositionTracker;
use stakecache_types::{EraIndex, Network, ProtocolConstants};
use stakecache_validators::RegistryBuilder;
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_BLOCK_BACKLOG_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pending finalized blocks kept while a position refresh runs. Beyond
    /// this the backlog is dropped and positions are rebuilt in full.
    pub block_backlog_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            block_backlog_limit: DEFAULT_BLOCK_BACKLOG_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Economics,
    Validators,
    Positions,
}

impl Dataset {
    pub fn as_str(self) -> &'static str {
        match self {
            Dataset::Economics => "economics",
            Dataset::Validators => "validators",
            Dataset::Positions => "positions",
        }
    }
}

/// Owns the calculators for one network and writes their results into the
/// [`CacheStore`].
pub struct CacheEngine<C: ChainApi> {
    network: Network,
    chain: Arc<C>,
    store: Arc<CacheStore>,
    settings: EngineSettings,
    constants: ProtocolConstants,
    economics: EconomicsCalculator,
    registry: RegistryBuilder,
    positions: PositionTracker<C>,
}

impl<C: ChainApi> CacheEngine<C> {
    /// Load the protocol constants and populate every dataset, economics
    /// first so positions can use its active era.
    pub async fn bootstrap(
        chain: Arc<C>,
        store: Arc<CacheStore>,
        settings: EngineSettings,
    ) -> Result<Self> {
        let network = store.network();
        let constants = ConstantsLoader::new().load(chain.as_ref()).await?;

        let engine = Self {
            network,
            positions: PositionTracker::new(chain.clone()),
            economics: EconomicsCalculator::new(constants),
            registry: RegistryBuilder::new(constants),
            chain,
            store,
            settings,
            constants,
        };

        engine.try_refresh_economics(None).await?;
        engine.try_refresh_registry(None).await?;
        engine.try_rebuild_positions().await?;
        engine.store.mark_bootstrapped();
        info!(%network, "cache bootstrapped");
        Ok(engine)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn constants(&self) -> ProtocolConstants {
        self.constants
    }

    /// Recompute the economics summary; on failure the previous one stays.
    pub async fn refresh_economics(&self, era: Option<EraIndex>) {
        if let Err(err) = self.try_refresh_economics(era).await {
            self.record_failure(Dataset::Economics, &err);
        }
    }

    pub async fn refresh_registry(&self, era: Option<EraIndex>) {
        if let Err(err) = self.try_refresh_registry(era).await {
            self.record_failure(Dataset::Validators, &err);
        }
    }

    pub async fn rebuild_positions(&self) {
        if let Err(err) = self.try_rebuild_positions().await {
            self.record_failure(Dataset::Positions, &err);
        }
    }

    /// Refresh the accounts touched by the given finalized blocks.
    pub async fn apply_blocks(&self, hashes: &[BlockHash]) {
        let active_era = match self.active_era().await {
            Ok(era) => era,
            Err(err) => {
                self.record_failure(Dataset::Positions, &err);
                return;
            }
        };
        let changes = self.positions.apply_blocks(hashes, active_era).await;
        let applied = self.store.apply_position_changes(changes);
        self.record_success(Dataset::Positions);
        gauge!("stakecache_positions", "network" => self.network.name())
            .set(self.store.positions().len() as f64);
        info!(
            network = %self.network,
            blocks = hashes.len(),
            accounts = applied,
            "positions updated from finalized blocks"
        );
    }

    async fn try_refresh_economics(&self, era: Option<EraIndex>) -> Result<()> {
        let summary = self.economics.compute(self.chain.as_ref(), era).await?;
        gauge!("stakecache_active_era", "network" => self.network.name())
            .set(f64::from(summary.active_era));
        self.store.replace_economics(summary);
        self.record_success(Dataset::Economics);
        Ok(())
    }

    async fn try_refresh_registry(&self, era: Option<EraIndex>) -> Result<()> {
        let registry = self.registry.build(self.chain.as_ref(), era).await?;
        self.store.replace_registry(registry);
        self.record_success(Dataset::Validators);
        Ok(())
    }

    async fn try_rebuild_positions(&self) -> Result<()> {
        let active_era = self.active_era().await?;
        let positions = self.positions.bootstrap(active_era).await?;
        gauge!("stakecache_positions", "network" => self.network.name())
            .set(positions.len() as f64);
        self.store.replace_positions(positions);
        self.record_success(Dataset::Positions);
        Ok(())
    }

    /// Era used for withdrawal checks: the cached summary's, or the chain's
    /// when no summary exists yet.
    async fn active_era(&self) -> Result<EraIndex> {
        match self.store.economics() {
            Some(summary) => Ok(summary.active_era),
            None => Ok(self.chain.active_era().await?),
        }
    }

    fn record_success(&self, dataset: Dataset) {
        counter!(
            "stakecache_recompute_total",
            "network" => self.network.name(),
            "dataset" => dataset.as_str()
        )
        .increment(1);
    }

    fn record_failure(&self, dataset: Dataset, err: &dyn std::error::Error) {
        counter!(
            "stakecache_recompute_failures_total",
            "network" => self.network.name(),
            "dataset" => dataset.as_str()
        )
        .increment(1);
        error!(
            network = %self.network,
            dataset = dataset.as_str(),
            %err,
            "recompute failed, keeping previous data"
        );
    }
}
