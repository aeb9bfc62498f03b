use crate::error::SdkError;
use crate::source::{HttpSnapshotSource, SnapshotSource};
use parking_lot::Mutex;
use stakecache_types::{
    AccountId, AccountPosition, EconomicsSummary, Network, StakingSnapshot, ValidatorRecord,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How long a fetched snapshot is served before the next read refetches it.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

struct Cached {
    snapshot: Arc<StakingSnapshot>,
    fetched_at: Instant,
}

/// Read-through cache over a remote stakecache server for one network.
///
/// Every getter serves the last fetched snapshot while it is younger than the
/// TTL and refetches otherwise. Fetch errors are returned to the caller; the
/// stale snapshot is not used as a fallback.
pub struct PullThroughCacheClient<S: SnapshotSource = HttpSnapshotSource> {
    source: S,
    network: Network,
    ttl: Duration,
    cached: Mutex<Option<Cached>>,
}

impl PullThroughCacheClient<HttpSnapshotSource> {
    /// Client for the server at `base_url` with the default TTL and timeout.
    pub fn connect(base_url: impl AsRef<str>, network: Network) -> Result<Self, SdkError> {
        Ok(Self::new(HttpSnapshotSource::new(base_url)?, network))
    }
}

impl<S: SnapshotSource> PullThroughCacheClient<S> {
    pub fn new(source: S, network: Network) -> Self {
        Self::with_ttl(source, network, DEFAULT_TTL)
    }

    pub fn with_ttl(source: S, network: Network, ttl: Duration) -> Self {
        Self {
            source,
            network,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current snapshot, refetched first when the cached one is older
    /// than the TTL.
    pub async fn snapshot(&self) -> Result<Arc<StakingSnapshot>, SdkError> {
        if let Some(fresh) = self.fresh() {
            return Ok(fresh);
        }

        let snapshot = Arc::new(self.source.fetch(self.network).await?);
        debug!(network = %self.network, "refreshed staking snapshot");
        *self.cached.lock() = Some(Cached {
            snapshot: snapshot.clone(),
            fetched_at: Instant::now(),
        });
        Ok(snapshot)
    }

    pub async fn economics(&self) -> Result<EconomicsSummary, SdkError> {
        Ok(self.snapshot().await?.staking_info.clone())
    }

    pub async fn top_validators(&self) -> Result<Vec<AccountId>, SdkError> {
        Ok(self.snapshot().await?.top_validators.clone())
    }

    pub async fn validators(&self) -> Result<BTreeMap<AccountId, ValidatorRecord>, SdkError> {
        Ok(self.snapshot().await?.validators.clone())
    }

    pub async fn positions(&self) -> Result<HashMap<AccountId, AccountPosition>, SdkError> {
        Ok(self.snapshot().await?.users_staking.clone())
    }

    pub async fn position(&self, address: &str) -> Result<Option<AccountPosition>, SdkError> {
        Ok(self.snapshot().await?.users_staking.get(address).cloned())
    }

    fn fresh(&self) -> Option<Arc<StakingSnapshot>> {
        let cached = self.cached.lock();
        let cached = cached.as_ref()?;
        (Instant::now().duration_since(cached.fetched_at) <= self.ttl)
            .then(|| cached.snapshot.clone())
    }
}
