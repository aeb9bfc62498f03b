use parking_lot::RwLock;
use stakecache_types::{
    AccountId, AccountPosition, EconomicsSummary, Network, StakingSnapshot, ValidatorRecord,
    ValidatorRegistry,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type PositionMap = HashMap<AccountId, AccountPosition>;

/// Latest derived datasets for one network.
///
/// Each dataset sits behind its own lock and is replaced by swapping an
/// [`Arc`], so readers clone a consistent view and never wait on a
/// recompute. Nothing is served until every dataset has been populated once
/// and [`CacheStore::mark_bootstrapped`] was called.
#[derive(Debug)]
pub struct CacheStore {
    network: Network,
    economics: RwLock<Option<Arc<EconomicsSummary>>>,
    registry: RwLock<Arc<ValidatorRegistry>>,
    positions: RwLock<Arc<PositionMap>>,
    bootstrapped: AtomicBool,
}

impl CacheStore {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            economics: RwLock::new(None),
            registry: RwLock::new(Arc::new(ValidatorRegistry::default())),
            positions: RwLock::new(Arc::new(PositionMap::new())),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn economics(&self) -> Option<Arc<EconomicsSummary>> {
        self.economics.read().clone()
    }

    pub fn registry(&self) -> Arc<ValidatorRegistry> {
        self.registry.read().clone()
    }

    pub fn validators(&self) -> BTreeMap<AccountId, ValidatorRecord> {
        self.registry.read().records.clone()
    }

    pub fn top_validators(&self) -> Vec<AccountId> {
        self.registry.read().top.clone()
    }

    pub fn positions(&self) -> Arc<PositionMap> {
        self.positions.read().clone()
    }

    pub fn position(&self, address: &str) -> Option<AccountPosition> {
        self.positions.read().get(address).cloned()
    }

    /// Whether economics, validators and positions have all been loaded.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }

    pub fn mark_bootstrapped(&self) {
        self.bootstrapped.store(true, Ordering::Release);
    }

    pub fn replace_economics(&self, summary: EconomicsSummary) {
        *self.economics.write() = Some(Arc::new(summary));
    }

    pub fn replace_registry(&self, registry: ValidatorRegistry) {
        *self.registry.write() = Arc::new(registry);
    }

    pub fn replace_positions(&self, positions: PositionMap) {
        *self.positions.write() = Arc::new(positions);
    }

    /// Apply per-account updates in one swap; `None` removes the account.
    /// Readers holding the previous map keep seeing it unchanged.
    ///
    /// The map is copied and edited outside the lock, so callers must be the
    /// only position writer (the block feed worker).
    pub fn apply_position_changes<I>(&self, changes: I) -> usize
    where
        I: IntoIterator<Item = (AccountId, Option<AccountPosition>)>,
    {
        let mut positions = PositionMap::clone(&self.positions());
        let mut applied = 0;
        for (address, position) in changes {
            match position {
                Some(position) => {
                    positions.insert(address, position);
                }
                None => {
                    positions.remove(&address);
                }
            }
            applied += 1;
        }
        *self.positions.write() = Arc::new(positions);
        applied
    }

    /// Everything served for this network, or `None` until bootstrap has
    /// completed.
    pub fn snapshot(&self) -> Option<StakingSnapshot> {
        if !self.is_bootstrapped() {
            return None;
        }
        let staking_info = self.economics()?;
        let registry = self.registry();
        Some(StakingSnapshot {
            validators: registry.records.clone(),
            top_validators: registry.top.clone(),
            staking_info: (*staking_info).clone(),
            users_staking: (*self.positions()).clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakecache_types::UnlockEntry;

    fn summary(era: u32) -> EconomicsSummary {
        EconomicsSummary {
            active_era: era,
            min_stake_units: 100,
            max_nominations: 16,
            max_rewarded_per_validator: 256,
            is_accepting_new_nominators: true,
            average_apy_percent: 14.2,
            decimal_places: 10,
            units_per_token: 10_000_000_000,
            period_duration_hours: 24.0,
            unbonding_period_days: 28.0,
        }
    }

    fn position(total: u128) -> AccountPosition {
        AccountPosition::new(
            "acct",
            total,
            total / 2,
            vec![],
            vec![UnlockEntry {
                value_units: total / 2,
                unlock_period: 10,
            }],
            5,
        )
        .unwrap()
    }

    #[test]
    fn snapshot_waits_for_bootstrap() {
        let store = CacheStore::new(Network::Kusama);
        store.replace_positions(PositionMap::from([("a".into(), position(10))]));
        assert!(store.snapshot().is_none());
        assert!(!store.is_bootstrapped());

        store.replace_economics(summary(1230));
        assert!(store.snapshot().is_none());
        assert!(!store.is_bootstrapped());

        store.mark_bootstrapped();
        assert!(store.is_bootstrapped());
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.staking_info.active_era, 1230);
        assert_eq!(snapshot.users_staking.len(), 1);
        assert!(snapshot.top_validators.is_empty());
        assert_eq!(store.network(), Network::Kusama);
    }

    #[test]
    fn readers_keep_their_view_across_changes() {
        let store = CacheStore::new(Network::Polkadot);
        store.replace_positions(PositionMap::from([
            ("a".into(), position(10)),
            ("b".into(), position(20)),
        ]));
        let before = store.positions();

        let applied = store.apply_position_changes([
            ("a".to_string(), Some(position(30))),
            ("b".to_string(), None),
            ("c".to_string(), Some(position(40))),
        ]);
        assert_eq!(applied, 3);

        assert_eq!(before.len(), 2);
        assert_eq!(before["a"].total_units, 10);
        assert_eq!(store.position("a").unwrap().total_units, 30);
        assert!(store.position("b").is_none());
        assert_eq!(store.positions().len(), 2);
    }

    #[test]
    fn readers_run_alongside_position_updates() {
        let store = Arc::new(CacheStore::new(Network::Polkadot));
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for n in 1..=200u128 {
                    store.apply_position_changes([(format!("acct{n}"), Some(position(n)))]);
                }
            })
        };

        let mut last_len = 0;
        while !writer.is_finished() {
            let view = store.positions();
            assert!(view.len() >= last_len);
            assert!((1..=view.len() as u128).all(|n| view.contains_key(&format!("acct{n}"))));
            last_len = view.len();
        }
        writer.join().unwrap();
        assert_eq!(store.positions().len(), 200);
    }

    #[test]
    fn registry_swaps_records_and_top_together() {
        let store = CacheStore::new(Network::Polkadot);
        assert!(store.registry().is_empty());
        store.replace_registry(ValidatorRegistry {
            era: 4,
            records: BTreeMap::new(),
            top: vec!["v1".into()],
        });
        assert_eq!(store.registry().era, 4);
        assert_eq!(store.top_validators(), vec!["v1"]);
        assert!(store.validators().is_empty());
    }
}
