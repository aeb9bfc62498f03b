use num_bigint::BigUint;
use stakecache_cache::CacheStore;
use stakecache_rpc::AppState;
use stakecache_sdk::{HttpSnapshotSource, Network, PullThroughCacheClient, SdkError};
use stakecache_types::{
    AccountPosition, EconomicsSummary, UnlockEntry, ValidatorRecord, ValidatorRegistry,
};
use std::collections::BTreeMap;
use std::sync::Arc;

async fn spawn_server(stores: Vec<Arc<CacheStore>>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(stakecache_rpc::serve(
        listener,
        AppState::new(stores, None),
        std::future::pending(),
    ));
    format!("http://{addr}/")
}

fn huge_stake() -> BigUint {
    BigUint::from(u128::MAX) * 1_000u32 + 7u32
}

fn bootstrapped_store() -> Arc<CacheStore> {
    let store = Arc::new(CacheStore::new(Network::Polkadot));
    store.replace_economics(EconomicsSummary {
        active_era: 1230,
        min_stake_units: u128::MAX,
        max_nominations: 16,
        max_rewarded_per_validator: 512,
        is_accepting_new_nominators: true,
        average_apy_percent: 15.71,
        decimal_places: 10,
        units_per_token: 10_000_000_000,
        period_duration_hours: 6.0,
        unbonding_period_days: 7.0,
    });
    store.replace_registry(ValidatorRegistry {
        era: 1231,
        records: BTreeMap::from([(
            "validator0".to_string(),
            ValidatorRecord {
                own_stake_units: BigUint::from(1u8),
                total_stake_units: huge_stake(),
                commission_fraction: 0.015,
                is_blocking_nominations: false,
                is_slashed_this_period: false,
                is_over_subscribed: false,
                has_verified_identity: true,
            },
        )]),
        top: vec!["validator0".into()],
    });
    store.apply_position_changes([(
        "alice".to_string(),
        Some(
            AccountPosition::new(
                "alice",
                u128::MAX - 1,
                u128::MAX - 2,
                vec!["validator0".into()],
                vec![UnlockEntry {
                    value_units: 1,
                    unlock_period: 1240,
                }],
                1230,
            )
            .unwrap(),
        ),
    )]);
    store.mark_bootstrapped();
    store
}

#[tokio::test]
async fn big_integers_survive_the_round_trip() {
    let base = spawn_server(vec![bootstrapped_store()]).await;
    let client = PullThroughCacheClient::connect(&base, Network::Polkadot).unwrap();

    let economics = client.economics().await.unwrap();
    assert_eq!(economics.min_stake_units, u128::MAX);
    assert_eq!(economics.average_apy_percent, 15.71);

    let validators = client.validators().await.unwrap();
    assert_eq!(validators["validator0"].total_stake_units, huge_stake());
    assert_eq!(client.top_validators().await.unwrap(), vec!["validator0"]);

    let alice = client.position("alice").await.unwrap().unwrap();
    assert_eq!(alice.total_units, u128::MAX - 1);
    assert_eq!(alice.active_units, u128::MAX - 2);
    assert!(!alice.has_pending_withdrawal);
}

#[tokio::test]
async fn server_errors_surface_to_the_caller() {
    let base = spawn_server(vec![Arc::new(CacheStore::new(Network::Kusama))]).await;

    let client = PullThroughCacheClient::new(
        HttpSnapshotSource::new(&base).unwrap(),
        Network::Kusama,
    );
    let err = client.economics().await.unwrap_err();
    assert_eq!(err.status(), Some(503));

    let unserved = PullThroughCacheClient::connect(&base, Network::Polkadot).unwrap();
    match unserved.positions().await.unwrap_err() {
        SdkError::ServerError { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("polkadot"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        PullThroughCacheClient::connect(format!("http://{addr}/"), Network::Polkadot).unwrap();
    assert!(matches!(client.snapshot().await, Err(SdkError::Http(_))));
}
