use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use stakecache_cache::CacheStore;
use stakecache_types::{EraIndex, Network, StakingSnapshot};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<BTreeMap<Network, Arc<CacheStore>>>,
    pub start_time: Instant,
    pub prometheus: Option<PrometheusHandle>,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(
        stores: impl IntoIterator<Item = Arc<CacheStore>>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let stores = stores
            .into_iter()
            .map(|store| (store.network(), store))
            .collect();
        Self {
            stores: Arc::new(stores),
            start_time: Instant::now(),
            prometheus,
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn store(&self, network: Network) -> Option<&Arc<CacheStore>> {
        self.stores.get(&network)
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct NetworkFilter {
    #[serde(default)]
    network: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    req_total: u64,
    networks: Vec<NetworkHealth>,
}

#[derive(Debug, Serialize)]
struct NetworkHealth {
    network: Network,
    bootstrapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_era: Option<EraIndex>,
    validators: usize,
    positions: usize,
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr().ok();
    let app = build_router(state);
    info!(?local, "staking endpoint listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("staking endpoint terminated unexpectedly")
}

pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/staking", get(handle_staking))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn handle_staking(
    State(state): State<SharedState>,
    Query(filter): Query<NetworkFilter>,
) -> Result<Json<StakingSnapshot>, ApiError> {
    state.record_request();
    let raw = filter
        .network
        .ok_or_else(|| ApiError::bad_request("missing network query parameter"))?;
    let network: Network = raw
        .parse::<Network>()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let store = state
        .store(network)
        .ok_or_else(|| ApiError::bad_request(format!("network {network} is not served")))?;

    let snapshot = store.snapshot().ok_or_else(|| {
        ApiError::service_unavailable(format!("cache for {network} is still bootstrapping"))
    })?;
    debug!(%network, positions = snapshot.users_staking.len(), "serving snapshot");
    Ok(Json(snapshot))
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    let networks = state
        .stores
        .values()
        .map(|store| NetworkHealth {
            network: store.network(),
            bootstrapped: store.is_bootstrapped(),
            active_era: store.economics().map(|summary| summary.active_era),
            validators: store.registry().records.len(),
            positions: store.positions().len(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_seconds(),
        req_total,
        networks,
    })
}

async fn handle_metrics(State(state): State<SharedState>) -> Result<Response, ApiError> {
    state.record_request();
    let handle = state
        .prometheus
        .as_ref()
        .ok_or_else(|| ApiError::not_found("metrics exporter disabled"))?;

    let mut response = Response::new(Body::from(handle.render()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use num_bigint::BigUint;
    use stakecache_types::{
        AccountPosition, EconomicsSummary, UnlockEntry, ValidatorRecord, ValidatorRegistry,
    };
    use tower::ServiceExt;

    fn summary() -> EconomicsSummary {
        EconomicsSummary {
            active_era: 1230,
            min_stake_units: 100_000,
            max_nominations: 16,
            max_rewarded_per_validator: 256,
            is_accepting_new_nominators: false,
            average_apy_percent: 14.37,
            decimal_places: 10,
            units_per_token: 10_000_000_000,
            period_duration_hours: 24.0,
            unbonding_period_days: 28.0,
        }
    }

    fn bootstrapped_store(network: Network) -> Arc<CacheStore> {
        let store = Arc::new(CacheStore::new(network));
        store.replace_economics(summary());
        store.replace_registry(ValidatorRegistry {
            era: 1231,
            records: BTreeMap::from([(
                "validator0".to_string(),
                ValidatorRecord {
                    own_stake_units: BigUint::from(10u8),
                    total_stake_units: BigUint::from(u128::MAX) * 3u8,
                    commission_fraction: 0.03,
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
                    2_000_040,
                    1_000_000,
                    vec!["validator0".into()],
                    vec![UnlockEntry {
                        value_units: 1_000_040,
                        unlock_period: 1200,
                    }],
                    1230,
                )
                .unwrap(),
            ),
        )]);
        store.mark_bootstrapped();
        store
    }

    async fn fetch(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn serves_snapshot_with_wire_encoding() {
        let state = AppState::new([bootstrapped_store(Network::Polkadot)], None);
        let (status, body) = fetch(state, "/staking?network=0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stakingInfo"]["minStakeUnits"], "100000n");
        assert_eq!(body["stakingInfo"]["activeEra"], 1230);
        assert_eq!(body["topValidators"][0], "validator0");
        assert_eq!(
            body["validators"]["validator0"]["totalStakeUnits"],
            (BigUint::from(u128::MAX) * 3u8).to_string()
        );
        assert_eq!(body["usersStaking"]["alice"]["totalUnits"], "2000040n");
        assert_eq!(body["usersStaking"]["alice"]["hasPendingWithdrawal"], true);

        let snapshot: StakingSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.users_staking["alice"].active_units, 1_000_000);
    }

    #[tokio::test]
    async fn network_is_accepted_by_name() {
        let state = AppState::new([bootstrapped_store(Network::Kusama)], None);
        let (status, _) = fetch(state, "/staking?network=kusama").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_unknown_or_unserved_networks() {
        let state = AppState::new([bootstrapped_store(Network::Polkadot)], None);

        let (status, body) = fetch(state.clone(), "/staking?network=7").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = fetch(state.clone(), "/staking?network=kusama").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = fetch(state, "/staking").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unavailable_until_bootstrapped() {
        let store = Arc::new(CacheStore::new(Network::Polkadot));
        let state = AppState::new([store.clone()], None);

        let (status, _) = fetch(state.clone(), "/staking?network=polkadot").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, health) = fetch(state.clone(), "/health").await;
        assert_eq!(health["networks"][0]["bootstrapped"], false);

        store.replace_economics(summary());
        let (status, _) = fetch(state.clone(), "/staking?network=polkadot").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        store.mark_bootstrapped();
        let (status, _) = fetch(state.clone(), "/staking?network=polkadot").await;
        assert_eq!(status, StatusCode::OK);

        let (_, health) = fetch(state, "/health").await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["networks"][0]["network"], "polkadot");
        assert_eq!(health["networks"][0]["active_era"], 1230);
        assert_eq!(health["req_total"], 5);
    }

    #[tokio::test]
    async fn metrics_disabled_without_exporter() {
        let state = AppState::new([bootstrapped_store(Network::Polkadot)], None);
        let (status, body) = fetch(state, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "metrics exporter disabled");
    }
}
