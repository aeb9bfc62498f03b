use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use stakecache_cache::{CacheEngine, CacheStore, EngineSettings, SubscriptionCoordinator};
use stakecache_chain::{ChainFixture, MemoryChain};
use stakecache_rpc::{bind_listener, AppState};
use stakecache_sdk::{format_units, HttpSnapshotSource, Network, PullThroughCacheClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod config;
mod version;

use config::NodeConfig;
use version::{git_commit_hash, STAKECACHE_VERSION};

#[derive(Parser)]
#[command(name = "stakecache")]
#[command(about = "Staking-state cache daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the log level
    #[arg(long, global = true, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// Select log output format
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the configured networks and serve their snapshots
    Serve {
        /// Override the listen host
        #[arg(long)]
        host: Option<String>,
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
        /// Do not install the Prometheus exporter
        #[arg(long)]
        disable_metrics: bool,
    },
    /// Read staking data from a running server
    Query {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:8080/")]
        url: String,
        /// Network name, token symbol or numeric id
        #[arg(long, default_value = "polkadot")]
        network: Network,
        #[command(subcommand)]
        target: QueryTarget,
    },
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum QueryTarget {
    /// Network economics summary
    Economics,
    /// Ranked validators eligible for nomination
    Top,
    /// One validator record
    Validator { address: String },
    /// One account's staking position
    Position { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            disable_metrics,
        } => {
            if let Some(host) = host {
                config.listen_host = host;
            }
            if let Some(port) = port {
                config.listen_port = port;
            }
            if disable_metrics {
                config.prometheus_enabled = false;
            }
            config.validate()?;
            init_logging(&config)?;
            run_server(config).await
        }
        Commands::Query {
            url,
            network,
            target,
        } => {
            config.validate()?;
            init_logging(&config)?;
            run_query(&config, &url, network, target).await
        }
        Commands::Version => {
            println!("stakecache {} (commit {})", STAKECACHE_VERSION, git_commit_hash());
            Ok(())
        }
    }
}

async fn run_server(config: NodeConfig) -> Result<()> {
    let networks = config.served_networks()?;
    if networks.is_empty() {
        warn!("No networks configured; the staking endpoint will reject every request");
    }

    let prometheus = init_metrics(&config);
    let settings = EngineSettings {
        block_backlog_limit: config.block_backlog_limit,
    };

    let mut pending = Vec::with_capacity(networks.len());
    for (network, fixture_path) in networks {
        let fixture = ChainFixture::load(&fixture_path)
            .with_context(|| format!("failed to load chain fixture for {network}"))?;
        info!(%network, fixture = %fixture_path.display(), "chain fixture loaded");
        let chain = Arc::new(MemoryChain::new(fixture));
        let store = Arc::new(CacheStore::new(network));
        pending.push((chain, store));
    }

    let listener = bind_listener(&config.listen_addr()).await?;
    let state = AppState::new(pending.iter().map(|(_, store)| store.clone()), prometheus);
    let mut server = tokio::spawn(stakecache_rpc::serve(listener, state, shutdown_signal()));

    let mut coordinators = Vec::with_capacity(pending.len());
    for (chain, store) in pending {
        let network = store.network();
        let engine = tokio::select! {
            result = CacheEngine::bootstrap(chain, store, settings) => result
                .with_context(|| format!("bootstrap failed for {network}"))?,
            _ = &mut server => anyhow::bail!("staking endpoint stopped during bootstrap"),
        };
        let coordinator = SubscriptionCoordinator::start(Arc::new(engine))
            .await
            .with_context(|| format!("failed to subscribe to {network} feeds"))?;
        coordinators.push(coordinator);
    }
    info!(networks = coordinators.len(), "all networks bootstrapped");

    let result = server.await.context("staking endpoint task panicked")?;
    for coordinator in coordinators {
        coordinator.shutdown();
    }
    if let Err(err) = &result {
        error!("Staking endpoint failed: {err:#}");
    }
    result
}

async fn run_query(
    config: &NodeConfig,
    url: &str,
    network: Network,
    target: QueryTarget,
) -> Result<()> {
    let source = HttpSnapshotSource::with_timeout(url, config.client_timeout())?;
    let client = PullThroughCacheClient::with_ttl(source, network, config.client_ttl());

    let output = match target {
        QueryTarget::Economics => {
            let summary = client.economics().await?;
            serde_json::json!({
                "network": network,
                "activeEra": summary.active_era,
                "averageApyPercent": summary.average_apy_percent,
                "minStake": format_units(summary.min_stake_units, summary.decimal_places),
                "maxNominations": summary.max_nominations,
                "isAcceptingNewNominators": summary.is_accepting_new_nominators,
                "periodDurationHours": summary.period_duration_hours,
                "unbondingPeriodDays": summary.unbonding_period_days,
            })
        }
        QueryTarget::Top => serde_json::to_value(client.top_validators().await?)?,
        QueryTarget::Validator { address } => {
            let validators = client.validators().await?;
            let record = validators
                .get(&address)
                .with_context(|| format!("validator {address} is not in the registry"))?;
            serde_json::to_value(record)?
        }
        QueryTarget::Position { address } => {
            let decimals = client.economics().await?.decimal_places;
            let position = client
                .position(&address)
                .await?
                .with_context(|| format!("no staking position for {address}"))?;
            serde_json::json!({
                "address": address,
                "total": format_units(position.total_units, decimals),
                "active": format_units(position.active_units, decimals),
                "hasPendingWithdrawal": position.has_pending_withdrawal,
                "nominationTargets": position.nomination_targets,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_metrics(config: &NodeConfig) -> Option<PrometheusHandle> {
    if !config.prometheus_enabled {
        info!("Prometheus metrics exporter disabled via configuration");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics exporter registered");
            describe_counter!(
                "stakecache_recompute_total",
                "Dataset recomputes that replaced the cached value"
            );
            describe_counter!(
                "stakecache_recompute_failures_total",
                "Dataset recomputes that failed and kept the previous value"
            );
            describe_gauge!("stakecache_positions", "Cached account positions per network");
            describe_gauge!("stakecache_active_era", "Active era of the cached economics summary");
            Some(handle)
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics exporter: {}", err);
            None
        }
    }
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(&config.log_format, std::io::stdout))
        .init();

    Ok(())
}

fn fmt_layer<S, W>(format: &str, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    if format == "json" {
        layer.json().boxed()
    } else {
        layer.pretty().boxed()
    }
}
