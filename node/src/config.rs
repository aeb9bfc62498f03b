use anyhow::{Context, Result};
use ::config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use stakecache_types::Network;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/stakecache.toml";
const ENV_PREFIX: &str = "STAKECACHE";

/// Daemon and query-client settings.
///
/// Layering, lowest to highest: built-in defaults, the TOML file, then
/// `STAKECACHE_*` environment variables. CLI flags are applied on top by the
/// caller before [`NodeConfig::validate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub log_level: String,
    pub log_format: String,
    pub prometheus_enabled: bool,
    pub block_backlog_limit: usize,
    /// Chain fixture backing each served network, keyed by network name.
    pub networks: BTreeMap<String, PathBuf>,
    pub client_ttl_ms: u64,
    pub client_timeout_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".to_string(),
            listen_port: 8080,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            prometheus_enabled: true,
            block_backlog_limit: stakecache_cache::DEFAULT_BLOCK_BACKLOG_LIMIT,
            networks: BTreeMap::new(),
            client_ttl_ms: 3_000,
            client_timeout_ms: 3_000,
        }
    }
}

impl NodeConfig {
    /// Load from `path`, or from `config/stakecache.toml` when it exists and
    /// no path was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|path| path.exists()),
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: NodeConfig = builder
            .build()?
            .try_deserialize()
            .context("invalid stakecache configuration")?;
        Ok(config.resolve_relative_to(resolved.as_deref()))
    }

    /// Fixture paths in a config file are relative to the file's directory.
    fn resolve_relative_to(mut self, config_path: Option<&Path>) -> Self {
        let Some(base) = config_path.and_then(Path::parent) else {
            return self;
        };
        for fixture in self.networks.values_mut() {
            if fixture.is_relative() {
                *fixture = base.join(&*fixture);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_host.trim().is_empty() {
            anyhow::bail!("LISTEN_HOST must not be empty");
        }
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got {:?}", self.log_format);
        }
        if self.block_backlog_limit == 0 {
            anyhow::bail!("BLOCK_BACKLOG_LIMIT must be greater than zero");
        }
        if self.client_timeout_ms == 0 {
            anyhow::bail!("CLIENT_TIMEOUT_MS must be greater than zero");
        }
        self.served_networks()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    pub fn client_ttl(&self) -> Duration {
        Duration::from_millis(self.client_ttl_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }

    /// Parsed `[networks]` table.
    pub fn served_networks(&self) -> Result<Vec<(Network, PathBuf)>> {
        self.networks
            .iter()
            .map(|(name, fixture)| {
                let network = name
                    .parse::<Network>()
                    .with_context(|| format!("invalid network entry {name:?}"))?;
                Ok((network, fixture.clone()))
            })
            .collect()
    }
}
