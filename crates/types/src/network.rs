use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("unknown network id {0}")]
    UnknownId(u8),
    #[error("unknown network name {0:?}")]
    UnknownName(String),
}

/// Networks served by a cache instance. The numeric id is what clients put in
/// the `network` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Polkadot,
    Kusama,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Polkadot, Network::Kusama];

    pub fn id(self) -> u8 {
        match self {
            Network::Polkadot => 0,
            Network::Kusama => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, NetworkError> {
        match id {
            0 => Ok(Network::Polkadot),
            1 => Ok(Network::Kusama),
            other => Err(NetworkError::UnknownId(other)),
        }
    }

    /// Ticker of the native staking token.
    pub fn symbol(self) -> &'static str {
        match self {
            Network::Polkadot => "DOT",
            Network::Kusama => "KSM",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Polkadot => "polkadot",
            Network::Kusama => "kusama",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    /// Accepts the network name, the token symbol, or the numeric id.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if let Ok(id) = normalized.parse::<u8>() {
            return Network::from_id(id);
        }
        match normalized.as_str() {
            "polkadot" | "dot" => Ok(Network::Polkadot),
            "kusama" | "ksm" => Ok(Network::Kusama),
            _ => Err(NetworkError::UnknownName(value.to_string())),
        }
    }
}
