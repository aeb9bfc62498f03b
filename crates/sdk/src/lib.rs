//! Stakecache client SDK
//!
//! [`PullThroughCacheClient`] reads staking data from a stakecache server and
//! keeps the last snapshot for a short TTL, so frequent reads cost one HTTP
//! round-trip per window.

mod client;
mod error;
mod source;

pub use crate::client::{PullThroughCacheClient, DEFAULT_TTL};
pub use crate::error::SdkError;
pub use crate::source::{HttpSnapshotSource, SnapshotSource, DEFAULT_REQUEST_TIMEOUT};
pub use stakecache_types::{format_units, Network, StakingSnapshot};
