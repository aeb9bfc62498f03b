//! Stakecache engine
//!
//! Holds the per-network [`CacheStore`] and keeps it current: a
//! [`CacheEngine`] bootstraps every dataset once, then a
//! [`SubscriptionCoordinator`] reacts to the chain's active-era, current-era
//! and finalized-head feeds.

pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod store;

pub use coordinator::SubscriptionCoordinator;
pub use engine::{CacheEngine, Dataset, EngineSettings, DEFAULT_BLOCK_BACKLOG_LIMIT};
pub use errors::{CacheError, Result};
pub use store::{CacheStore, PositionMap};
