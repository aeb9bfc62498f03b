//! Stakecache shared types
//!
//! Data model for the derived staking datasets (economics, validator registry,
//! account positions), the network identifiers they are served under, and the
//! JSON wire conventions used between the cache server and its clients.

pub mod network;
pub mod snapshot;
pub mod staking;
pub mod units;
pub mod wire;

pub use network::*;
pub use snapshot::*;
pub use staking::*;
pub use units::*;
