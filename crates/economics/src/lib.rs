//! Stakecache economics
//!
//! Loads the immutable protocol constants once per process and derives the
//! network-wide [`stakecache_types::EconomicsSummary`] (average yield, era
//! length, unbonding period, nominator cap) from per-era stake and reward
//! history.

pub mod calculator;
pub mod constants;
pub mod errors;

pub use calculator::*;
pub use constants::*;
pub use errors::{EconomicsError, Result};
