//! Stakecache account positions
//!
//! Builds one [`stakecache_types::AccountPosition`] per bonded account at
//! bootstrap, then keeps the set current by re-querying only the signers of
//! successful staking transactions in each finalized block.

pub mod block_scan;
pub mod errors;
pub mod tracker;

pub use block_scan::*;
pub use errors::{PositionError, Result};
pub use tracker::*;
