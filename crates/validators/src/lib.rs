//! Stakecache validator registry
//!
//! Fuses five per-era chain datasets (preferences, slashes, exposures,
//! identity links, identity registrations) into one
//! [`stakecache_types::ValidatorRecord`] per validator and ranks the
//! nomination-eligible ones by total stake.

pub mod builder;
pub mod errors;
pub mod ranking;

pub use builder::*;
pub use errors::{RegistryError, Result};
pub use ranking::*;
