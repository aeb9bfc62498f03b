//! Upstream chain query interface
//!
//! The cache never talks to a node directly; it goes through [`ChainApi`],
//! which exposes single-key lookups, bulk `entries` iteration and the three
//! subscription feeds the cache reacts to. [`MemoryChain`] implements it over
//! an in-memory [`ChainFixture`] for tests and local runs.

pub mod api;
pub mod errors;
pub mod fixture;
pub mod memory;

pub use api::*;
pub use errors::*;
pub use fixture::*;
pub use memory::*;
