//! Stakecache HTTP endpoint
//!
//! Serves each network's cached [`stakecache_types::StakingSnapshot`] at
//! `GET /staking?network=<id>`, plus `/health` and an optional Prometheus
//! `/metrics` exposition.

pub mod server;

pub use server::{bind_listener, build_router, serve, AppState};
