//! HTTP surface for the league competition engine.
//!
//! The binary in `main.rs` wires configuration, logging and storage; this
//! library holds the router so integration tests can drive it in-process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
