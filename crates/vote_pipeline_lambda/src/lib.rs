//! AWS-oriented adapters and handlers for the vote pipeline.
//!
//! This crate owns runtime integration details (Lambda handlers, bus and store
//! adapters, configuration and logging) and exposes a single runtime module
//! boundary for the contract, envelope and key primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod runtime;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
