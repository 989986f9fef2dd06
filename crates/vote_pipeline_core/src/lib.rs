//! Shared vote pipeline domain primitives.
//!
//! This crate owns the ballot and vote event contracts, the key design of the
//! votes table, and the decoding of queue deliveries. It intentionally excludes
//! AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod envelope;
pub mod keys;
