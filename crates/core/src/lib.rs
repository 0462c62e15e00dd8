//! Fundledger Core - Position reconstruction and snapshot synchronization.
//!
//! This crate contains the core engine that replays a fund's append-only
//! trade ledger into per-ticker holdings, keeps the one-row-per-trading-day
//! snapshot table consistent across timezones and retroactive trades, and
//! runs the crash-safe price synchronization jobs.
//!
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod calendar;
pub mod constants;
pub mod errors;
pub mod funds;
pub mod fx;
pub mod jobs;
pub mod ledger;
pub mod market_data;
pub mod positions;
pub mod snapshot;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
