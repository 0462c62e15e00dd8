//! Snapshot table management - timezone normalization and day-level merging.

pub mod snapshot_model;
pub mod snapshot_traits;
pub mod snapshot_writer;

pub use snapshot_model::*;
pub use snapshot_traits::*;
pub use snapshot_writer::*;
