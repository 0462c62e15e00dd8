//! Position reconstruction - replaying the trade ledger into running holdings.

pub mod position_builder;
pub mod positions_model;

pub use position_builder::*;
pub use positions_model::*;
