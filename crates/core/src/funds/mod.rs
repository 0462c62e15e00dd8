pub mod funds_model;
pub mod funds_traits;

pub use funds_model::*;
pub use funds_traits::*;
