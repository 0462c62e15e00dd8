pub mod calendar_model;
pub mod calendar_traits;

pub use calendar_model::*;
pub use calendar_traits::*;
