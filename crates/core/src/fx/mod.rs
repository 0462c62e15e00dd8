pub mod currency;
pub mod fx_model;
pub mod fx_traits;

pub use currency::*;
pub use fx_model::*;
pub use fx_traits::*;
