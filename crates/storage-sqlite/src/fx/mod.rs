pub mod model;
pub mod repository;

pub use model::FxRateDB;
pub use repository::FxRateRepository;
