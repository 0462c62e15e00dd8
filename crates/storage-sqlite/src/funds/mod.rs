pub mod model;
pub mod repository;

pub use model::FundDB;
pub use repository::FundRepository;
