pub mod model;
pub mod repository;

pub use model::TradeDB;
pub use repository::LedgerRepository;
