pub mod model;
pub mod repository;

pub use model::PositionSnapshotDB;
pub use repository::SnapshotRepository;
