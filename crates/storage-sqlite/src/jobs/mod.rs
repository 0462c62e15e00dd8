pub mod model;
pub mod repository;

pub use model::{JobExecutionDB, RetryEntryDB};
pub use repository::{JobTrackerRepository, RetryQueueRepository};
