//! Scheduled jobs - price synchronization, gap backfill, crash reconciliation.

pub mod backfill;
pub mod job_model;
pub mod job_traits;
pub mod reconciliation;
pub mod sync_job;

pub use backfill::*;
pub use job_model::*;
pub use job_traits::*;
pub use reconciliation::*;
pub use sync_job::*;

#[cfg(test)]
mod job_test_support;


#[cfg(test)]
mod backfill_tests;

#[cfg(test)]
mod reconciliation_tests;
