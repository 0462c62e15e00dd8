use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use super::job_model::{JobExecution, RetryEntry};
use crate::errors::Result;

/// Trait defining the contract for job execution tracking.
///
/// `fund_name` of `None` records the all-funds sentinel (empty string).
/// Implementations enforce uniqueness on (job_name, target_date, fund_name),
/// replacing any prior record for the same key.
#[async_trait]
pub trait JobTrackerTrait: Send + Sync {
    /// Records the start of a run with status Running.
    async fn start(
        &self,
        job_name: &str,
        target_date: NaiveDate,
        fund_name: Option<&str>,
    ) -> Result<JobExecution>;

    /// Finalizes a run as Success.
    async fn complete(&self, execution_id: &str, funds_processed: Vec<String>) -> Result<()>;

    /// Finalizes a run as Failed with the error message.
    async fn fail(&self, execution_id: &str, error_message: &str) -> Result<()>;

    /// Records a run that never started (lock contention, holiday trigger)
    /// as a terminal Failed execution, so monitoring can distinguish
    /// "ran and succeeded" from "never ran".
    async fn record_skipped(
        &self,
        job_name: &str,
        target_date: NaiveDate,
        fund_name: Option<&str>,
        reason: &str,
    ) -> Result<()>;

    /// Executions still Running that started more than `stale_after` ago.
    /// Each is evidence of a crashed run.
    fn find_stale_running(&self, stale_after: Duration) -> Result<Vec<JobExecution>>;
}

/// Trait defining the contract for the retry queue.
#[async_trait]
pub trait RetryQueueTrait: Send + Sync {
    async fn add(&self, entry: RetryEntry) -> Result<()>;
}
