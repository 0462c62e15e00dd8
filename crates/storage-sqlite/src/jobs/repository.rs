use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{JobExecutionDB, RetryEntryDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use fundledger_core::constants::ALL_FUNDS_SENTINEL;
use fundledger_core::errors::{DatabaseError, Error, Result};
use fundledger_core::jobs::{
    JobExecution, JobStatus, JobTrackerTrait, RetryEntry, RetryQueueTrait,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Clone)]
pub struct JobTrackerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl JobTrackerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub fn get_by_id(&self, execution_id: &str) -> Result<JobExecution> {
        use crate::schema::job_executions::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let row = job_executions
            .find(execution_id)
            .first::<JobExecutionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| {
                Error::Database(DatabaseError::NotFound(format!(
                    "Job execution not found: {}",
                    execution_id
                )))
            })?;
        Ok(JobExecution::from(row))
    }

    /// Writes a terminal status update for an existing execution. Duration
    /// is derived from the stored started_at so restarts cannot corrupt it.
    async fn finalize(
        &self,
        execution_id: &str,
        new_status: JobStatus,
        message: Option<String>,
        processed: Option<Vec<String>>,
    ) -> Result<()> {
        use crate::schema::job_executions::dsl::*;

        let key = execution_id.to_string();
        self.writer
            .exec(move |conn| {
                let existing = job_executions
                    .find(&key)
                    .first::<JobExecutionDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| {
                        Error::Database(DatabaseError::NotFound(format!(
                            "Job execution not found: {}",
                            key
                        )))
                    })?;

                let mut execution = JobExecution::from(existing);
                let now = Utc::now();
                execution.status = new_status;
                execution.completed_at = Some(now);
                execution.duration_ms =
                    Some((now - execution.started_at).num_milliseconds().max(0));
                if let Some(message) = message {
                    execution.error_message = Some(message);
                }
                if let Some(processed) = processed {
                    execution.funds_processed = processed;
                }

                let db_model = JobExecutionDB::from(execution);
                diesel::replace_into(job_executions)
                    .values(&db_model)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl JobTrackerTrait for JobTrackerRepository {
    async fn start(
        &self,
        job: &str,
        date: NaiveDate,
        fund: Option<&str>,
    ) -> Result<JobExecution> {
        use crate::schema::job_executions::dsl::*;

        let execution = JobExecution {
            id: Uuid::new_v4().to_string(),
            job_name: job.to_string(),
            target_date: date,
            fund_name: fund.unwrap_or(ALL_FUNDS_SENTINEL).to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            error_message: None,
            funds_processed: Vec::new(),
        };

        let db_model = JobExecutionDB::from(execution.clone());
        self.writer
            .exec(move |conn| {
                // REPLACE on (job_name, target_date, fund_name): a rerun for
                // the same key supersedes the prior record.
                diesel::replace_into(job_executions)
                    .values(&db_model)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        Ok(execution)
    }

    async fn complete(&self, execution_id: &str, funds_processed: Vec<String>) -> Result<()> {
        self.finalize(execution_id, JobStatus::Success, None, Some(funds_processed))
            .await
    }

    async fn fail(&self, execution_id: &str, error: &str) -> Result<()> {
        self.finalize(execution_id, JobStatus::Failed, Some(error.to_string()), None)
            .await
    }

    async fn record_skipped(
        &self,
        job: &str,
        date: NaiveDate,
        fund: Option<&str>,
        reason: &str,
    ) -> Result<()> {
        let execution = self.start(job, date, fund).await?;
        self.fail(&execution.id, &format!("skipped: {}", reason))
            .await
    }

    fn find_stale_running(&self, stale_after: Duration) -> Result<Vec<JobExecution>> {
        use crate::schema::job_executions::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let cutoff = (Utc::now() - stale_after)
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let rows = job_executions
            .filter(status.eq(JobStatus::Running.to_string()))
            .filter(started_at.lt(cutoff))
            .order(started_at.asc())
            .load::<JobExecutionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(JobExecution::from).collect())
    }
}

#[derive(Clone)]
pub struct RetryQueueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RetryQueueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Every queued entry, oldest first.
    pub fn pending(&self) -> Result<Vec<RetryEntry>> {
        use crate::schema::retry_queue::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let rows = retry_queue
            .order(created_at.asc())
            .load::<RetryEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(RetryEntry::from).collect())
    }
}

#[async_trait]
impl RetryQueueTrait for RetryQueueRepository {
    async fn add(&self, entry: RetryEntry) -> Result<()> {
        use crate::schema::retry_queue::dsl::*;

        let db_model = RetryEntryDB::from_entry(entry, Utc::now());
        self.writer
            .exec(move |conn| {
                diesel::insert_into(retry_queue)
                    .values(&db_model)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
