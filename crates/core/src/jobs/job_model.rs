use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Lifecycle state of a tracked job execution.
///
/// An execution stuck in `Running` past the liveness threshold is treated as
/// evidence of a crash and converted to `Failed` at next startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILED" => Ok(JobStatus::Failed),
            other => {
                Err(ValidationError::InvalidInput(format!("Unknown job status: {}", other)).into())
            }
        }
    }
}

/// One tracked run of a job for a target date.
///
/// Unique on (job_name, target_date, fund_name); `fund_name` is the empty
/// string when a run covers all funds. Every run writes a terminal status so
/// operational tooling can always tell "ran and succeeded" from "never ran".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecution {
    pub id: String,
    pub job_name: String,
    pub target_date: NaiveDate,
    pub fund_name: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub funds_processed: Vec<String>,
}

/// A failed unit of work queued for reprocessing, with enough context to
/// re-drive just that unit rather than the whole job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryEntry {
    pub job_name: String,
    pub target_date: NaiveDate,
    pub entity_id: String,
    pub entity_type: String,
    pub failure_reason: String,
    pub error_message: String,
    pub context: serde_json::Value,
}

/// Observable outcome of a single-date sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub target_date: Option<NaiveDate>,
    /// True when the run never started because another run held the lock
    /// or the target date was not a trading day.
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub funds_processed: Vec<String>,
    pub funds_skipped: Vec<String>,
    pub tickers_priced: usize,
    pub tickers_failed: usize,
    /// Conversions that used the constant fallback rate instead of a real
    /// lookup. Non-zero values indicate degraded precision, not failure.
    pub fallback_rates_used: usize,
}

impl SyncReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        SyncReport {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Observable outcome of a date-range backfill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub funds_processed: Vec<String>,
    pub missing_days_found: usize,
    pub rows_written: usize,
    pub chunks_failed: usize,
    /// Days whose read-back validation confirmed rows for every fund.
    pub days_confirmed: usize,
    pub days_failed: usize,
    pub fallback_rates_used: usize,
}

impl BackfillReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        BackfillReport {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}
