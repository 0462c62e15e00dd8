//! Database models for job tracking and the retry queue.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use fundledger_core::jobs::{JobExecution, JobStatus, RetryEntry};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::job_executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct JobExecutionDB {
    pub id: String,
    pub job_name: String,
    pub target_date: String,
    pub fund_name: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub funds_processed: String,
}

impl From<JobExecutionDB> for JobExecution {
    fn from(db: JobExecutionDB) -> Self {
        Self {
            id: db.id.clone(),
            job_name: db.job_name,
            target_date: NaiveDate::parse_from_str(&db.target_date, DATE_FORMAT)
                .unwrap_or_default(),
            fund_name: db.fund_name,
            status: JobStatus::from_str(&db.status).unwrap_or_else(|_| {
                log::error!("Unknown job status '{}' for execution {}", db.status, db.id);
                JobStatus::Failed
            }),
            started_at: parse_timestamp(&db.started_at),
            completed_at: db.completed_at.as_deref().map(parse_timestamp),
            duration_ms: db.duration_ms,
            error_message: db.error_message,
            funds_processed: serde_json::from_str(&db.funds_processed).unwrap_or_default(),
        }
    }
}

impl From<JobExecution> for JobExecutionDB {
    fn from(domain: JobExecution) -> Self {
        Self {
            id: domain.id,
            job_name: domain.job_name,
            target_date: domain.target_date.format(DATE_FORMAT).to_string(),
            fund_name: domain.fund_name,
            status: domain.status.to_string(),
            started_at: domain.started_at.format(TIMESTAMP_FORMAT).to_string(),
            completed_at: domain
                .completed_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            duration_ms: domain.duration_ms,
            error_message: domain.error_message,
            funds_processed: serde_json::to_string(&domain.funds_processed)
                .unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::retry_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct RetryEntryDB {
    pub id: String,
    pub job_name: String,
    pub target_date: String,
    pub entity_id: String,
    pub entity_type: String,
    pub failure_reason: String,
    pub error_message: String,
    pub context: String,
    pub created_at: String,
}

impl From<RetryEntryDB> for RetryEntry {
    fn from(db: RetryEntryDB) -> Self {
        Self {
            job_name: db.job_name,
            target_date: NaiveDate::parse_from_str(&db.target_date, DATE_FORMAT)
                .unwrap_or_default(),
            entity_id: db.entity_id,
            entity_type: db.entity_type,
            failure_reason: db.failure_reason,
            error_message: db.error_message,
            context: serde_json::from_str(&db.context).unwrap_or_default(),
        }
    }
}

impl RetryEntryDB {
    pub fn from_entry(entry: RetryEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_name: entry.job_name,
            target_date: entry.target_date.format(DATE_FORMAT).to_string(),
            entity_id: entry.entity_id,
            entity_type: entry.entity_type,
            failure_reason: entry.failure_reason,
            error_message: entry.error_message,
            context: entry.context.to_string(),
            created_at: now.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(|e| {
            log::error!("Failed to parse stored timestamp '{}': {}", value, e);
            Utc::now()
        })
}
