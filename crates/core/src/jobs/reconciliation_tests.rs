use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use super::job_test_support::*;
use crate::constants::{PRICE_SYNC_JOB_NAME, STALE_RUNNING_THRESHOLD_MINUTES};
use crate::jobs::{reconcile_interrupted_jobs, JobStatus, JobTrackerTrait, RetryQueueTrait};

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn threshold() -> Duration {
    Duration::minutes(STALE_RUNNING_THRESHOLD_MINUTES)
}

#[tokio::test]
async fn test_stale_running_execution_is_failed_and_requeued() {
    let tracker = Arc::new(MockJobTracker::default());
    let retry_queue = Arc::new(MockRetryQueue::default());
    let stale_id = tracker.seed_running(
        PRICE_SYNC_JOB_NAME,
        jan(10),
        "FUND1 Fund",
        Duration::hours(5),
    );

    let tracker_dyn: Arc<dyn JobTrackerTrait> = tracker.clone();
    let queue_dyn: Arc<dyn RetryQueueTrait> = retry_queue.clone();
    let repaired = reconcile_interrupted_jobs(&tracker_dyn, &queue_dyn, threshold())
        .await
        .unwrap();

    assert_eq!(repaired, 1);
    let executions = tracker.executions_for(PRICE_SYNC_JOB_NAME);
    assert_eq!(executions[0].id, stale_id);
    assert_eq!(executions[0].status, JobStatus::Failed);
    assert_eq!(
        executions[0].error_message.as_deref(),
        Some("interrupted by restart")
    );

    let entries = retry_queue.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].job_name, PRICE_SYNC_JOB_NAME);
    assert_eq!(entries[0].target_date, jan(10));
    assert_eq!(entries[0].entity_type, "job_execution");
    assert_eq!(entries[0].entity_id, "FUND1 Fund");
}

#[tokio::test]
async fn test_fresh_running_execution_is_untouched() {
    let tracker = Arc::new(MockJobTracker::default());
    let retry_queue = Arc::new(MockRetryQueue::default());
    tracker.seed_running(
        PRICE_SYNC_JOB_NAME,
        jan(10),
        "FUND1 Fund",
        Duration::minutes(10),
    );

    let tracker_dyn: Arc<dyn JobTrackerTrait> = tracker.clone();
    let queue_dyn: Arc<dyn RetryQueueTrait> = retry_queue.clone();
    let repaired = reconcile_interrupted_jobs(&tracker_dyn, &queue_dyn, threshold())
        .await
        .unwrap();

    assert_eq!(repaired, 0);
    let executions = tracker.executions_for(PRICE_SYNC_JOB_NAME);
    assert_eq!(executions[0].status, JobStatus::Running);
    assert!(retry_queue.entries().is_empty());
}

#[tokio::test]
async fn test_terminal_executions_are_never_requeued() {
    let tracker = Arc::new(MockJobTracker::default());
    let retry_queue = Arc::new(MockRetryQueue::default());
    let id = tracker.seed_running(
        PRICE_SYNC_JOB_NAME,
        jan(10),
        "FUND1 Fund",
        Duration::hours(5),
    );
    tracker.fail(&id, "real failure").await.unwrap();

    let tracker_dyn: Arc<dyn JobTrackerTrait> = tracker.clone();
    let queue_dyn: Arc<dyn RetryQueueTrait> = retry_queue.clone();
    let repaired = reconcile_interrupted_jobs(&tracker_dyn, &queue_dyn, threshold())
        .await
        .unwrap();

    assert_eq!(repaired, 0);
    assert!(retry_queue.entries().is_empty());
}
