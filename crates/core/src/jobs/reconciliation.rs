use chrono::Duration;
use log::{info, warn};
use std::sync::Arc;

use super::job_model::RetryEntry;
use super::job_traits::{JobTrackerTrait, RetryQueueTrait};
use crate::errors::Result;

/// Startup repair of executions interrupted by a crash or container restart.
///
/// A record stuck in Running past the liveness threshold means the process
/// died mid-run and the day's snapshot may be a partial write. Each such
/// record is finalized as Failed and queued for retry so the next scheduled
/// tick repairs it; no step downstream assumes the previous run completed.
pub async fn reconcile_interrupted_jobs(
    tracker: &Arc<dyn JobTrackerTrait>,
    retry_queue: &Arc<dyn RetryQueueTrait>,
    stale_after: Duration,
) -> Result<usize> {
    let stale = tracker.find_stale_running(stale_after)?;
    if stale.is_empty() {
        return Ok(0);
    }

    warn!(
        "Found {} job execution(s) still running at startup; treating as crashed",
        stale.len()
    );

    for execution in &stale {
        tracker
            .fail(&execution.id, "interrupted by restart")
            .await?;
        retry_queue
            .add(RetryEntry {
                job_name: execution.job_name.clone(),
                target_date: execution.target_date,
                entity_id: execution.fund_name.clone(),
                entity_type: "job_execution".to_string(),
                failure_reason: "interrupted by restart".to_string(),
                error_message: format!(
                    "execution {} was still running at startup",
                    execution.id
                ),
                context: serde_json::json!({
                    "startedAt": execution.started_at,
                    "fundName": execution.fund_name,
                }),
            })
            .await?;
        info!(
            "Requeued {} for {} (fund '{}') after interrupted run",
            execution.job_name, execution.target_date, execution.fund_name
        );
    }

    Ok(stale.len())
}
