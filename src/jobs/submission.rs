use super::{JobError, JobRegistry, job_task};
use anyhow::Context;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

pub const FETCH_SUBMISSION_JOB: &str = "fetch-submission";

const SUBMISSION_MESSAGE: &str = "This is from cron job scheduler";

/// Reports the current job table.
pub async fn fetch_submissions(registry: &JobRegistry) -> JsonValue {
    let jobs = registry.list().await;
    info!(jobs = jobs.len(), "{SUBMISSION_MESSAGE}");
    json!({
        "data": SUBMISSION_MESSAGE,
        "jobs": jobs,
    })
}

pub async fn register_submission_job(
    registry: &Arc<JobRegistry>,
    schedule: &str,
) -> Result<(), JobError> {
    let weak = Arc::downgrade(registry);
    let task = job_task(move || {
        let weak = weak.clone();
        async move {
            let registry = weak.upgrade().context("job registry has been dropped")?;
            Ok::<_, anyhow::Error>(fetch_submissions(&registry).await)
        }
    });
    registry.register(FETCH_SUBMISSION_JOB, schedule, task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submission_job_reports_job_table() {
        let registry = Arc::new(JobRegistry::new());
        register_submission_job(&registry, "0 59 23 * * *")
            .await
            .unwrap();

        let output = registry.run_now(FETCH_SUBMISSION_JOB).await.unwrap();
        assert_eq!(output["data"], SUBMISSION_MESSAGE);
        assert_eq!(output["jobs"][0]["name"], FETCH_SUBMISSION_JOB);
        assert_eq!(output["jobs"][0]["cronTime"], "0 59 23 * * *");
        assert!(output["jobs"][0]["lastExecuted"].is_string());
    }
}
