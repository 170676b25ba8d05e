use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    error::AppResult,
    jobs::{FETCH_SUBMISSION_JOB, JobDescriptor},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub message: &'static str,
    pub jobs: Vec<JobDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct JobRunResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub job: JobDescriptor,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub output: JsonValue,
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<JobsResponse> {
    Json(JobsResponse {
        message: "success",
        jobs: state.jobs.list().await,
    })
}

pub async fn run_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<JobRunResponse>> {
    state.jobs.run_now(&name).await?;
    let job = state.jobs.describe(&name).await?;
    Ok(Json(JobRunResponse {
        status: "success",
        message: "Job executed successfully",
        job,
    }))
}

/// Runs the submission job inline and returns what it produced.
pub async fn job_submission(
    State(state): State<AppState>,
) -> AppResult<Json<SubmissionResponse>> {
    let output = state.jobs.run_now(FETCH_SUBMISSION_JOB).await?;
    Ok(Json(SubmissionResponse {
        status: "success",
        message: "Job executed successfully",
        output,
    }))
}
