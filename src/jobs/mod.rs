//! Job Registry
//!
//! Named cron-scheduled tasks registered once at startup. The registry is an
//! owned handle shared through application state; it answers introspection
//! queries and runs jobs on demand while the scheduler fires them on time.

mod registry;
mod submission;

pub use registry::{
    DEFAULT_JOB_TIMEZONE, JobDescriptor, JobRegistry, JobStatus, JobTask, SchedulerHandle,
    job_task,
};
pub use submission::{FETCH_SUBMISSION_JOB, fetch_submissions, register_submission_job};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid schedule '{expression}': {message}")]
    InvalidSchedule { expression: String, message: String },

    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Job already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Job {name} failed: {message}")]
    TaskFailed { name: String, message: String },
}
