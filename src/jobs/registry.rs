use super::JobError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub type JobTask =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<JsonValue>> + Send + Sync + 'static>;

/// Wraps an async closure as a [`JobTask`].
pub fn job_task<F, Fut>(f: F) -> JobTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub name: String,
    pub cron_time: String,
    pub last_executed: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub next_execution: Option<DateTime<Utc>>,
}

struct JobEntry {
    expression: String,
    schedule: Schedule,
    task: JobTask,
    last_executed: Option<DateTime<Utc>>,
    running: bool,
}

/// Zone schedules are evaluated in unless one is given.
pub const DEFAULT_JOB_TIMEZONE: Tz = chrono_tz::Europe::London;

pub struct JobRegistry {
    timezone: Tz,
    jobs: RwLock<BTreeMap<String, JobEntry>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_timezone(DEFAULT_JOB_TIMEZONE)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cron fields are read as wall-clock time in `timezone`; reported
    /// instants stay in UTC.
    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            timezone,
            jobs: RwLock::new(BTreeMap::new()),
        }
    }

    fn upcoming(&self, schedule: &Schedule) -> Option<DateTime<Utc>> {
        schedule
            .upcoming(self.timezone)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    /// Adds a job under `name`. The schedule uses six fields, seconds first.
    pub async fn register(
        &self,
        name: impl Into<String>,
        expression: &str,
        task: JobTask,
    ) -> Result<(), JobError> {
        let name = name.into();
        let schedule = Schedule::from_str(expression).map_err(|err| JobError::InvalidSchedule {
            expression: expression.to_string(),
            message: err.to_string(),
        })?;

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&name) {
            return Err(JobError::AlreadyRegistered(name));
        }

        info!(job = %name, schedule = expression, timezone = %self.timezone, "job registered");
        jobs.insert(
            name,
            JobEntry {
                expression: expression.to_string(),
                schedule,
                task,
                last_executed: None,
                running: false,
            },
        );
        Ok(())
    }

    pub async fn list(&self) -> Vec<JobDescriptor> {
        let jobs = self.jobs.read().await;
        jobs.iter()
            .map(|(name, entry)| JobDescriptor {
                name: name.clone(),
                cron_time: entry.expression.clone(),
                last_executed: entry.last_executed,
                status: if entry.running {
                    JobStatus::Running
                } else {
                    JobStatus::Stopped
                },
                next_execution: self.upcoming(&entry.schedule),
            })
            .collect()
    }

    pub async fn describe(&self, name: &str) -> Result<JobDescriptor, JobError> {
        self.list()
            .await
            .into_iter()
            .find(|job| job.name == name)
            .ok_or_else(|| JobError::UnknownJob(name.to_string()))
    }

    /// Runs the job immediately. `lastExecuted` is stamped before the task
    /// starts; overlapping runs are not serialised.
    pub async fn run_now(&self, name: &str) -> Result<JsonValue, JobError> {
        let task = {
            let mut jobs = self.jobs.write().await;
            let entry = jobs
                .get_mut(name)
                .ok_or_else(|| JobError::UnknownJob(name.to_string()))?;
            entry.last_executed = Some(Utc::now());
            entry.task.clone()
        };

        debug!(job = name, "job started");
        task().await.map_err(|err| {
            error!(job = name, error = %format!("{err:#}"), "job failed");
            JobError::TaskFailed {
                name: name.to_string(),
                message: err.to_string(),
            }
        })
    }

    async fn next_fire(&self, name: &str) -> Option<DateTime<Utc>> {
        let jobs = self.jobs.read().await;
        self.upcoming(&jobs.get(name)?.schedule)
    }

    async fn set_running(&self, running: bool) {
        let mut jobs = self.jobs.write().await;
        for entry in jobs.values_mut() {
            entry.running = running;
        }
    }

    /// Starts one timer loop per registered job.
    pub async fn start(self: &Arc<Self>) -> SchedulerHandle {
        let names: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        self.set_running(true).await;

        let loops = names
            .into_iter()
            .map(|name| {
                let registry = Arc::clone(self);
                tokio::spawn(async move { registry.timer_loop(name).await })
            })
            .collect();

        SchedulerHandle {
            registry: Arc::clone(self),
            loops,
        }
    }

    async fn timer_loop(&self, name: String) {
        while let Some(next) = self.next_fire(&name).await {
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            match self.run_now(&name).await {
                Ok(_) => info!(job = %name, "scheduled job completed"),
                Err(err) => error!(job = %name, error = %err, "scheduled job failed"),
            }
        }
        info!(job = %name, "schedule has no further fire times");
    }
}

/// Keeps the timer loops alive; [`SchedulerHandle::stop`] ends them.
pub struct SchedulerHandle {
    registry: Arc<JobRegistry>,
    loops: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        for handle in &self.loops {
            handle.abort();
        }
        self.registry.set_running(false).await;
        info!("job scheduler stopped");
    }
}
