// SPDX-License-Identifier: GPL-3.0-or-later

//! Interval-driven job execution with bounded concurrency.
//!
//! Each registered job gets its own driver task; a shared semaphore caps how
//! many jobs run at once across drivers. A job never overlaps itself: the
//! driver runs one attempt sequence to completion before waiting for the
//! next tick.

use crate::job::{Job, JobContext, JobResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, error, info, warn};

/// When a registered job runs.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Every N seconds; the first tick fires immediately.
    Interval(u64),
    /// A single run as soon as a concurrency slot frees up.
    Once,
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, (Arc<dyn Job>, Schedule)>>,
    slots: Arc<Semaphore>,
}

impl JobRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            slots: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn register(
        &self,
        job_id: impl Into<String>,
        job: impl Job + 'static,
        schedule: Schedule,
    ) {
        let job_id = job_id.into();
        info!(
            target: "registry",
            %job_id,
            job_type = job.job_type(),
            ?schedule,
            "job registered"
        );
        self.jobs
            .write()
            .await
            .insert(job_id, (Arc::new(job), schedule));
    }

    /// Spawn one driver task per registered job.
    pub async fn start(self: Arc<Self>) {
        let jobs = self.jobs.read().await;
        info!(
            target: "registry",
            jobs = jobs.len(),
            slots = self.slots.available_permits(),
            "starting job registry"
        );

        for (job_id, (job, schedule)) in jobs.iter() {
            tokio::spawn(Self::drive(
                job_id.clone(),
                job.clone(),
                schedule.clone(),
                self.slots.clone(),
            ));
        }
    }

    async fn drive(job_id: String, job: Arc<dyn Job>, schedule: Schedule, slots: Arc<Semaphore>) {
        match schedule {
            Schedule::Once => Self::run_guarded(&job_id, job.as_ref(), &slots).await,
            Schedule::Interval(seconds) => {
                let mut ticker = interval(Duration::from_secs(seconds));
                loop {
                    ticker.tick().await;
                    Self::run_guarded(&job_id, job.as_ref(), &slots).await;
                }
            }
        }
    }

    async fn run_guarded(job_id: &str, job: &dyn Job, slots: &Semaphore) {
        // acquire fails only when the semaphore is closed
        let Ok(_permit) = slots.acquire().await else {
            return;
        };
        Self::run(job_id, job).await;
    }

    /// One attempt sequence: the initial run plus up to `max_retries` retries
    /// separated by the job's retry delay.
    async fn run(job_id: &str, job: &dyn Job) {
        let attempts = job.max_retries() + 1;

        for attempt in 1..=attempts {
            let ctx = JobContext::attempt(job_id, attempt);
            debug!(
                target: "registry",
                %job_id,
                job_type = job.job_type(),
                attempt,
                attempts,
                "running job"
            );

            let retry = match job.execute(ctx).await {
                Ok(JobResult::Success) => {
                    debug!(target: "registry", %job_id, attempt, "job finished");
                    return;
                }
                Ok(JobResult::Failure { error, retry }) => {
                    warn!(target: "registry", %job_id, %error, retry, attempt, "job failed");
                    retry
                }
                Err(error) => {
                    warn!(target: "registry", %job_id, %error, attempt, "job errored");
                    true
                }
            };

            if !retry || attempt == attempts {
                error!(
                    target: "registry",
                    %job_id,
                    job_type = job.job_type(),
                    attempts = attempt,
                    "giving up on job"
                );
                return;
            }

            sleep(job.retry_delay()).await;
        }
    }
}
