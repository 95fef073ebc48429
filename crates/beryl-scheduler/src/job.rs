// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Per-attempt context passed to [`Job::execute`].
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
}

impl JobContext {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self::attempt(job_id, 1)
    }

    pub fn attempt(job_id: impl Into<String>, attempt: u32) -> Self {
        Self {
            job_id: job_id.into(),
            attempt,
            started_at: Utc::now(),
        }
    }
}

/// What a finished run reports back to the registry.
#[derive(Debug)]
pub enum JobResult {
    Success,
    Failure { error: String, retry: bool },
}

/// A unit of background work the registry can schedule and retry.
///
/// `execute` returning `Err` means the job failed before it could classify
/// its own outcome; the registry treats that like a retryable `Failure`.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Stable identifier used in registration and logs.
    fn job_type(&self) -> &'static str;

    async fn execute(&self, ctx: JobContext) -> Result<JobResult>;

    /// Additional attempts allowed after the first failure.
    fn max_retries(&self) -> u32 {
        3
    }

    /// Pause between attempts.
    fn retry_delay(&self) -> Duration {
        Duration::from_secs(60)
    }
}
