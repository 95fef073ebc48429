// SPDX-License-Identifier: GPL-3.0-or-later
pub mod job;
pub mod jobs;
pub mod registry;

use anyhow::Result;
use beryl_application::ReconciliationService;
use beryl_config::AppConfig;
use beryl_infrastructure::TrackRepository;
use registry::JobRegistry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use jobs::ReconcilePendingJob;

pub struct Scheduler {
    config: AppConfig,
    registry: Arc<JobRegistry>,
    service: Arc<ReconciliationService>,
    tracks: Arc<dyn TrackRepository>,
}

impl Scheduler {
    pub fn new(
        config: AppConfig,
        service: Arc<ReconciliationService>,
        tracks: Arc<dyn TrackRepository>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new(config.scheduler.max_concurrent_jobs));
        Self {
            config,
            registry,
            service,
            tracks,
        }
    }

    /// Handle for enqueueing ad-hoc jobs next to the scheduled ones.
    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// Register all background jobs with their schedules
    pub async fn register_jobs(&self) {
        info!(target: "scheduler", "registering background jobs");

        self.registry
            .register(
                "reconcile-pending",
                ReconcilePendingJob::new(self.service.clone(), self.tracks.clone()),
                Schedule::Interval(self.config.scheduler.reconcile_interval_secs),
            )
            .await;

        info!(target: "scheduler", "all jobs registered");
    }

    /// Start the scheduler and return a handle to the background task
    pub fn start(self) -> JoinHandle<Result<()>> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            registry.start().await;
            Ok(())
        })
    }
}

// Re-export key types for convenience
pub use job::{Job, JobContext, JobResult};
pub use registry::Schedule;
