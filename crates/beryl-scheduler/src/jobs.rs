// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconciliation jobs.
//!
//! Provider failures are swallowed inside the passes (they degrade to empty
//! result lists), so a job failure here means persistence trouble, which is
//! the retryable class.

use crate::job::{Job, JobContext, JobResult};
use anyhow::Result;
use beryl_application::{ProviderPolicy, ReconciliationService};
use beryl_domain::{ProviderKind, TrackId};
use beryl_infrastructure::TrackRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on tracks swept per pending-reconcile run.
const PENDING_SWEEP_LIMIT: i64 = 500;

/// Reconcile one track using metadata-derived search keys
pub struct ReconcileTrackJob {
    service: Arc<ReconciliationService>,
    track_id: TrackId,
    policy: ProviderPolicy,
}

impl ReconcileTrackJob {
    pub fn new(
        service: Arc<ReconciliationService>,
        track_id: TrackId,
        policy: ProviderPolicy,
    ) -> Self {
        Self {
            service,
            track_id,
            policy,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReconcileTrackJob {
    fn job_type(&self) -> &'static str {
        "reconcile_track"
    }

    async fn execute(&self, ctx: JobContext) -> Result<JobResult> {
        info!(
            target: "jobs",
            job_id = %ctx.job_id,
            track_id = %self.track_id,
            policy = ?self.policy,
            "reconciling track"
        );

        match self.service.reconcile(self.track_id, self.policy).await {
            Ok(()) => Ok(JobResult::Success),
            Err(error) => Ok(JobResult::Failure {
                error: error.to_string(),
                retry: true,
            }),
        }
    }

    fn max_retries(&self) -> u32 {
        2
    }
}

/// Reconcile one track using only its cleaned filename
pub struct FilenameSearchJob {
    service: Arc<ReconciliationService>,
    track_id: TrackId,
    provider: ProviderKind,
}

impl FilenameSearchJob {
    pub fn new(
        service: Arc<ReconciliationService>,
        track_id: TrackId,
        provider: ProviderKind,
    ) -> Self {
        Self {
            service,
            track_id,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl Job for FilenameSearchJob {
    fn job_type(&self) -> &'static str {
        "filename_search"
    }

    async fn execute(&self, ctx: JobContext) -> Result<JobResult> {
        info!(
            target: "jobs",
            job_id = %ctx.job_id,
            track_id = %self.track_id,
            provider = %self.provider,
            "searching by filename"
        );

        match self
            .service
            .reconcile_from_filename(self.track_id, self.provider)
            .await
        {
            Ok(()) => Ok(JobResult::Success),
            Err(error) => Ok(JobResult::Failure {
                error: error.to_string(),
                retry: true,
            }),
        }
    }

    fn max_retries(&self) -> u32 {
        2
    }
}

/// Periodic sweep over every track still flagged `needs_fixing`, fanning out
/// across all configured providers.
pub struct ReconcilePendingJob {
    service: Arc<ReconciliationService>,
    tracks: Arc<dyn TrackRepository>,
}

impl ReconcilePendingJob {
    pub fn new(service: Arc<ReconciliationService>, tracks: Arc<dyn TrackRepository>) -> Self {
        Self { service, tracks }
    }
}

#[async_trait::async_trait]
impl Job for ReconcilePendingJob {
    fn job_type(&self) -> &'static str {
        "reconcile_pending"
    }

    async fn execute(&self, ctx: JobContext) -> Result<JobResult> {
        let pending = self
            .tracks
            .list_needing_fixing(PENDING_SWEEP_LIMIT, 0)
            .await?;

        info!(
            target: "jobs",
            job_id = %ctx.job_id,
            pending = pending.len(),
            "sweeping tracks flagged needs_fixing"
        );

        let mut failures = 0usize;
        for track in &pending {
            if let Err(error) = self.service.reconcile(track.id, ProviderPolicy::All).await {
                warn!(
                    target: "jobs",
                    job_id = %ctx.job_id,
                    track_id = %track.id,
                    %error,
                    "pending reconcile failed for track"
                );
                failures += 1;
            }
        }

        if failures > 0 {
            return Ok(JobResult::Failure {
                error: format!("{failures} of {} tracks failed", pending.len()),
                retry: true,
            });
        }

        Ok(JobResult::Success)
    }

    fn max_retries(&self) -> u32 {
        1
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_secs(300)
    }
}
