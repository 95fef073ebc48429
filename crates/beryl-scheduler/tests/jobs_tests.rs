// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use beryl_application::{InMemoryEventBus, ProviderPolicy, ReconciliationService};
use beryl_domain::{ProviderKind, Track, TrackId};
use beryl_infrastructure::{
    connect_in_memory, CandidateRepository, SqliteCandidateRepository, SqliteTrackRepository,
    TrackRepository,
};
use beryl_providers::{CandidateResult, MetadataProvider, ProviderRegistry, SearchParams};
use beryl_scheduler::jobs::{FilenameSearchJob, ReconcilePendingJob, ReconcileTrackJob};
use beryl_scheduler::{Job, JobContext, JobResult};
use serde_json::Value;

struct EchoProvider;

#[async_trait::async_trait]
impl MetadataProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deezer
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult> {
        vec![CandidateResult {
            title: params.title.clone(),
            artist: params.artist.clone(),
            album: None,
            release_year: None,
            provider_score: 100.0,
            external_id: Some("1".to_string()),
            raw_data: Value::Null,
        }]
    }
}

struct Env {
    service: Arc<ReconciliationService>,
    tracks: Arc<SqliteTrackRepository>,
    candidates: Arc<SqliteCandidateRepository>,
}

async fn env() -> Env {
    let pool = connect_in_memory().await.expect("pool");
    let tracks = Arc::new(SqliteTrackRepository::new(pool.clone()));
    let candidates = Arc::new(SqliteCandidateRepository::new(pool));
    let registry = Arc::new(ProviderRegistry::with_providers(
        ProviderKind::Deezer,
        vec![Arc::new(EchoProvider) as Arc<dyn MetadataProvider>],
    ));

    let service = Arc::new(ReconciliationService::new(
        registry,
        tracks.clone(),
        candidates.clone(),
        Arc::new(InMemoryEventBus::new()),
    ));

    Env {
        service,
        tracks,
        candidates,
    }
}

async fn seeded_track(env: &Env) -> Track {
    let mut track = Track::new("/music/Avicii - Edom.mp3");
    track.title = Some("Edom".to_string());
    track.artist = Some("Avicii".to_string());
    env.tracks.create(track).await.expect("insert")
}

#[tokio::test]
async fn reconcile_track_job_stores_candidates() {
    let env = env().await;
    let track = seeded_track(&env).await;

    let job = ReconcileTrackJob::new(env.service.clone(), track.id, ProviderPolicy::Default);
    let result = job
        .execute(JobContext::new("test"))
        .await
        .expect("execute should not error");

    assert!(matches!(result, JobResult::Success));
    assert_eq!(env.candidates.count_for_track(track.id).await.unwrap(), 1);
}

#[tokio::test]
async fn reconcile_track_job_reports_missing_track_as_retryable() {
    let env = env().await;

    let job = ReconcileTrackJob::new(env.service.clone(), TrackId(404), ProviderPolicy::Default);
    let result = job.execute(JobContext::new("test")).await.unwrap();

    assert!(matches!(result, JobResult::Failure { retry: true, .. }));
}

#[tokio::test]
async fn filename_search_job_stores_filename_candidates() {
    let env = env().await;
    let track = seeded_track(&env).await;

    let job = FilenameSearchJob::new(env.service.clone(), track.id, ProviderKind::Deezer);
    let result = job.execute(JobContext::new("test")).await.unwrap();

    assert!(matches!(result, JobResult::Success));
    let stored = env.candidates.list_for_track(track.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].search_mode.as_str(), "filename");
}

#[tokio::test]
async fn pending_sweep_covers_every_flagged_track() {
    let env = env().await;
    let first = seeded_track(&env).await;

    let mut second = Track::new("/music/Daft Punk - Around the World.mp3");
    second.title = Some("Around the World".to_string());
    second.artist = Some("Daft Punk".to_string());
    let second = env.tracks.create(second).await.expect("insert");

    // A track already in good shape is skipped by the sweep
    let mut fixed = Track::new("/music/fixed.mp3");
    fixed.needs_fixing = false;
    let fixed = env.tracks.create(fixed).await.expect("insert");

    let job = ReconcilePendingJob::new(env.service.clone(), env.tracks.clone());
    let result = job.execute(JobContext::new("test")).await.unwrap();

    assert!(matches!(result, JobResult::Success));
    assert!(env.candidates.count_for_track(first.id).await.unwrap() > 0);
    assert!(env.candidates.count_for_track(second.id).await.unwrap() > 0);
    assert_eq!(env.candidates.count_for_track(fixed.id).await.unwrap(), 0);
}
