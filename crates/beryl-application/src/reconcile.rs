// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconciliation passes: derive a search key, query a provider, score and
//! persist whatever comes back.
//!
//! Provider failures never abort a pass (providers degrade to empty result
//! lists); persistence failures do, so the surrounding job can retry.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use beryl_domain::{
    CandidatesStored, CandidatesStoredPayload, DomainEvent, ProviderKind, SearchMode, Track,
    TrackId,
};
use beryl_infrastructure::{CandidateRepository, NewCandidate, TrackRepository};
use beryl_providers::{CandidateResult, MetadataProvider, ProviderRegistry, SearchParams};
use tracing::{debug, info};

use crate::events::EventPublisher;
use crate::scoring;
use crate::search_keys::SearchKeyExtractor;

/// Which providers a reconciliation request fans out over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPolicy {
    /// The configured default provider.
    Default,
    Named(ProviderKind),
    /// Every provider whose credentials are configured.
    All,
}

/// Outcome of a single provider pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Candidates were scored and appended.
    Stored(usize),
    /// The search ran (including the filename retry) but nothing came back.
    NoResult,
    /// No usable search key could be derived from tags or filename.
    NoSearchKey,
}

pub struct ReconciliationService {
    registry: Arc<ProviderRegistry>,
    tracks: Arc<dyn TrackRepository>,
    candidates: Arc<dyn CandidateRepository>,
    events: Arc<dyn EventPublisher>,
}

impl ReconciliationService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        tracks: Arc<dyn TrackRepository>,
        candidates: Arc<dyn CandidateRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry,
            tracks,
            candidates,
            events,
        }
    }

    /// Run metadata-mode passes for a track over the providers selected by
    /// `policy`. Each provider gets at most one filename-mode retry when its
    /// metadata search comes back empty.
    pub async fn reconcile(&self, track_id: TrackId, policy: ProviderPolicy) -> Result<()> {
        let track = self.load_track(track_id).await?;

        let providers: Vec<Arc<dyn MetadataProvider>> = match policy {
            ProviderPolicy::Default => {
                let kind = self.registry.default_kind();
                vec![self
                    .registry
                    .get(kind)
                    .with_context(|| format!("no provider registered for {kind}"))?]
            }
            ProviderPolicy::Named(kind) => {
                vec![self
                    .registry
                    .get(kind)
                    .with_context(|| format!("no provider registered for {kind}"))?]
            }
            ProviderPolicy::All => self.registry.available(),
        };

        for provider in providers {
            let outcome = self.metadata_pass(&track, provider.as_ref()).await?;
            debug!(
                target: "reconcile",
                %track_id,
                provider = %provider.kind(),
                ?outcome,
                "metadata pass finished"
            );
        }

        Ok(())
    }

    /// Run a single filename-mode pass against one provider.
    pub async fn reconcile_from_filename(
        &self,
        track_id: TrackId,
        kind: ProviderKind,
    ) -> Result<()> {
        let track = self.load_track(track_id).await?;
        let provider = self
            .registry
            .get(kind)
            .with_context(|| format!("no provider registered for {kind}"))?;

        let outcome = self.filename_pass(&track, provider.as_ref()).await?;
        debug!(
            target: "reconcile",
            %track_id,
            provider = %kind,
            ?outcome,
            "filename pass finished"
        );
        Ok(())
    }

    async fn load_track(&self, track_id: TrackId) -> Result<Track> {
        match self.tracks.get_by_id(track_id).await? {
            Some(track) => Ok(track),
            None => bail!("track {track_id} not found"),
        }
    }

    async fn metadata_pass(
        &self,
        track: &Track,
        provider: &dyn MetadataProvider,
    ) -> Result<PassOutcome> {
        let Some(params) = SearchKeyExtractor::from_metadata(track) else {
            info!(
                target: "reconcile",
                track_id = %track.id,
                provider = %provider.kind(),
                "no usable search key, skipping"
            );
            return Ok(PassOutcome::NoSearchKey);
        };

        let results = provider.search(&params).await;
        if !results.is_empty() {
            let stored = self
                .store_candidates(track, provider.kind(), SearchMode::Metadata, results)
                .await?;
            return Ok(PassOutcome::Stored(stored));
        }

        info!(
            target: "reconcile",
            track_id = %track.id,
            provider = %provider.kind(),
            ?params,
            "no results for metadata search, retrying by filename"
        );

        self.filename_pass(track, provider).await
    }

    async fn filename_pass(
        &self,
        track: &Track,
        provider: &dyn MetadataProvider,
    ) -> Result<PassOutcome> {
        let Some(params) = SearchKeyExtractor::from_filename(track) else {
            info!(
                target: "reconcile",
                track_id = %track.id,
                file_path = %track.file_path,
                "filename too short for search, skipping"
            );
            return Ok(PassOutcome::NoSearchKey);
        };

        let results = provider.search(&params).await;
        if results.is_empty() {
            info!(
                target: "reconcile",
                track_id = %track.id,
                provider = %provider.kind(),
                ?params,
                "no results for filename search"
            );
            return Ok(PassOutcome::NoResult);
        }

        let stored = self
            .store_candidates(track, provider.kind(), SearchMode::Filename, results)
            .await?;
        Ok(PassOutcome::Stored(stored))
    }

    async fn store_candidates(
        &self,
        track: &Track,
        provider: ProviderKind,
        search_mode: SearchMode,
        results: Vec<CandidateResult>,
    ) -> Result<usize> {
        let mut stored = 0;
        let mut exact_match = false;

        for result in results {
            let score = scoring::score(track, &result);
            exact_match = exact_match || is_exact_match(track, &result);

            self.candidates
                .append(NewCandidate {
                    track_id: track.id,
                    provider,
                    search_mode,
                    title: result.title,
                    artist: result.artist,
                    album: result.album,
                    release_year: result.release_year,
                    score,
                    external_id: result.external_id,
                    raw_data: result.raw_data,
                })
                .await
                .context("failed to append metadata candidate")?;
            stored += 1;
        }

        if exact_match && track.needs_fixing {
            info!(
                target: "reconcile",
                track_id = %track.id,
                %provider,
                "exact candidate match, clearing needs_fixing"
            );
            self.tracks.set_needs_fixing(track.id, false).await?;
        }

        if stored > 0 {
            let event: CandidatesStored = DomainEvent::new(
                "track.candidates.stored",
                CandidatesStoredPayload {
                    track_id: track.id,
                    provider,
                    search_mode,
                    stored,
                },
            );
            self.events.publish(&event);
        }

        Ok(stored)
    }
}

/// A candidate counts as an exact match only when the track has all four
/// identifying fields and each one agrees: normalized string equality for
/// title, artist, and album, plain equality for year.
fn is_exact_match(track: &Track, candidate: &CandidateResult) -> bool {
    let fields = [
        (&track.title, &candidate.title),
        (&track.artist, &candidate.artist),
        (&track.album, &candidate.album),
    ];

    for (left, right) in fields {
        let (Some(left), Some(right)) = (left.as_deref(), right.as_deref()) else {
            return false;
        };
        let left = scoring::normalize(left);
        if left.is_empty() || left != scoring::normalize(right) {
            return false;
        }
    }

    matches!(
        (track.release_year, candidate.release_year),
        (Some(left), Some(right)) if left == right
    )
}
