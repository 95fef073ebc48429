// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use beryl_domain::{MetadataCandidate, ProviderKind, SearchMode, Track, TrackId};

// ============================================================================
// Repository Traits
// ============================================================================

/// Track repository over the library's audio files.
#[async_trait::async_trait]
pub trait TrackRepository: Send + Sync {
    /// Insert a new track row; the returned entity carries the assigned id.
    async fn create(&self, track: Track) -> Result<Track>;
    async fn get_by_id(&self, id: TrackId) -> Result<Option<Track>>;
    async fn get_by_path(&self, path: &str) -> Result<Option<Track>>;
    /// Rewrite the track's tag-derived fields (title, artist, album, year,
    /// genre, technical blob) and bump `updated_at`.
    async fn update_tags(&self, track: &Track) -> Result<()>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Track>>;
    async fn list_needing_fixing(&self, limit: i64, offset: i64) -> Result<Vec<Track>>;
    /// Single-row atomic flag update.
    async fn set_needs_fixing(&self, id: TrackId, needs_fixing: bool) -> Result<()>;
    /// Deleting a track cascades to its candidates.
    async fn delete(&self, id: TrackId) -> Result<()>;
    async fn touch(&self, id: TrackId) -> Result<()>;
}

/// A candidate row to be appended; the repository assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub track_id: TrackId,
    pub provider: ProviderKind,
    pub search_mode: SearchMode,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    pub score: f64,
    pub external_id: Option<String>,
    pub raw_data: serde_json::Value,
}

/// Candidate repository; rows are append-only.
#[async_trait::async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn append(&self, candidate: NewCandidate) -> Result<MetadataCandidate>;
    /// All candidates for a track, best score first.
    async fn list_for_track(&self, track_id: TrackId) -> Result<Vec<MetadataCandidate>>;
    async fn list_for_track_by_provider(
        &self,
        track_id: TrackId,
        provider: ProviderKind,
    ) -> Result<Vec<MetadataCandidate>>;
    async fn count_for_track(&self, track_id: TrackId) -> Result<i64>;
}
