// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub i64);

impl TrackId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub i64);

impl CandidateId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External metadata lookup services supported by the reconciliation
/// pipeline. The lowercase `Display` form is the stable identifier used in
/// configuration, persistence, and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    MusicBrainz,
    Deezer,
    Spotify,
    LastFm,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::MusicBrainz,
        ProviderKind::Deezer,
        ProviderKind::Spotify,
        ProviderKind::LastFm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MusicBrainz => "musicbrainz",
            ProviderKind::Deezer => "deezer",
            ProviderKind::Spotify => "spotify",
            ProviderKind::LastFm => "lastfm",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "musicbrainz" => Ok(ProviderKind::MusicBrainz),
            "deezer" => Ok(ProviderKind::Deezer),
            "spotify" => Ok(ProviderKind::Spotify),
            "lastfm" => Ok(ProviderKind::LastFm),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl std::fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown metadata provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

/// Whether a search attempt used the track's stored metadata or
/// filename-derived heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Metadata,
    Filename,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Metadata => "metadata",
            SearchMode::Filename => "filename",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" => Ok(SearchMode::Metadata),
            "filename" => Ok(SearchMode::Filename),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// One audio file known to the library, with whatever metadata has been
/// extracted from its tags so far.
///
/// `needs_fixing` starts true and is cleared only when a reconciliation pass
/// finds a candidate matching title, artist, album, and year exactly, or when
/// an operator clears it by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub file_path: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    pub genre: Option<String>,
    /// Free-form technical metadata (bitrate, duration, container...) written
    /// by tag extraction.
    pub technical: serde_json::Value,
    pub needs_fixing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    pub fn new(file_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TrackId(0),
            file_path: file_path.into(),
            title: None,
            artist: None,
            album: None,
            release_year: None,
            genre: None,
            technical: serde_json::Value::Null,
            needs_fixing: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// File stem of the backing file, used for filename-derived search keys.
    pub fn file_stem(&self) -> Option<&str> {
        Path::new(&self.file_path).file_stem().and_then(|s| s.to_str())
    }

    /// True when both title and artist are missing, i.e. metadata-based
    /// search keys cannot be derived.
    pub fn lacks_identifying_tags(&self) -> bool {
        is_blank(&self.title) && is_blank(&self.artist)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// One externally-sourced guess about a track's true metadata, persisted
/// after every search pass. Rows accumulate; they are never mutated and only
/// disappear when the owning track is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCandidate {
    pub id: CandidateId,
    pub track_id: TrackId,
    pub provider: ProviderKind,
    pub search_mode: SearchMode,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    /// Weighted similarity against the track's metadata, 0..=100, two
    /// decimals.
    pub score: f64,
    pub external_id: Option<String>,
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Domain Events
// ============================================================================

/// Generic envelope for domain events published on the in-process bus.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent<T> {
    pub name: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: &'static str, payload: T) -> Self {
        Self {
            name,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Published after a reconciliation pass stores candidates for a track.
#[derive(Debug, Clone, Serialize)]
pub struct CandidatesStoredPayload {
    pub track_id: TrackId,
    pub provider: ProviderKind,
    pub search_mode: SearchMode,
    pub stored: usize,
}

pub type CandidatesStored = DomainEvent<CandidatesStoredPayload>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_round_trips_through_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("napster".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn search_mode_round_trips_through_str() {
        assert_eq!("metadata".parse::<SearchMode>().unwrap(), SearchMode::Metadata);
        assert_eq!("filename".parse::<SearchMode>().unwrap(), SearchMode::Filename);
        assert!("fingerprint".parse::<SearchMode>().is_err());
    }

    #[test]
    fn new_track_needs_fixing() {
        let track = Track::new("/music/unknown.mp3");
        assert!(track.needs_fixing);
        assert!(track.lacks_identifying_tags());
        assert_eq!(track.file_stem(), Some("unknown"));
    }

    #[test]
    fn blank_tags_count_as_missing() {
        let mut track = Track::new("/music/a.mp3");
        track.title = Some("  ".to_string());
        track.artist = None;
        assert!(track.lacks_identifying_tags());

        track.artist = Some("Avicii".to_string());
        assert!(!track.lacks_identifying_tags());
    }
}
