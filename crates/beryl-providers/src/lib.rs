// SPDX-License-Identifier: GPL-3.0-or-later

//! Metadata provider clients for the reconciliation pipeline.
//!
//! Each external lookup service (MusicBrainz, Deezer, Spotify, Last.fm) is
//! wrapped in a client implementing the [`MetadataProvider`] capability:
//! query construction from whichever search fields are present, HTTP calls
//! with bounded timeouts, normalization of the native payload into
//! [`CandidateResult`], and a self-declared throttling interval. Transport
//! and parse failures never escape `search`; they are logged and degrade to
//! an empty result list.

pub mod deezer;
pub mod error;
pub mod lastfm;
pub mod musicbrainz;
pub mod provider;
pub mod rate_limiter;
pub mod registry;
pub mod spotify;

pub use deezer::DeezerProvider;
pub use error::{ProviderError, Result};
pub use lastfm::LastFmProvider;
pub use musicbrainz::MusicBrainzProvider;
pub use provider::{CandidateResult, MetadataProvider, SearchParams};
pub use rate_limiter::RateLimiter;
pub use registry::ProviderRegistry;
pub use spotify::SpotifyProvider;
