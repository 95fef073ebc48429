// SPDX-License-Identifier: GPL-3.0-or-later

//! Spotify track search via the client-credentials flow.
//!
//! Access tokens live for an hour; they are cached for 55 minutes and
//! refreshed transparently when the cache entry expires. Missing credentials
//! make the provider unavailable rather than failing the pipeline, and a
//! failed token exchange degrades to an empty search result.

use crate::error::{ProviderError, Result};
use crate::provider::{year_from_date, CandidateResult, MetadataProvider, SearchParams};
use beryl_config::SpotifyConfig;
use beryl_domain::ProviderKind;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/api/token";
/// Tokens expire after an hour; keep a safety margin.
const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);
const TOKEN_CACHE_KEY: &str = "access_token";

#[derive(Clone)]
pub struct SpotifyProvider {
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    base_url: String,
    auth_url: String,
    token_cache: Cache<&'static str, String>,
}

impl SpotifyProvider {
    pub fn new(config: &SpotifyConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            client_id: non_blank(&config.client_id),
            client_secret: non_blank(&config.client_secret),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| SPOTIFY_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            auth_url: config
                .auth_url
                .clone()
                .unwrap_or_else(|| SPOTIFY_AUTH_URL.to_string()),
            token_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(TOKEN_TTL)
                .build(),
        }
    }

    async fn perform_search(&self, params: &SearchParams) -> Result<Vec<CandidateResult>> {
        let (Some(_), Some(_)) = (&self.client_id, &self.client_secret) else {
            return Err(ProviderError::Unconfigured("spotify client id/secret"));
        };

        // Album terms tend to over-constrain Spotify's free-text search, so
        // the query carries artist and title only.
        let query = [&params.artist, &params.title]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if query.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.access_token().await?;

        let url = format!("{}/search", self.base_url);
        debug!(target: "spotify", url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "10")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let payload: Value = serde_json::from_str(&response.text().await?)?;

        let tracks = payload
            .get("tracks")
            .and_then(|tracks| tracks.get("items"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(tracks.into_iter().map(normalize_track).collect())
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token_cache.get(TOKEN_CACHE_KEY) {
            return Ok(token);
        }

        let token = self.fetch_token().await?;
        self.token_cache.insert(TOKEN_CACHE_KEY, token.clone());
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<String> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ProviderError::Unconfigured("spotify client id"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(ProviderError::Unconfigured("spotify client secret"))?;

        debug!(target: "spotify", url = %self.auth_url, "requesting access token");

        let response = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let token: TokenResponse = serde_json::from_str(&response.text().await?)?;
        Ok(token.access_token)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl MetadataProvider for SpotifyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spotify
    }

    fn is_available(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult> {
        match self.perform_search(params).await {
            Ok(results) => results,
            Err(error) => {
                warn!(
                    target: "spotify",
                    %error,
                    ?params,
                    "search failed, returning no candidates"
                );
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrackItem {
    id: Option<String>,
    name: Option<String>,
    /// Spotify popularity, 0-100.
    popularity: Option<f64>,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    album: Option<AlbumRef>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtistRef {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumRef {
    name: Option<String>,
    release_date: Option<String>,
}

fn normalize_track(raw: Value) -> CandidateResult {
    let item: TrackItem = serde_json::from_value(raw.clone()).unwrap_or_default();

    CandidateResult {
        title: item.name.clone(),
        artist: item.artists.first().and_then(|artist| artist.name.clone()),
        album: item.album.as_ref().and_then(|album| album.name.clone()),
        release_year: item
            .album
            .as_ref()
            .and_then(|album| album.release_date.as_deref())
            .and_then(year_from_date),
        provider_score: item.popularity.unwrap_or(0.0),
        external_id: item.id.clone(),
        raw_data: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unconfigured() -> SpotifyProvider {
        SpotifyProvider::new(&SpotifyConfig::default())
    }

    #[test]
    fn missing_credentials_mean_unavailable() {
        assert!(!unconfigured().is_available());

        let configured = SpotifyProvider::new(&SpotifyConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..SpotifyConfig::default()
        });
        assert!(configured.is_available());
    }

    #[tokio::test]
    async fn unconfigured_search_is_empty() {
        let provider = unconfigured();
        let results = provider.search(&SearchParams::title_only("Edom")).await;
        assert!(results.is_empty());
    }

    #[test]
    fn normalizes_a_full_track() {
        let raw = json!({
            "id": "4B0JvthVoAAuygILe3n4Bs",
            "name": "Edom",
            "popularity": 48,
            "artists": [{"name": "Avicii"}],
            "album": {"name": "X You", "release_date": "2013-02-26"}
        });

        let candidate = normalize_track(raw);
        assert_eq!(candidate.title.as_deref(), Some("Edom"));
        assert_eq!(candidate.artist.as_deref(), Some("Avicii"));
        assert_eq!(candidate.album.as_deref(), Some("X You"));
        assert_eq!(candidate.release_year, Some(2013));
        assert_eq!(candidate.provider_score, 48.0);
    }
}
