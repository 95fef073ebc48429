// SPDX-License-Identifier: GPL-3.0-or-later

//! Last.fm track search.
//!
//! The `track.search` endpoint returns no album or release year, so those
//! fields stay None and the relevance score is derived from the listener
//! count. When exactly one match exists the API returns a bare object where
//! an array is expected; normalization handles both shapes.

use crate::error::{ProviderError, Result};
use crate::provider::{CandidateResult, MetadataProvider, SearchParams};
use crate::rate_limiter::RateLimiter;
use beryl_config::LastFmConfig;
use beryl_domain::ProviderKind;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const BASE_SCORE: f64 = 50.0;
const LISTENER_BONUS_CAP: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct LastFmProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl LastFmProvider {
    pub fn new(config: &LastFmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| LASTFM_API_BASE.to_string()),
            rate_limiter: RateLimiter::new(Duration::from_secs(config.throttle_secs)),
        }
    }

    async fn perform_search(&self, params: &SearchParams) -> Result<Vec<CandidateResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Unconfigured("lastfm api key"))?;

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

        self.rate_limiter.acquire().await;

        debug!(target: "lastfm", url = %self.base_url, query = %query, "GET track.search");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("method", "track.search"),
                ("track", query.as_str()),
                ("api_key", api_key),
                ("format", "json"),
                ("limit", "10"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let payload: Value = serde_json::from_str(&response.text().await?)?;

        let matches = payload
            .get("results")
            .and_then(|results| results.get("trackmatches"))
            .and_then(|matches| matches.get("track"))
            .cloned()
            .unwrap_or(Value::Null);

        // Single-result responses come back as an object, not an array.
        let tracks = match matches {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => Vec::new(),
        };

        Ok(tracks.into_iter().map(normalize_track).collect())
    }
}

#[async_trait::async_trait]
impl MetadataProvider for LastFmProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LastFm
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn throttle_interval(&self) -> Option<Duration> {
        Some(self.rate_limiter.interval())
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult> {
        match self.perform_search(params).await {
            Ok(results) => results,
            Err(error) => {
                warn!(
                    target: "lastfm",
                    %error,
                    ?params,
                    "search failed, returning no candidates"
                );
                Vec::new()
            }
        }
    }
}

fn normalize_track(raw: Value) -> CandidateResult {
    CandidateResult {
        title: string_field(&raw, "name"),
        artist: string_field(&raw, "artist"),
        album: None,
        release_year: None,
        provider_score: relevance_score(&raw),
        external_id: string_field(&raw, "mbid").filter(|id| !id.is_empty()),
        raw_data: raw,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Last.fm search results carry no direct popularity score; start from a
/// base relevance and add a listener-count bonus capped at 100 total.
/// Listener counts arrive as JSON strings.
fn relevance_score(track: &Value) -> f64 {
    let listeners = track
        .get("listeners")
        .and_then(|value| match value {
            Value::String(s) => s.parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
        .unwrap_or(0.0);

    let bonus = ((listeners / 10_000.0) * LISTENER_BONUS_CAP).min(LISTENER_BONUS_CAP);
    ((BASE_SCORE + bonus) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_api_key_means_unavailable() {
        let provider = LastFmProvider::new(&LastFmConfig::default());
        assert!(!provider.is_available());

        let configured = LastFmProvider::new(&LastFmConfig {
            api_key: Some("key".to_string()),
            ..LastFmConfig::default()
        });
        assert!(configured.is_available());
    }

    #[tokio::test]
    async fn unconfigured_search_is_empty() {
        let provider = LastFmProvider::new(&LastFmConfig::default());
        let results = provider.search(&SearchParams::title_only("Edom")).await;
        assert!(results.is_empty());
    }

    #[test]
    fn normalizes_a_track_with_string_listeners() {
        let raw = json!({
            "name": "Let It Be",
            "artist": "The Beatles",
            "listeners": "5000",
            "mbid": "12345"
        });

        let candidate = normalize_track(raw);
        assert_eq!(candidate.title.as_deref(), Some("Let It Be"));
        assert_eq!(candidate.artist.as_deref(), Some("The Beatles"));
        assert_eq!(candidate.album, None);
        assert_eq!(candidate.release_year, None);
        // 50 base + (5000/10000)*50 = 75
        assert_eq!(candidate.provider_score, 75.0);
        assert_eq!(candidate.external_id.as_deref(), Some("12345"));
    }

    #[test]
    fn listener_bonus_is_capped_at_fifty() {
        let raw = json!({"name": "Popular", "artist": "Anyone", "listeners": "9999999"});
        assert_eq!(normalize_track(raw).provider_score, 100.0);
    }

    #[test]
    fn empty_mbid_becomes_none() {
        let raw = json!({"name": "Obscure", "artist": "Nobody", "mbid": ""});
        assert_eq!(normalize_track(raw).external_id, None);
    }
}
