// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz recording search.
//!
//! MusicBrainz allows 1 request per second for non-commercial clients and
//! rejects anonymous user agents, so every request carries the configured
//! contact UA and goes through the shared [`RateLimiter`].

use crate::error::{ProviderError, Result};
use crate::provider::{year_from_date, CandidateResult, MetadataProvider, SearchParams};
use crate::rate_limiter::RateLimiter;
use beryl_config::MusicBrainzConfig;
use beryl_domain::ProviderKind;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct MusicBrainzProvider {
    client: Client,
    base_url: String,
    user_agent: String,
    rate_limiter: RateLimiter,
}

impl MusicBrainzProvider {
    pub fn new(config: &MusicBrainzConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| MUSICBRAINZ_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            user_agent: config.user_agent.clone(),
            rate_limiter: RateLimiter::new(Duration::from_secs(config.throttle_secs)),
        }
    }

    /// Look up a single recording by MBID, including artist credits and
    /// releases.
    pub async fn lookup_recording(&self, mbid: &str) -> Result<Value> {
        let mut url = Url::parse(&format!("{}/recording/{}", self.base_url, mbid))
            .map_err(|e| ProviderError::Status {
                status: reqwest::StatusCode::BAD_REQUEST,
                body: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("inc", "artists+releases")
            .append_pair("fmt", "json");

        self.get(url).await
    }

    async fn perform_search(&self, params: &SearchParams) -> Result<Vec<CandidateResult>> {
        // MusicBrainz takes a free-text Lucene query; join whichever of
        // recording (title), artist, and release (album) are present.
        let query = [&params.title, &params.artist, &params.album]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut url =
            Url::parse(&format!("{}/recording", self.base_url)).map_err(|e| {
                ProviderError::Status {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    body: e.to_string(),
                }
            })?;
        url.query_pairs_mut()
            .append_pair("query", &query)
            .append_pair("limit", &SEARCH_LIMIT.to_string())
            .append_pair("fmt", "json");

        let payload = self.get(url).await?;

        let recordings = payload
            .get("recordings")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(recordings.into_iter().map(normalize_recording).collect())
    }

    async fn get(&self, url: Url) -> Result<Value> {
        self.rate_limiter.acquire().await;

        debug!(target: "musicbrainz", url = %url, "GET");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for MusicBrainzProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MusicBrainz
    }

    fn throttle_interval(&self) -> Option<Duration> {
        Some(self.rate_limiter.interval())
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult> {
        match self.perform_search(params).await {
            Ok(results) => results,
            Err(error) => {
                warn!(
                    target: "musicbrainz",
                    %error,
                    ?params,
                    "search failed, returning no candidates"
                );
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordingItem {
    id: Option<String>,
    title: Option<String>,
    score: Option<f64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<ReleaseRef>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtistCredit {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseRef {
    title: Option<String>,
    date: Option<String>,
}

fn normalize_recording(raw: Value) -> CandidateResult {
    // An item that fails to deserialize degrades to all-None fields rather
    // than failing the whole response.
    let item: RecordingItem = serde_json::from_value(raw.clone()).unwrap_or_default();

    let first_release = item.releases.first();

    CandidateResult {
        title: item.title.clone(),
        artist: item.artist_credit.first().and_then(|credit| credit.name.clone()),
        album: first_release.and_then(|release| release.title.clone()),
        release_year: first_release
            .and_then(|release| release.date.as_deref())
            .and_then(year_from_date),
        provider_score: item.score.unwrap_or(0.0),
        external_id: item.id.clone(),
        raw_data: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_a_full_recording() {
        let raw = json!({
            "id": "e5a3f0c4-1fae-4f2e-8f76-0c3b4f1e4fa6",
            "title": "Paranoid Android",
            "score": 98,
            "artist-credit": [{"name": "Radiohead"}],
            "releases": [
                {"title": "OK Computer", "date": "1997-05-21"},
                {"title": "OK Computer OKNOTOK", "date": "2017-06-23"}
            ]
        });

        let candidate = normalize_recording(raw);
        assert_eq!(candidate.title.as_deref(), Some("Paranoid Android"));
        assert_eq!(candidate.artist.as_deref(), Some("Radiohead"));
        assert_eq!(candidate.album.as_deref(), Some("OK Computer"));
        assert_eq!(candidate.release_year, Some(1997));
        assert_eq!(candidate.provider_score, 98.0);
        assert_eq!(
            candidate.external_id.as_deref(),
            Some("e5a3f0c4-1fae-4f2e-8f76-0c3b4f1e4fa6")
        );
    }

    #[test]
    fn missing_fields_become_none_not_errors() {
        let candidate = normalize_recording(json!({"title": "Edom"}));
        assert_eq!(candidate.title.as_deref(), Some("Edom"));
        assert_eq!(candidate.artist, None);
        assert_eq!(candidate.album, None);
        assert_eq!(candidate.release_year, None);
        assert_eq!(candidate.provider_score, 0.0);
        assert_eq!(candidate.external_id, None);
    }

    #[test]
    fn unparsable_item_degrades_to_raw_payload_only() {
        let raw = json!("not an object");
        let candidate = normalize_recording(raw.clone());
        assert_eq!(candidate.title, None);
        assert_eq!(candidate.raw_data, raw);
    }
}
