// SPDX-License-Identifier: GPL-3.0-or-later

//! Deezer track search. No credentials and no throttling required.

use crate::error::{ProviderError, Result};
use crate::provider::{year_from_date, CandidateResult, MetadataProvider, SearchParams};
use beryl_config::DeezerConfig;
use beryl_domain::ProviderKind;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct DeezerProvider {
    client: Client,
    base_url: String,
}

impl DeezerProvider {
    pub fn new(config: &DeezerConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEEZER_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Look up a single track by Deezer id.
    pub async fn lookup_track(&self, id: &str) -> Result<Value> {
        let url = format!("{}/track/{}", self.base_url, id);
        self.get(&url, &[]).await
    }

    async fn perform_search(&self, params: &SearchParams) -> Result<Vec<CandidateResult>> {
        let query = params
            .present_values()
            .into_iter()
            .map(sanitize_query_param)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        let payload = self
            .get(&url, &[("q", query.as_str()), ("limit", "10")])
            .await?;

        let tracks = payload
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(tracks
            .into_iter()
            .take(SEARCH_LIMIT as usize)
            .map(normalize_track)
            .collect())
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        debug!(target: "deezer", url, "GET");

        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Strip characters that break the Deezer query syntax, keeping letters,
/// digits, and whitespace.
fn sanitize_query_param(param: &str) -> String {
    param
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl MetadataProvider for DeezerProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deezer
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult> {
        match self.perform_search(params).await {
            Ok(results) => results,
            Err(error) => {
                warn!(
                    target: "deezer",
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
struct TrackItem {
    id: Option<u64>,
    title: Option<String>,
    /// Deezer reports popularity as `rank`.
    rank: Option<f64>,
    artist: Option<ArtistRef>,
    album: Option<AlbumRef>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtistRef {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumRef {
    title: Option<String>,
    release_date: Option<String>,
}

fn normalize_track(raw: Value) -> CandidateResult {
    let item: TrackItem = serde_json::from_value(raw.clone()).unwrap_or_default();

    CandidateResult {
        title: item.title.clone(),
        artist: item.artist.as_ref().and_then(|artist| artist.name.clone()),
        album: item.album.as_ref().and_then(|album| album.title.clone()),
        release_year: item
            .album
            .as_ref()
            .and_then(|album| album.release_date.as_deref())
            .and_then(year_from_date),
        provider_score: item.rank.unwrap_or(0.0),
        external_id: item.id.map(|id| id.to_string()),
        raw_data: raw,
    }
}
