// SPDX-License-Identifier: GPL-3.0-or-later

use beryl_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search fields derived from a track's metadata or its filename. Absent
/// fields are omitted from provider queries, never padded with empty
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl SearchParams {
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        blank(&self.artist) && blank(&self.title) && blank(&self.album)
    }

    /// Present field values in artist, title, album order.
    pub fn present_values(&self) -> Vec<&str> {
        [&self.artist, &self.title, &self.album]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect()
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// The normalized, not-yet-persisted shape every provider maps its native
/// response into. Unknown or missing provider fields become None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    /// Raw score or popularity reported by the provider, on whatever scale
    /// it uses natively. The pipeline's own confidence score is computed
    /// separately against the track.
    pub provider_score: f64,
    pub external_id: Option<String>,
    pub raw_data: serde_json::Value,
}

/// Uniform capability implemented once per external lookup service.
///
/// `search` must never fail: all transport and parsing problems are handled
/// inside the provider and surface as an empty list plus a logged
/// diagnostic. New providers slot in without touching scoring or
/// orchestration.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable lowercase identifier for this service.
    fn kind(&self) -> ProviderKind;

    /// False when required credentials are missing; the registry skips
    /// unavailable providers during fan-out.
    fn is_available(&self) -> bool {
        true
    }

    /// Mandatory minimum delay between consecutive requests, if the service
    /// declares one.
    fn throttle_interval(&self) -> Option<Duration> {
        None
    }

    async fn search(&self, params: &SearchParams) -> Vec<CandidateResult>;
}

/// Extract a four-digit year from a provider date string such as
/// "2013-09-10", "1997-05", or "2013".
pub(crate) fn year_from_date(date: &str) -> Option<i32> {
    let prefix = date.get(..4)?;
    let year: i32 = prefix.parse().ok()?;
    (year > 0).then_some(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_detected() {
        assert!(SearchParams::default().is_empty());

        let blankish = SearchParams {
            artist: Some("  ".to_string()),
            title: Some(String::new()),
            album: None,
        };
        assert!(blankish.is_empty());

        assert!(!SearchParams::title_only("Edom").is_empty());
    }

    #[test]
    fn present_values_skips_absent_fields() {
        let params = SearchParams {
            artist: Some("Avicii".to_string()),
            title: Some(" Edom ".to_string()),
            album: None,
        };
        assert_eq!(params.present_values(), vec!["Avicii", "Edom"]);
    }

    #[test]
    fn year_parsing_tolerates_partial_dates() {
        assert_eq!(year_from_date("2013-09-10"), Some(2013));
        assert_eq!(year_from_date("1997-05"), Some(1997));
        assert_eq!(year_from_date("1997"), Some(1997));
        assert_eq!(year_from_date(""), None);
        assert_eq!(year_from_date("19"), None);
        assert_eq!(year_from_date("0000"), None);
        assert_eq!(year_from_date("not-a-date"), None);
    }
}
