// SPDX-License-Identifier: GPL-3.0-or-later

//! Search key derivation for reconciliation passes.
//!
//! Metadata-mode keys come straight from the track's stored tags. When both
//! title and artist are missing, the file stem is cleaned and split on common
//! release-name patterns (`Artist - Title`, track-number prefixes, camel-case
//! artist runs) so untagged files can still be searched. Filename-mode keys
//! use the whole cleaned stem as a free-text title.

use beryl_domain::Track;
use beryl_providers::SearchParams;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Bracketed release noise: [FLAC], (Official Video), {2013}
    static ref BRACKETED: Regex = Regex::new(r"\[.*?\]|\(.*?\)|\{.*?\}").unwrap();
    // Leading track numbers: "01.", "01 -", "01_", "01 "
    static ref LEADING_TRACK_NUMBER: Regex = Regex::new(r"^\s*\d{1,3}[.\-_\s]+").unwrap();

    // Split patterns, most specific first
    static ref NUMBERED_DASH_SPLIT: Regex = Regex::new(r"^\d+\s*-\s*(.+?)\s*-\s*(.+)$").unwrap();
    static ref NUMBERED_SPLIT: Regex = Regex::new(r"^\d+\.?\s*(.+?)\s*-\s*(.+)$").unwrap();
    static ref DASH_SPLIT: Regex = Regex::new(r"^(.+?)\s*-\s*(.+)$").unwrap();
    static ref UNDERSCORE_SPLIT: Regex = Regex::new(r"^(.+?)_(.+)$").unwrap();
    // "Daft Punk Around the World": a run of capitalized words then the rest
    static ref CAPITALIZED_RUN_SPLIT: Regex =
        Regex::new(r"^([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+(.+)$").unwrap();

    // Quality noise inside extracted halves
    static ref BITRATE: Regex = Regex::new(r"(?i)\b(320|256|192|128)\s*kbps?\b").unwrap();
    static ref FORMAT_NAME: Regex = Regex::new(r"(?i)\b(mp3|flac|wav|m4a|ogg)\b").unwrap();
    static ref QUALITY_TAG: Regex = Regex::new(r"(?i)\b(hq|high.?quality|lossless)\b").unwrap();
    static ref WEB_NOISE: Regex = Regex::new(r"(?i)\bwww\.\S+\b|\b[a-z]+\.[a-z]{2,4}\b").unwrap();
    static ref EDGE_SEPARATORS: Regex = Regex::new(r"^[_\-\s]+|[_\-\s]+$").unwrap();
}

const MIN_KEY_LEN: usize = 3;
const MIN_HALF_LEN: usize = 2;

pub struct SearchKeyExtractor;

impl SearchKeyExtractor {
    /// Metadata-mode key: stored tags, falling back to filename-derived
    /// artist/title only when both identifying tags are absent.
    pub fn from_metadata(track: &Track) -> Option<SearchParams> {
        let mut params = SearchParams {
            artist: non_blank(&track.artist),
            title: non_blank(&track.title),
            album: non_blank(&track.album),
        };

        if params.title.is_none() && params.artist.is_none() {
            if let Some(stem) = track.file_stem() {
                match split_artist_title(stem) {
                    Some((artist, title)) => {
                        params.artist = Some(artist);
                        params.title = Some(title);
                    }
                    None => params.title = title_only_key(stem),
                }
            }
        }

        if params.is_empty() {
            None
        } else {
            Some(params)
        }
    }

    /// Filename-mode key: the whole cleaned stem becomes a free-text title.
    /// Quality and source tokens are kept here: the filename pass is the last
    /// resort, and stripping them can leave nothing distinctive to search on.
    pub fn from_filename(track: &Track) -> Option<SearchParams> {
        let title = track.file_stem().and_then(cleaned_filename)?;
        Some(SearchParams::title_only(title))
    }
}

/// Clean a file stem into a free-text query: drop bracketed noise and a
/// leading track number, flatten separators, collapse whitespace. None when
/// fewer than three characters survive.
pub fn cleaned_filename(stem: &str) -> Option<String> {
    let cleaned = BRACKETED.replace_all(stem, " ");
    let cleaned = LEADING_TRACK_NUMBER.replace(&cleaned, " ");
    let cleaned = cleaned.replace(['_', '-'], " ");
    let cleaned = collapse_whitespace(&cleaned);

    if cleaned.chars().count() >= MIN_KEY_LEN {
        Some(cleaned)
    } else {
        None
    }
}

/// Title-only fallback for untagged, unsplittable stems: the cleaned stem
/// with quality markers and web noise removed as well, so they do not leak
/// into the provider query as if they were part of the title.
fn title_only_key(stem: &str) -> Option<String> {
    let cleaned = clean_extracted_text(&cleaned_filename(stem)?);
    (cleaned.chars().count() >= MIN_KEY_LEN).then_some(cleaned)
}

/// Try to split a file stem into (artist, title).
///
/// Dashes and underscores are kept through cleaning here since they are the
/// separators being matched.
pub fn split_artist_title(stem: &str) -> Option<(String, String)> {
    let cleaned = BRACKETED.replace_all(stem, " ");
    let cleaned = collapse_whitespace(&cleaned);

    let patterns: [&Regex; 5] = [
        &NUMBERED_DASH_SPLIT,
        &NUMBERED_SPLIT,
        &DASH_SPLIT,
        &UNDERSCORE_SPLIT,
        &CAPITALIZED_RUN_SPLIT,
    ];

    for pattern in patterns {
        if let Some(captures) = pattern.captures(&cleaned) {
            let artist = clean_extracted_text(captures.get(1)?.as_str());
            let title = clean_extracted_text(captures.get(2)?.as_str());

            if artist.chars().count() >= MIN_HALF_LEN && title.chars().count() >= MIN_HALF_LEN {
                return Some((artist, title));
            }
        }
    }

    None
}

/// Strip quality markers, format names, and web noise from an extracted
/// artist or title half.
fn clean_extracted_text(text: &str) -> String {
    let cleaned = BITRATE.replace_all(text, " ");
    let cleaned = FORMAT_NAME.replace_all(&cleaned, " ");
    let cleaned = QUALITY_TAG.replace_all(&cleaned, " ");
    let cleaned = WEB_NOISE.replace_all(&cleaned, " ");
    let cleaned = EDGE_SEPARATORS.replace_all(&cleaned, "");
    collapse_whitespace(&cleaned)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_tags(path: &str, title: Option<&str>, artist: Option<&str>) -> Track {
        let mut track = Track::new(path);
        track.title = title.map(str::to_string);
        track.artist = artist.map(str::to_string);
        track
    }

    #[test]
    fn cleaned_filename_strips_noise() {
        assert_eq!(
            cleaned_filename("01 - The Beatles - Let It Be [FLAC]").as_deref(),
            Some("The Beatles Let It Be")
        );
        assert_eq!(
            cleaned_filename("Daft_Punk_Around_the_World_(Official)").as_deref(),
            Some("Daft Punk Around the World")
        );
        assert_eq!(cleaned_filename("ab"), None);
        assert_eq!(cleaned_filename("07."), None);
    }

    #[test]
    fn splits_artist_dash_title() {
        assert_eq!(
            split_artist_title("The Beatles - Let It Be"),
            Some(("The Beatles".to_string(), "Let It Be".to_string()))
        );
    }

    #[test]
    fn splits_with_leading_track_number() {
        assert_eq!(
            split_artist_title("01. The Beatles - Let It Be"),
            Some(("The Beatles".to_string(), "Let It Be".to_string()))
        );
        assert_eq!(
            split_artist_title("05 - Avicii - Edom"),
            Some(("Avicii".to_string(), "Edom".to_string()))
        );
    }

    #[test]
    fn splits_capitalized_artist_run() {
        assert_eq!(
            split_artist_title("Daft Punk around the world"),
            Some(("Daft Punk".to_string(), "around the world".to_string()))
        );
    }

    #[test]
    fn quality_tokens_are_cleaned_from_halves() {
        assert_eq!(
            split_artist_title("Avicii - Edom 320kbps"),
            Some(("Avicii".to_string(), "Edom".to_string()))
        );
    }

    #[test]
    fn short_halves_are_rejected() {
        assert_eq!(split_artist_title("A - B"), None);
    }

    #[test]
    fn metadata_key_uses_stored_tags_verbatim() {
        let mut track =
            track_with_tags("/music/whatever.mp3", Some("Edom"), Some("Avicii"));
        track.album = Some("X You".to_string());

        let params = SearchKeyExtractor::from_metadata(&track).expect("key expected");
        assert_eq!(params.title.as_deref(), Some("Edom"));
        assert_eq!(params.artist.as_deref(), Some("Avicii"));
        assert_eq!(params.album.as_deref(), Some("X You"));
    }

    #[test]
    fn untagged_track_falls_back_to_filename_split() {
        let track = track_with_tags("/music/The Beatles - Let It Be.mp3", None, None);

        let params = SearchKeyExtractor::from_metadata(&track).expect("key expected");
        assert_eq!(params.artist.as_deref(), Some("The Beatles"));
        assert_eq!(params.title.as_deref(), Some("Let It Be"));
    }

    #[test]
    fn unsplittable_filename_becomes_title_only() {
        let track = track_with_tags("/music/bohemianrhapsody.mp3", None, None);

        let params = SearchKeyExtractor::from_metadata(&track).expect("key expected");
        assert_eq!(params.title.as_deref(), Some("bohemianrhapsody"));
        assert_eq!(params.artist, None);
    }

    #[test]
    fn title_only_fallback_strips_quality_tokens() {
        let track = track_with_tags("/music/edomsong 320kbps.mp3", None, None);

        let params = SearchKeyExtractor::from_metadata(&track).expect("key expected");
        assert_eq!(params.title.as_deref(), Some("edomsong"));

        // nothing left once the noise is gone
        let noise = track_with_tags("/music/320kbps flac.mp3", None, None);
        assert!(SearchKeyExtractor::from_metadata(&noise).is_none());
    }

    #[test]
    fn hopeless_filename_yields_no_key() {
        let track = track_with_tags("/music/01.mp3", None, None);
        assert!(SearchKeyExtractor::from_metadata(&track).is_none());
        assert!(SearchKeyExtractor::from_filename(&track).is_none());
    }

    #[test]
    fn filename_mode_uses_whole_cleaned_stem() {
        let track = track_with_tags(
            "/music/02 - The Beatles - Let It Be [remaster].mp3",
            Some("ignored"),
            None,
        );

        let params = SearchKeyExtractor::from_filename(&track).expect("key expected");
        assert_eq!(params.title.as_deref(), Some("The Beatles Let It Be"));
        assert_eq!(params.artist, None);
    }

    #[test]
    fn filename_mode_keeps_quality_tokens() {
        let track = track_with_tags("/music/edomsong 320kbps.mp3", None, None);

        let params = SearchKeyExtractor::from_filename(&track).expect("key expected");
        assert_eq!(params.title.as_deref(), Some("edomsong 320kbps"));
    }
}
