// SPDX-License-Identifier: GPL-3.0-or-later

//! Weighted fuzzy similarity between a track's stored tags and an external
//! candidate.
//!
//! Only fields present on both sides participate; the final score is the
//! weighted average over those fields, rescaled to 0..=100 with two decimals.
//! A candidate with nothing to compare scores 0.

use beryl_domain::Track;
use beryl_providers::CandidateResult;

const TITLE_WEIGHT: f64 = 0.40;
const ARTIST_WEIGHT: f64 = 0.35;
const ALBUM_WEIGHT: f64 = 0.20;
const YEAR_WEIGHT: f64 = 0.05;

/// Matching one string inside the other is worth this much when the edit
/// distance alone would score lower ("Edom" vs "Edom (Radio Edit)").
const CONTAINMENT_SCORE: f64 = 0.8;

const STOP_WORDS: [&str; 17] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "feat", "ft", "featuring",
];

pub fn score(track: &Track, candidate: &CandidateResult) -> f64 {
    let mut score_sum = 0.0;
    let mut weight_sum = 0.0;

    let mut compare_string =
        |track_value: &Option<String>, candidate_value: &Option<String>, weight: f64| {
            if let (Some(left), Some(right)) = (non_blank(track_value), non_blank(candidate_value))
            {
                score_sum += string_similarity(left, right) * weight;
                weight_sum += weight;
            }
        };

    compare_string(&track.title, &candidate.title, TITLE_WEIGHT);
    compare_string(&track.artist, &candidate.artist, ARTIST_WEIGHT);
    compare_string(&track.album, &candidate.album, ALBUM_WEIGHT);

    if let (Some(left), Some(right)) = (track.release_year, candidate.release_year) {
        score_sum += year_similarity(left, right) * YEAR_WEIGHT;
        weight_sum += YEAR_WEIGHT;
    }

    if weight_sum <= 0.0 {
        return 0.0;
    }

    round2((score_sum / weight_sum) * 100.0)
}

/// Similarity in 0..=1: the better of normalized Levenshtein and a flat
/// containment bonus.
pub fn string_similarity(left: &str, right: &str) -> f64 {
    let left = normalize(left);
    let right = normalize(right);

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }

    let distance = levenshtein_distance(&left, &right) as f64;
    let max_len = left.chars().count().max(right.chars().count()) as f64;
    let edit_score = (1.0 - distance / max_len).max(0.0);

    let containment = if left.contains(&right) || right.contains(&left) {
        CONTAINMENT_SCORE
    } else {
        0.0
    };

    edit_score.max(containment)
}

/// Release years match exactly or degrade over a two-year window. Zero is
/// treated as absent.
pub fn year_similarity(left: i32, right: i32) -> f64 {
    if left == 0 || right == 0 {
        return 0.0;
    }
    match (left - right).abs() {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        _ => 0.0,
    }
}

/// Lowercase, strip punctuation, drop stop words and credit words, collapse
/// whitespace.
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn levenshtein_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current_row: Vec<usize> = vec![0; right_chars.len() + 1];

    for (left_index, left_char) in left_chars.iter().enumerate() {
        current_row[0] = left_index + 1;
        for (right_index, right_char) in right_chars.iter().enumerate() {
            let insert_cost = current_row[right_index] + 1;
            let delete_cost = previous_row[right_index + 1] + 1;
            let replace_cost = previous_row[right_index] + usize::from(left_char != right_char);
            current_row[right_index + 1] = insert_cost.min(delete_cost).min(replace_cost);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }

    previous_row[right_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn track(title: &str, artist: &str, album: Option<&str>, year: Option<i32>) -> Track {
        let mut track = Track::new("/music/test.mp3");
        track.title = Some(title.to_string());
        track.artist = Some(artist.to_string());
        track.album = album.map(str::to_string);
        track.release_year = year;
        track
    }

    fn candidate(
        title: Option<&str>,
        artist: Option<&str>,
        album: Option<&str>,
        year: Option<i32>,
    ) -> CandidateResult {
        CandidateResult {
            title: title.map(str::to_string),
            artist: artist.map(str::to_string),
            album: album.map(str::to_string),
            release_year: year,
            provider_score: 0.0,
            external_id: None,
            raw_data: Value::Null,
        }
    }

    #[test]
    fn normalize_strips_punctuation_and_stop_words() {
        assert_eq!(normalize("The Beatles"), "beatles");
        assert_eq!(normalize("AC/DC"), "ac dc");
        assert_eq!(normalize("Song (feat. Somebody)"), "song somebody");
        assert_eq!(normalize("  Multiple    spaces "), "multiple spaces");
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(string_similarity("Edom", "edom"), 1.0);
        assert_eq!(string_similarity("The Beatles", "Beatles"), 1.0);
    }

    #[test]
    fn containment_beats_edit_distance_for_long_suffixes() {
        let sim = string_similarity("Edom", "Edom Extended Club Remix Version");
        assert_eq!(sim, CONTAINMENT_SCORE);
    }

    #[test]
    fn empty_normalization_scores_zero() {
        assert_eq!(string_similarity("...", "anything"), 0.0);
    }

    #[test]
    fn year_similarity_degrades_over_two_years() {
        assert_eq!(year_similarity(2013, 2013), 1.0);
        assert_eq!(year_similarity(2013, 2014), 0.8);
        assert_eq!(year_similarity(2013, 2011), 0.6);
        assert_eq!(year_similarity(2013, 2016), 0.0);
        assert_eq!(year_similarity(0, 2013), 0.0);
    }

    #[test]
    fn perfect_candidate_scores_one_hundred() {
        let track = track("Edom", "Avicii", Some("X You"), Some(2013));
        let candidate = candidate(Some("Edom"), Some("Avicii"), Some("X You"), Some(2013));
        assert_eq!(score(&track, &candidate), 100.0);
    }

    #[test]
    fn missing_fields_drop_out_of_the_average() {
        let track = track("Edom", "Avicii", Some("X You"), Some(2013));
        // Candidate carries only title and artist; both match, so the
        // average over the comparable fields is still perfect.
        let candidate = candidate(Some("Edom"), Some("Avicii"), None, None);
        assert_eq!(score(&track, &candidate), 100.0);
    }

    #[test]
    fn nothing_comparable_scores_zero() {
        let mut bare = Track::new("/music/untagged.mp3");
        bare.title = None;
        bare.artist = None;
        let candidate = candidate(Some("Edom"), Some("Avicii"), Some("X You"), Some(2013));
        assert_eq!(score(&bare, &candidate), 0.0);
    }

    #[test]
    fn near_miss_year_lowers_the_score() {
        let track = track("Edom", "Avicii", Some("X You"), Some(2013));
        let candidate = candidate(Some("Edom"), Some("Avicii"), Some("X You"), Some(2014));
        // (0.40 + 0.35 + 0.20 + 0.8 * 0.05) / 1.0 * 100 = 99.0
        assert_eq!(score(&track, &candidate), 99.0);
    }

    #[test]
    fn blank_candidate_fields_count_as_absent() {
        let track = track("Edom", "Avicii", None, None);
        let candidate = candidate(Some("Edom"), Some("   "), None, None);
        assert_eq!(score(&track, &candidate), 100.0);
    }
}
