// SPDX-License-Identifier: GPL-3.0-or-later

//! Embedded tag extraction via lofty.
//!
//! Runs once when a file is registered. Failures are reported to the caller,
//! which leaves the track untagged; such tracks still reconcile through
//! filename-derived search keys.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use serde_json::json;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("failed to read tags from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Tag fields and technical properties pulled from one audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    pub genre: Option<String>,
    pub technical: serde_json::Value,
}

pub fn extract_tags(path: impl AsRef<Path>) -> Result<ExtractedTags, TagError> {
    let path = path.as_ref();

    let tagged = lofty::read_from_path(path).map_err(|source| TagError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let properties = tagged.properties();
    let technical = json!({
        "duration_secs": properties.duration().as_secs(),
        "bitrate_kbps": properties.audio_bitrate(),
        "sample_rate_hz": properties.sample_rate(),
        "channels": properties.channels(),
        "container": format!("{:?}", tagged.file_type()),
    });

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

    let extracted = match tag {
        Some(tag) => ExtractedTags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            release_year: tag.year().map(|y| y as i32),
            genre: tag.genre().map(|s| s.to_string()),
            technical,
        },
        None => ExtractedTags {
            technical,
            ..ExtractedTags::default()
        },
    };

    debug!(
        target: "tags",
        path = %path.display(),
        title = ?extracted.title,
        artist = ?extracted.artist,
        "extracted embedded tags"
    );

    Ok(extracted)
}
