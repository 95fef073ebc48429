// SPDX-License-Identifier: GPL-3.0-or-later

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors raised inside a provider's search pipeline. None of these reach
/// the `MetadataProvider::search` caller; they are logged at the boundary
/// and collapse into an empty result list.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider not configured: missing {0}")]
    Unconfigured(&'static str),
}
