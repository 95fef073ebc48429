// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://beryl.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub max_concurrent_jobs: usize,
    /// How often the pending-track sweep re-runs, in seconds.
    pub reconcile_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 8,
            reconcile_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    /// Minimum delay between consecutive requests, per the MusicBrainz usage
    /// policy (1 request per second for non-commercial clients).
    pub throttle_secs: u64,
    /// MusicBrainz rejects anonymous clients; this must carry contact
    /// information.
    pub user_agent: String,
    pub base_url: Option<String>,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            throttle_secs: 1,
            user_agent: format!(
                "Beryl/{} ( https://github.com/mydnic/beryl )",
                env!("CARGO_PKG_VERSION")
            ),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeezerConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    pub auth_url: Option<String>,
}

impl SpotifyConfig {
    pub fn is_configured(&self) -> bool {
        configured(&self.client_id) && configured(&self.client_secret)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub throttle_secs: u64,
    pub base_url: Option<String>,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            throttle_secs: 1,
            base_url: None,
        }
    }
}

impl LastFmConfig {
    pub fn is_configured(&self) -> bool {
        configured(&self.api_key)
    }
}

fn configured(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Provider used when a reconciliation pass does not name one explicitly.
    pub default_provider: String,
    pub musicbrainz: MusicBrainzConfig,
    pub deezer: DeezerConfig,
    pub spotify: SpotifyConfig,
    pub lastfm: LastFmConfig,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            default_provider: "musicbrainz".to_string(),
            musicbrainz: MusicBrainzConfig::default(),
            deezer: DeezerConfig::default(),
            spotify: SpotifyConfig::default(),
            lastfm: LastFmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
    pub metadata: MetadataConfig,
}

/// Load configuration from defaults, optional TOML file, and environment
/// overrides (prefix: BERYL_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("BERYL_").split("__"));

    let config: AppConfig = figment.extract()?;
    validate(&config)?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.metadata.musicbrainz.user_agent.trim().is_empty() {
        bail!("metadata.musicbrainz.user_agent must not be empty");
    }
    Ok(())
}
