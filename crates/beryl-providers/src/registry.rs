// SPDX-License-Identifier: GPL-3.0-or-later

//! Static provider dispatch.
//!
//! The four providers are constructed once at startup from configuration and
//! resolved through this registry ever after; there is no per-call string
//! dispatch. Providers missing credentials stay registered but report
//! themselves unavailable, so fan-out policies can skip them without
//! erroring.

use crate::deezer::DeezerProvider;
use crate::lastfm::LastFmProvider;
use crate::musicbrainz::MusicBrainzProvider;
use crate::provider::MetadataProvider;
use crate::spotify::SpotifyProvider;
use beryl_config::MetadataConfig;
use beryl_domain::{ProviderKind, UnknownProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn MetadataProvider>>,
    default_kind: ProviderKind,
}

impl ProviderRegistry {
    /// Build the fixed provider set from configuration.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, UnknownProvider> {
        let default_kind: ProviderKind = config.default_provider.parse()?;

        let providers: Vec<Arc<dyn MetadataProvider>> = vec![
            Arc::new(MusicBrainzProvider::new(&config.musicbrainz)),
            Arc::new(DeezerProvider::new(&config.deezer)),
            Arc::new(SpotifyProvider::new(&config.spotify)),
            Arc::new(LastFmProvider::new(&config.lastfm)),
        ];

        let registry = Self::with_providers(default_kind, providers);
        info!(
            target: "providers",
            default = %default_kind,
            available = ?registry.available().iter().map(|p| p.kind()).collect::<Vec<_>>(),
            "provider registry built"
        );
        Ok(registry)
    }

    /// Build a registry from arbitrary provider implementations. Used by
    /// tests and by callers wiring custom provider sets.
    pub fn with_providers(
        default_kind: ProviderKind,
        providers: Vec<Arc<dyn MetadataProvider>>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.kind(), provider))
            .collect();
        Self {
            providers,
            default_kind,
        }
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn MetadataProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Registered providers whose credentials are present, in the fixed
    /// declaration order.
    pub fn available(&self) -> Vec<Arc<dyn MetadataProvider>> {
        ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| self.providers.get(&kind).cloned())
            .filter(|provider| provider.is_available())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CandidateResult, SearchParams};

    struct FakeProvider {
        kind: ProviderKind,
        available: bool,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn search(&self, _params: &SearchParams) -> Vec<CandidateResult> {
            Vec::new()
        }
    }

    #[test]
    fn full_registry_from_default_config() {
        let registry = ProviderRegistry::from_config(&MetadataConfig::default())
            .expect("default config resolves");
        assert_eq!(registry.default_kind(), ProviderKind::MusicBrainz);

        for kind in ProviderKind::ALL {
            assert!(registry.get(kind).is_some(), "{kind} missing");
        }

        // Spotify and Last.fm have no credentials by default.
        let available: Vec<_> = registry.available().iter().map(|p| p.kind()).collect();
        assert_eq!(available, vec![ProviderKind::MusicBrainz, ProviderKind::Deezer]);
    }

    #[test]
    fn unknown_default_provider_is_rejected() {
        let config = MetadataConfig {
            default_provider: "napster".to_string(),
            ..MetadataConfig::default()
        };
        assert!(ProviderRegistry::from_config(&config).is_err());
    }

    #[test]
    fn available_skips_unconfigured_providers() {
        let registry = ProviderRegistry::with_providers(
            ProviderKind::Deezer,
            vec![
                Arc::new(FakeProvider {
                    kind: ProviderKind::Deezer,
                    available: true,
                }),
                Arc::new(FakeProvider {
                    kind: ProviderKind::Spotify,
                    available: false,
                }),
            ],
        );

        let available: Vec<_> = registry.available().iter().map(|p| p.kind()).collect();
        assert_eq!(available, vec![ProviderKind::Deezer]);
        assert!(registry.get(ProviderKind::Spotify).is_some());
        assert!(registry.get(ProviderKind::MusicBrainz).is_none());
    }
}
