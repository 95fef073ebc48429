// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use beryl_application::{
    extract_tags, InMemoryEventBus, ProviderPolicy, ReconciliationService,
};
use beryl_config::load as load_config;
use beryl_domain::{Track, TrackId};
use beryl_infrastructure::{
    init_database, CandidateRepository, SqliteCandidateRepository, SqliteTrackRepository,
    TrackRepository,
};
use beryl_providers::ProviderRegistry;
use beryl_scheduler::Scheduler;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Audio library metadata reconciliation service
#[derive(Parser)]
#[command(name = "beryl", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an audio file and reconcile it once
    Add {
        /// Path to the audio file
        path: PathBuf,
    },
    /// Reconcile one known track across all configured providers
    Reconcile {
        /// Numeric track id
        track_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    let pool = init_database(&config).await?;
    let tracks: Arc<dyn TrackRepository> = Arc::new(SqliteTrackRepository::new(pool.clone()));
    let candidates: Arc<dyn CandidateRepository> =
        Arc::new(SqliteCandidateRepository::new(pool));

    let registry = Arc::new(ProviderRegistry::from_config(&config.metadata)?);
    let service = Arc::new(ReconciliationService::new(
        registry,
        tracks.clone(),
        candidates,
        Arc::new(InMemoryEventBus::new()),
    ));

    match cli.command {
        None => {
            let scheduler = Scheduler::new(config, service, tracks);
            scheduler.register_jobs().await;
            let _scheduler_handle = scheduler.start();

            info!(target: "cli", "beryl running, waiting for shutdown signal");
            shutdown_signal().await;
        }
        Some(Commands::Add { path }) => {
            let track = register_file(&path, tracks.as_ref()).await?;
            info!(target: "cli", track_id = %track.id, path = %path.display(), "registered track");
            service.reconcile(track.id, ProviderPolicy::Default).await?;
        }
        Some(Commands::Reconcile { track_id }) => {
            service
                .reconcile(TrackId(track_id), ProviderPolicy::All)
                .await?;
        }
    }

    Ok(())
}

/// Register an audio file as a track, pulling whatever embedded tags it has.
/// Already-known paths are returned as-is. Unreadable tags leave the track
/// untagged; it will reconcile through filename keys.
async fn register_file(path: &PathBuf, tracks: &dyn TrackRepository) -> Result<Track> {
    let path_str = path
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))?;

    if let Some(existing) = tracks.get_by_path(path_str).await? {
        info!(target: "cli", track_id = %existing.id, "track already registered");
        return Ok(existing);
    }

    let mut track = Track::new(path_str);
    match extract_tags(path) {
        Ok(tags) => {
            track.title = tags.title;
            track.artist = tags.artist;
            track.album = tags.album;
            track.release_year = tags.release_year;
            track.genre = tags.genre;
            track.technical = tags.technical;
        }
        Err(error) => {
            warn!(target: "cli", %error, "could not read embedded tags, registering untagged");
        }
    }

    tracks.create(track).await
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    #[cfg(not(unix))]
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    {
        interrupt.await.expect("ctrl_c handler");
    }

    info!(target: "cli", "shutdown signal received");
}
