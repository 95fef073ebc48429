// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use beryl_domain::{CandidateId, MetadataCandidate, ProviderKind, SearchMode, Track, TrackId};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;
use sqlx::SqlitePool;
use tracing::debug;

use crate::repositories::{CandidateRepository, NewCandidate, TrackRepository};

/// SQLx-backed Track repository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn create(&self, track: Track) -> Result<Track> {
        debug!(target: "repository", file_path = %track.file_path, "creating track");
        let q = r#"
            INSERT INTO tracks (
                file_path, title, artist, album, release_year, genre,
                technical, needs_fixing, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let result = sqlx::query(q)
            .bind(track.file_path.clone())
            .bind(track.title.clone())
            .bind(track.artist.clone())
            .bind(track.album.clone())
            .bind(track.release_year)
            .bind(track.genre.clone())
            .bind(track.technical.to_string())
            .bind(track.needs_fixing)
            .bind(track.created_at.to_rfc3339())
            .bind(track.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(Track {
            id: TrackId(result.last_insert_rowid()),
            ..track
        })
    }

    async fn get_by_id(&self, id: TrackId) -> Result<Option<Track>> {
        debug!(target: "repository", %id, "fetching track by id");
        let row = sqlx::query("SELECT * FROM tracks WHERE id = ? LIMIT 1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_track).transpose()
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<Track>> {
        debug!(target: "repository", path, "fetching track by path");
        let row = sqlx::query("SELECT * FROM tracks WHERE file_path = ? LIMIT 1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_track).transpose()
    }

    async fn update_tags(&self, track: &Track) -> Result<()> {
        debug!(target: "repository", track_id = %track.id, "updating track tags");
        let q = r#"
            UPDATE tracks SET
                title = ?,
                artist = ?,
                album = ?,
                release_year = ?,
                genre = ?,
                technical = ?,
                updated_at = ?
            WHERE id = ?
        "#;
        sqlx::query(q)
            .bind(track.title.clone())
            .bind(track.artist.clone())
            .bind(track.album.clone())
            .bind(track.release_year)
            .bind(track.genre.clone())
            .bind(track.technical.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(track.id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Track>> {
        debug!(target: "repository", limit, offset, "listing tracks");
        let rows = sqlx::query("SELECT * FROM tracks ORDER BY file_path LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_track).collect()
    }

    async fn list_needing_fixing(&self, limit: i64, offset: i64) -> Result<Vec<Track>> {
        debug!(target: "repository", limit, offset, "listing tracks needing fixing");
        let rows = sqlx::query(
            "SELECT * FROM tracks WHERE needs_fixing = 1 ORDER BY file_path LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_track).collect()
    }

    async fn set_needs_fixing(&self, id: TrackId, needs_fixing: bool) -> Result<()> {
        debug!(target: "repository", %id, needs_fixing, "setting needs_fixing flag");
        sqlx::query("UPDATE tracks SET needs_fixing = ?, updated_at = ? WHERE id = ?")
            .bind(needs_fixing)
            .bind(Utc::now().to_rfc3339())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: TrackId) -> Result<()> {
        debug!(target: "repository", %id, "deleting track");
        sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch(&self, id: TrackId) -> Result<()> {
        sqlx::query("UPDATE tracks SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================

/// SQLx-backed candidate repository
pub struct SqliteCandidateRepository {
    pool: SqlitePool,
}

impl SqliteCandidateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CandidateRepository for SqliteCandidateRepository {
    async fn append(&self, candidate: NewCandidate) -> Result<MetadataCandidate> {
        debug!(
            target: "repository",
            track_id = %candidate.track_id,
            provider = %candidate.provider,
            "appending metadata candidate"
        );
        let q = r#"
            INSERT INTO metadata_candidates (
                track_id, provider, search_mode, title, artist, album,
                release_year, score, external_id, raw_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let created_at = Utc::now();
        let result = sqlx::query(q)
            .bind(candidate.track_id.as_i64())
            .bind(candidate.provider.as_str())
            .bind(candidate.search_mode.as_str())
            .bind(candidate.title.clone())
            .bind(candidate.artist.clone())
            .bind(candidate.album.clone())
            .bind(candidate.release_year)
            .bind(candidate.score)
            .bind(candidate.external_id.clone())
            .bind(candidate.raw_data.to_string())
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(MetadataCandidate {
            id: CandidateId(result.last_insert_rowid()),
            track_id: candidate.track_id,
            provider: candidate.provider,
            search_mode: candidate.search_mode,
            title: candidate.title,
            artist: candidate.artist,
            album: candidate.album,
            release_year: candidate.release_year,
            score: candidate.score,
            external_id: candidate.external_id,
            raw_data: candidate.raw_data,
            created_at,
        })
    }

    async fn list_for_track(&self, track_id: TrackId) -> Result<Vec<MetadataCandidate>> {
        debug!(target: "repository", %track_id, "listing candidates");
        let rows = sqlx::query(
            "SELECT * FROM metadata_candidates WHERE track_id = ? ORDER BY score DESC, id",
        )
        .bind(track_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_candidate).collect()
    }

    async fn list_for_track_by_provider(
        &self,
        track_id: TrackId,
        provider: ProviderKind,
    ) -> Result<Vec<MetadataCandidate>> {
        let rows = sqlx::query(
            "SELECT * FROM metadata_candidates WHERE track_id = ? AND provider = ? ORDER BY score DESC, id",
        )
        .bind(track_id.as_i64())
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_candidate).collect()
    }

    async fn count_for_track(&self, track_id: TrackId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM metadata_candidates WHERE track_id = ?")
            .bind(track_id.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

// ============================================================================

fn parse_dt(s: String) -> Result<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Fallback to SQLite default CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
    let ndt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn parse_json(s: String) -> serde_json::Value {
    serde_json::from_str(&s).unwrap_or(serde_json::Value::Null)
}

fn row_to_track(row: &sqlx::sqlite::SqliteRow) -> Result<Track> {
    let technical: String = row.try_get("technical")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Track {
        id: TrackId(row.try_get("id")?),
        file_path: row.try_get("file_path")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        release_year: row.try_get("release_year")?,
        genre: row.try_get("genre")?,
        technical: parse_json(technical),
        needs_fixing: row.try_get("needs_fixing")?,
        created_at: parse_dt(created_at)?,
        updated_at: parse_dt(updated_at)?,
    })
}

fn row_to_candidate(row: &sqlx::sqlite::SqliteRow) -> Result<MetadataCandidate> {
    let provider: String = row.try_get("provider")?;
    let search_mode: String = row.try_get("search_mode")?;
    let raw_data: String = row.try_get("raw_data")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(MetadataCandidate {
        id: CandidateId(row.try_get("id")?),
        track_id: TrackId(row.try_get("track_id")?),
        provider: provider
            .parse::<ProviderKind>()
            .map_err(|e| anyhow!("{e}"))?,
        search_mode: search_mode
            .parse::<SearchMode>()
            .map_err(|e| anyhow!("unknown search mode: {e}"))?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        release_year: row.try_get("release_year")?,
        score: row.try_get("score")?,
        external_id: row.try_get("external_id")?,
        raw_data: parse_json(raw_data),
        created_at: parse_dt(created_at)?,
    })
}
