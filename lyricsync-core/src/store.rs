use crate::document::LyricsSource;
use crate::error::Result;
use crate::time::DurationExt;
use crate::track::TrackIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS lyrics (
    track_key TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    album TEXT,
    duration_ms INTEGER,
    content TEXT NOT NULL,
    source TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lyrics_artist_title ON lyrics(artist, title);
";

/// Raw LRC text persisted for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLyrics {
    pub content: String,
    pub source: LyricsSource,
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator for editing sessions.
///
/// Stores the serialized document, so anything saved here round-trips
/// through the LRC codec.
#[async_trait]
pub trait LyricsStore: Send + Sync {
    /// Load the stored text for a track, if any.
    async fn load_raw(&self, track: &TrackIdentity) -> Result<Option<StoredLyrics>>;

    /// Insert or replace the stored text for a track.
    async fn save_raw(&self, track: &TrackIdentity, raw: &str, source: LyricsSource) -> Result<()>;
}

/// SQLite-backed lyrics store keyed by [`TrackIdentity::key`]
pub struct SqliteLyricsStore {
    conn: Connection,
}

impl SqliteLyricsStore {
    /// Open a store at a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening lyrics database at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await?;

        info!("Lyrics database initialized");
        Ok(Self { conn })
    }

    /// In-memory store, used by tests and dry runs
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Remove the stored lyrics for a track. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, track: &TrackIdentity) -> Result<bool> {
        let key = track.key();
        self.conn
            .call(move |conn| {
                let deleted =
                    conn.execute("DELETE FROM lyrics WHERE track_key = ?1", rusqlite::params![key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Into::into)
    }

    /// Checkpoint WAL for clean shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL checkpoint fails.
    pub async fn checkpoint(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl LyricsStore for SqliteLyricsStore {
    async fn load_raw(&self, track: &TrackIdentity) -> Result<Option<StoredLyrics>> {
        let key = track.key();
        debug!("Loading stored lyrics for {key}");

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT content, source, updated_at FROM lyrics WHERE track_key = ?1",
                )?;

                let stored = stmt
                    .query_row(rusqlite::params![key], |row| {
                        Ok(StoredLyrics {
                            content: row.get(0)?,
                            source: LyricsSource::from_tag(&row.get::<_, String>(1)?)
                                .unwrap_or_default(),
                            updated_at: DateTime::from_timestamp(row.get::<_, i64>(2)?, 0)
                                .unwrap_or_else(Utc::now),
                        })
                    })
                    .optional()?;

                Ok(stored)
            })
            .await
            .map_err(Into::into)
    }

    async fn save_raw(&self, track: &TrackIdentity, raw: &str, source: LyricsSource) -> Result<()> {
        let key = track.key();
        debug!("Saving lyrics for {key} ({source})");

        let title = track.title.clone();
        let artist = track.artist.clone();
        let album = track.album.clone();
        let duration_ms = track.duration.map(|d| d.as_millis_i64());
        let content = raw.to_string();
        let now = Utc::now().timestamp();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r"
                    INSERT INTO lyrics (track_key, title, artist, album, duration_ms, content, source, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(track_key) DO UPDATE SET
                        title = excluded.title,
                        artist = excluded.artist,
                        album = excluded.album,
                        duration_ms = excluded.duration_ms,
                        content = excluded.content,
                        source = excluded.source,
                        updated_at = excluded.updated_at
                ",
                    rusqlite::params![
                        key,
                        title,
                        artist,
                        album,
                        duration_ms,
                        content,
                        source.as_str(),
                        now
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}
