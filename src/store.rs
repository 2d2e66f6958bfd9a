//! SQLite record store for crawled playlists and their track rows.
//!
//! Reads come back in a fixed natural order (playlists by play count, tracks
//! by popularity, then insertion id) so every downstream first-seen tie-break
//! is repeatable across runs.

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::group::group_by;
use crate::models::{split_tags, PlaylistRecord, PlaylistSortField, TrackRecord, TrackSortField};
use crate::numeric::format_duration_ms;

const DB_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        playlist_id TEXT UNIQUE NOT NULL,
        playlist_name TEXT,
        creator_name TEXT,
        creator_id TEXT,
        play_count INTEGER DEFAULT 0,
        subscribed_count INTEGER DEFAULT 0,
        track_count INTEGER DEFAULT 0,
        share_count INTEGER DEFAULT 0,
        comment_count INTEGER DEFAULT 0,
        tags TEXT,
        description TEXT,
        cover_img_url TEXT,
        playlist_url TEXT,
        create_time TEXT,
        crawl_time TEXT
    );

    CREATE TABLE IF NOT EXISTS tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id TEXT NOT NULL,
        song_name TEXT,
        artist TEXT,
        artist_id TEXT,
        album TEXT,
        album_id TEXT,
        duration_ms INTEGER DEFAULT 0,
        duration_format TEXT,
        popularity INTEGER DEFAULT 0,
        position INTEGER DEFAULT 0,
        publish_time TEXT,
        song_url TEXT,
        cover_url TEXT,
        playlist_id TEXT NOT NULL,
        crawl_time TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_playlist_id ON playlists(playlist_id);
    CREATE INDEX IF NOT EXISTS idx_play_count ON playlists(play_count);
    CREATE INDEX IF NOT EXISTS idx_song_id ON tracks(song_id);
    CREATE INDEX IF NOT EXISTS idx_artist ON tracks(artist);
    CREATE INDEX IF NOT EXISTS idx_track_playlist_id ON tracks(playlist_id);
"#;

const PLAYLIST_COLUMNS: &str = "playlist_id, playlist_name, creator_name, creator_id, \
     play_count, subscribed_count, track_count, share_count, comment_count, \
     tags, description, cover_img_url, playlist_url, create_time, crawl_time";

const TRACK_COLUMNS: &str = "song_id, song_name, artist, artist_id, album, album_id, \
     duration_ms, duration_format, popularity, position, publish_time, song_url, \
     cover_url, playlist_id, crawl_time";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record without the identifier it is keyed on.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// How track rows for an already-crawled playlist are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IngestPolicy {
    /// Plain insert. Re-crawling a playlist accumulates duplicate rows.
    #[default]
    Append,
    /// Delete the playlist's existing rows in the same transaction first.
    ReplacePlaylist,
}

/// Anything that can hand over the two full record collections.
pub trait RecordSource {
    fn get_all_playlists(&self) -> StoreResult<Vec<PlaylistRecord>>;
    fn get_all_tracks(&self) -> StoreResult<Vec<TrackRecord>>;
}

/// Store-side summary counters, computed in SQL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub playlist_count: u64,
    pub total_play_count: u64,
    pub avg_play_count: f64,
    pub max_play_count: u64,
    pub total_subscribed_count: u64,
    pub avg_subscribed_count: f64,
    pub max_subscribed_count: u64,
    pub track_rows: u64,
    pub unique_songs: u64,
    pub unique_artists: u64,
    pub unique_albums: u64,
    pub avg_duration_ms: f64,
    pub avg_popularity: f64,
    pub playlists_with_tracks: u64,
}

fn sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn counter(row: &Row, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0).max(0) as u64)
}

fn text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn playlist_from_row(row: &Row) -> rusqlite::Result<PlaylistRecord> {
    Ok(PlaylistRecord {
        playlist_id: row.get(0)?,
        name: text(row, 1)?,
        creator_name: text(row, 2)?,
        creator_id: text(row, 3)?,
        play_count: counter(row, 4)?,
        subscribed_count: counter(row, 5)?,
        track_count: counter(row, 6)?,
        share_count: counter(row, 7)?,
        comment_count: counter(row, 8)?,
        tags: split_tags(&text(row, 9)?),
        description: row.get(10)?,
        cover_url: text(row, 11)?,
        playlist_url: text(row, 12)?,
        create_time: row.get(13)?,
        crawl_time: row.get(14)?,
    })
}

fn track_from_row(row: &Row) -> rusqlite::Result<TrackRecord> {
    Ok(TrackRecord {
        song_id: row.get(0)?,
        name: text(row, 1)?,
        artist: text(row, 2)?,
        artist_id: text(row, 3)?,
        album: text(row, 4)?,
        album_id: text(row, 5)?,
        duration_ms: counter(row, 6)?,
        duration_format: text(row, 7)?,
        popularity: counter(row, 8)?.min(100) as u8,
        position: counter(row, 9)?.min(u32::MAX as u64) as u32,
        publish_time: text(row, 10)?,
        song_url: text(row, 11)?,
        cover_url: text(row, 12)?,
        playlist_id: row.get(13)?,
        crawl_time: row.get(14)?,
    })
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(DB_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn insert_playlist(&mut self, playlist: &PlaylistRecord) -> StoreResult<usize> {
        self.insert_playlists(std::slice::from_ref(playlist))
    }

    /// Insert-or-replace keyed on playlist id, one transaction for the batch.
    pub fn insert_playlists(&mut self, playlists: &[PlaylistRecord]) -> StoreResult<usize> {
        if let Some(bad) = playlists.iter().find(|p| p.playlist_id.trim().is_empty()) {
            return Err(StoreError::InvalidRecord(format!(
                "playlist '{}' has an empty playlist_id",
                bad.name
            )));
        }

        let now = Utc::now();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO playlists (playlist_id, playlist_name, creator_name, creator_id,
                     play_count, subscribed_count, track_count, share_count, comment_count,
                     tags, description, cover_img_url, playlist_url, create_time, crawl_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(playlist_id) DO UPDATE SET
                     playlist_name=excluded.playlist_name,
                     creator_name=excluded.creator_name,
                     creator_id=excluded.creator_id,
                     play_count=excluded.play_count,
                     subscribed_count=excluded.subscribed_count,
                     track_count=excluded.track_count,
                     share_count=excluded.share_count,
                     comment_count=excluded.comment_count,
                     tags=excluded.tags,
                     description=excluded.description,
                     cover_img_url=excluded.cover_img_url,
                     playlist_url=excluded.playlist_url,
                     create_time=excluded.create_time,
                     crawl_time=excluded.crawl_time",
            )?;

            for p in playlists {
                stmt.execute(params![
                    p.playlist_id,
                    p.name,
                    p.creator_name,
                    p.creator_id,
                    sql_int(p.play_count),
                    sql_int(p.subscribed_count),
                    sql_int(p.track_count),
                    sql_int(p.share_count),
                    sql_int(p.comment_count),
                    p.tags.join(","),
                    p.description,
                    p.cover_url,
                    p.playlist_url,
                    p.create_time,
                    p.crawl_time.unwrap_or(now),
                ])?;
            }
        }
        tx.commit()?;

        debug!(rows = playlists.len(), "Upserted playlists");
        Ok(playlists.len())
    }

    /// Insert track rows in one transaction.
    ///
    /// With `IngestPolicy::ReplacePlaylist` every playlist present in `tracks`
    /// loses its existing rows first, so a batch must carry all of a
    /// playlist's rows.
    pub fn insert_tracks(&mut self, tracks: &[TrackRecord], policy: IngestPolicy) -> StoreResult<usize> {
        if let Some(bad) = tracks
            .iter()
            .find(|t| t.song_id.trim().is_empty() || t.playlist_id.trim().is_empty())
        {
            return Err(StoreError::InvalidRecord(format!(
                "track '{}' needs both song_id and playlist_id",
                bad.name
            )));
        }

        let now = Utc::now();
        let tx = self.conn.transaction()?;
        {
            if policy == IngestPolicy::ReplacePlaylist {
                let owners: FxHashSet<&str> = tracks.iter().map(|t| t.playlist_id.as_str()).collect();
                let mut delete = tx.prepare_cached("DELETE FROM tracks WHERE playlist_id = ?1")?;
                for owner in owners {
                    let removed = delete.execute(params![owner])?;
                    if removed > 0 {
                        debug!(playlist_id = owner, removed, "Replaced existing track rows");
                    }
                }
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO tracks (song_id, song_name, artist, artist_id, album, album_id,
                     duration_ms, duration_format, popularity, position, publish_time, song_url,
                     cover_url, playlist_id, crawl_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;

            for t in tracks {
                let duration_format = if t.duration_format.is_empty() {
                    format_duration_ms(t.duration_ms)
                } else {
                    t.duration_format.clone()
                };
                stmt.execute(params![
                    t.song_id,
                    t.name,
                    t.artist,
                    t.artist_id,
                    t.album,
                    t.album_id,
                    sql_int(t.duration_ms),
                    duration_format,
                    t.popularity,
                    t.position,
                    t.publish_time,
                    t.song_url,
                    t.cover_url,
                    t.playlist_id,
                    t.crawl_time.unwrap_or(now),
                ])?;
            }
        }
        tx.commit()?;

        debug!(rows = tracks.len(), ?policy, "Inserted tracks");
        Ok(tracks.len())
    }

    pub fn get_all_playlists(&self) -> StoreResult<Vec<PlaylistRecord>> {
        let sql = format!(
            "SELECT {} FROM playlists ORDER BY play_count DESC, id ASC",
            PLAYLIST_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let playlists = stmt
            .query_map([], playlist_from_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(playlists)
    }

    pub fn get_all_tracks(&self) -> StoreResult<Vec<TrackRecord>> {
        let sql = format!(
            "SELECT {} FROM tracks ORDER BY popularity DESC, id ASC",
            TRACK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(tracks)
    }

    pub fn get_playlist_by_id(&self, playlist_id: &str) -> StoreResult<Option<PlaylistRecord>> {
        let sql = format!("SELECT {} FROM playlists WHERE playlist_id = ?1", PLAYLIST_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![playlist_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(playlist_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_top_playlists(&self, n: usize, field: PlaylistSortField) -> StoreResult<Vec<PlaylistRecord>> {
        let sql = format!(
            "SELECT {} FROM playlists ORDER BY {} DESC, id ASC LIMIT ?1",
            PLAYLIST_COLUMNS,
            field.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let playlists = stmt
            .query_map(params![sql_int(n as u64)], playlist_from_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(playlists)
    }

    pub fn get_tracks_by_playlist(&self, playlist_id: &str) -> StoreResult<Vec<TrackRecord>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE playlist_id = ?1 ORDER BY position ASC, id ASC",
            TRACK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params![playlist_id], track_from_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(tracks)
    }

    pub fn get_top_tracks(&self, n: usize, field: TrackSortField) -> StoreResult<Vec<TrackRecord>> {
        let sql = format!(
            "SELECT {} FROM tracks ORDER BY {} DESC, id ASC LIMIT ?1",
            TRACK_COLUMNS,
            field.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params![sql_int(n as u64)], track_from_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(tracks)
    }

    pub fn summary(&self) -> StoreResult<StoreSummary> {
        let (
            playlist_count,
            total_play_count,
            avg_play_count,
            max_play_count,
            total_subscribed_count,
            avg_subscribed_count,
            max_subscribed_count,
        ) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(play_count), 0), COALESCE(AVG(play_count), 0.0), COALESCE(MAX(play_count), 0),
                    COALESCE(SUM(subscribed_count), 0), COALESCE(AVG(subscribed_count), 0.0),
                    COALESCE(MAX(subscribed_count), 0)
             FROM playlists",
            [],
            |row| {
                Ok((
                    counter(row, 0)?,
                    counter(row, 1)?,
                    row.get::<_, f64>(2)?,
                    counter(row, 3)?,
                    counter(row, 4)?,
                    row.get::<_, f64>(5)?,
                    counter(row, 6)?,
                ))
            },
        )?;

        let (track_rows, unique_songs, unique_artists, unique_albums, avg_duration_ms, avg_popularity, playlists_with_tracks) =
            self.conn.query_row(
                "SELECT COUNT(*),
                        COUNT(DISTINCT song_id),
                        COUNT(DISTINCT NULLIF(TRIM(COALESCE(artist, '')), '')),
                        COUNT(DISTINCT NULLIF(TRIM(COALESCE(album, '')), '')),
                        COALESCE(AVG(duration_ms), 0.0),
                        COALESCE(AVG(popularity), 0.0),
                        COUNT(DISTINCT playlist_id)
                 FROM tracks",
                [],
                |row| {
                    Ok((
                        counter(row, 0)?,
                        counter(row, 1)?,
                        counter(row, 2)?,
                        counter(row, 3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        counter(row, 6)?,
                    ))
                },
            )?;

        Ok(StoreSummary {
            playlist_count,
            total_play_count,
            avg_play_count,
            max_play_count,
            total_subscribed_count,
            avg_subscribed_count,
            max_subscribed_count,
            track_rows,
            unique_songs,
            unique_artists,
            unique_albums,
            avg_duration_ms,
            avg_popularity,
            playlists_with_tracks,
        })
    }

    /// Delete every playlist and track row.
    pub fn clear_all(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let tracks = tx.execute("DELETE FROM tracks", [])?;
        let playlists = tx.execute("DELETE FROM playlists", [])?;
        tx.commit()?;
        info!(playlists, tracks, "Cleared store");
        Ok(())
    }
}

/// Pack track rows into write batches of about `max_rows`, never splitting one
/// playlist's rows across batches. A playlist larger than `max_rows` gets a
/// batch of its own.
pub fn playlist_batches(tracks: &[TrackRecord], max_rows: usize) -> Vec<Vec<TrackRecord>> {
    let mut batches: Vec<Vec<TrackRecord>> = Vec::new();
    let mut current: Vec<TrackRecord> = Vec::new();

    for (_, rows) in group_by(tracks, |t| Some(t.playlist_id.clone())) {
        if !current.is_empty() && current.len() + rows.len() > max_rows {
            batches.push(std::mem::take(&mut current));
        }
        current.extend(rows.into_iter().cloned());
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

impl RecordSource for Store {
    fn get_all_playlists(&self) -> StoreResult<Vec<PlaylistRecord>> {
        Store::get_all_playlists(self)
    }

    fn get_all_tracks(&self) -> StoreResult<Vec<TrackRecord>> {
        Store::get_all_tracks(self)
    }
}
