//! Core data models for playlist analytics.
//!
//! This module contains the typed playlist/track records read from the store
//! and every derived aggregate the analysis produces.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Records
// ============================================================================

/// One curated playlist as observed at crawl time.
///
/// Counters absent from source data decode as 0 and negative values are
/// clamped to 0, so every counter is a plain `u64`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistRecord {
    #[serde(deserialize_with = "de_id")]
    pub playlist_id: String,
    #[serde(alias = "playlist_name", deserialize_with = "de_text")]
    pub name: String,
    #[serde(deserialize_with = "de_text")]
    pub creator_name: String,
    #[serde(deserialize_with = "de_id")]
    pub creator_id: String,
    #[serde(deserialize_with = "de_counter")]
    pub play_count: u64,
    #[serde(deserialize_with = "de_counter")]
    pub subscribed_count: u64,
    #[serde(deserialize_with = "de_counter")]
    pub track_count: u64,
    #[serde(deserialize_with = "de_counter")]
    pub share_count: u64,
    #[serde(deserialize_with = "de_counter")]
    pub comment_count: u64,
    /// Tags in source order. Ingest accepts a JSON array or a comma-joined string.
    #[serde(deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    pub description: Option<String>,
    #[serde(alias = "cover_img_url", deserialize_with = "de_text")]
    pub cover_url: String,
    #[serde(deserialize_with = "de_text")]
    pub playlist_url: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "de_timestamp")]
    pub crawl_time: Option<DateTime<Utc>>,
}

/// One song's appearance within one playlist.
///
/// `song_id` is not unique across records: the same song yields one row per
/// playlist it belongs to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRecord {
    #[serde(deserialize_with = "de_id")]
    pub song_id: String,
    #[serde(alias = "song_name", deserialize_with = "de_text")]
    pub name: String,
    /// Comma-joined when the song has several artists.
    #[serde(deserialize_with = "de_text")]
    pub artist: String,
    /// First artist only.
    #[serde(deserialize_with = "de_id")]
    pub artist_id: String,
    #[serde(deserialize_with = "de_text")]
    pub album: String,
    #[serde(deserialize_with = "de_id")]
    pub album_id: String,
    #[serde(alias = "duration", deserialize_with = "de_counter")]
    pub duration_ms: u64,
    /// `M:SS`; filled from `duration_ms` on ingest when empty.
    #[serde(deserialize_with = "de_text")]
    pub duration_format: String,
    #[serde(deserialize_with = "de_popularity")]
    pub popularity: u8,
    /// 1-based position within the owning playlist.
    #[serde(deserialize_with = "de_position")]
    pub position: u32,
    #[serde(deserialize_with = "de_text")]
    pub publish_time: String,
    #[serde(deserialize_with = "de_text")]
    pub song_url: String,
    #[serde(deserialize_with = "de_text")]
    pub cover_url: String,
    #[serde(deserialize_with = "de_id")]
    pub playlist_id: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub crawl_time: Option<DateTime<Utc>>,
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Identifiers arrive as strings or bare integers depending on the dump.
fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<RawId>::deserialize(d)? {
        None => String::new(),
        Some(RawId::Text(s)) => s,
        Some(RawId::Number(n)) => n.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
}

/// Integer or float (rounded); null and absent become 0.
fn de_number<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Option::<RawNumber>::deserialize(d)? {
        None => 0,
        Some(RawNumber::Int(n)) => n,
        Some(RawNumber::Float(f)) if f.is_finite() => f.round() as i64,
        Some(RawNumber::Float(_)) => 0,
    })
}

fn de_counter<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(de_number(d)?.max(0) as u64)
}

fn de_popularity<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    Ok(de_number(d)?.clamp(0, 100) as u8)
}

fn de_position<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(de_number(d)?.clamp(0, u32::MAX as i64) as u32)
}

/// Crawl dumps write local `%Y-%m-%d %H:%M:%S`, stores write RFC 3339.
const CRAWL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Text(String),
    Millis(i64),
}

/// Parse a timestamp in any of the accepted text forms. Empty or
/// unrecognized text is treated as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, CRAWL_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Timestamps as RFC 3339, crawl-format text or epoch milliseconds.
fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<RawTime>::deserialize(d)? {
        None => None,
        Some(RawTime::Text(s)) => parse_timestamp(&s),
        Some(RawTime::Millis(ms)) => DateTime::from_timestamp_millis(ms),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTags {
    Joined(String),
    List(Vec<String>),
}

fn de_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw: Option<RawTags> = Option::deserialize(d)?;
    Ok(match raw {
        None => Vec::new(),
        Some(RawTags::Joined(s)) => split_tags(&s),
        Some(RawTags::List(list)) => list,
    })
}

/// Split a comma-joined tag string, trimming whitespace and dropping empty tokens.
pub fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Literal bucket used when a grouping key (creator, artist) is missing.
pub const UNKNOWN_KEY: &str = "unknown";

/// Grouping key for a free-text field: trimmed value, or [`UNKNOWN_KEY`] when empty.
pub fn group_key(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN_KEY
    } else {
        trimmed
    }
}

// ============================================================================
// Sort Fields
// ============================================================================

/// Field used to rank playlists. Unrecognized names fall back to play count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaylistSortField {
    #[default]
    PlayCount,
    SubscribedCount,
    TrackCount,
}

impl PlaylistSortField {
    pub fn value(self, p: &PlaylistRecord) -> u64 {
        match self {
            PlaylistSortField::PlayCount => p.play_count,
            PlaylistSortField::SubscribedCount => p.subscribed_count,
            PlaylistSortField::TrackCount => p.track_count,
        }
    }

    /// Store column backing this field.
    pub fn column(self) -> &'static str {
        match self {
            PlaylistSortField::PlayCount => "play_count",
            PlaylistSortField::SubscribedCount => "subscribed_count",
            PlaylistSortField::TrackCount => "track_count",
        }
    }
}

impl From<&str> for PlaylistSortField {
    fn from(s: &str) -> Self {
        match s {
            "subscribed_count" => PlaylistSortField::SubscribedCount,
            "track_count" => PlaylistSortField::TrackCount,
            _ => PlaylistSortField::PlayCount,
        }
    }
}

/// Field used to rank track rows. Unrecognized names fall back to popularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSortField {
    #[default]
    Popularity,
    Duration,
}

impl TrackSortField {
    pub fn value(self, t: &TrackRecord) -> u64 {
        match self {
            TrackSortField::Popularity => t.popularity as u64,
            TrackSortField::Duration => t.duration_ms,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            TrackSortField::Popularity => "popularity",
            TrackSortField::Duration => "duration_ms",
        }
    }
}

impl From<&str> for TrackSortField {
    fn from(s: &str) -> Self {
        match s {
            "duration" | "duration_ms" => TrackSortField::Duration,
            _ => TrackSortField::Popularity,
        }
    }
}

/// Secondary ordering for cross-collection songs with equal playlist counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOrdering {
    /// Lower mean position first (songs placed early in playlists win).
    EarliestPosition,
    /// Higher mean popularity first.
    Popularity,
}

// ============================================================================
// Playlist Aggregates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistStats {
    pub total_playlists: usize,
    pub total_play_count: u64,
    pub total_subscribed_count: u64,
    pub avg_play_count: f64,
    pub avg_subscribed_count: f64,
    pub avg_track_count: f64,
    pub max_play_count: u64,
    pub max_subscribed_count: u64,
    pub total_creators: usize,
}

/// Per-creator totals. Means are truncated to whole counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorStats {
    pub creator_name: String,
    pub playlist_count: usize,
    pub total_play_count: u64,
    pub avg_play_count: u64,
    pub total_subscribed_count: u64,
    pub avg_subscribed_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPlaylist {
    pub playlist_id: String,
    pub name: String,
    pub creator_name: String,
    pub play_count: u64,
    pub subscribed_count: u64,
    pub score: f64,
}

/// Composite popularity (0.6 × normalized plays + 0.4 × normalized subscriptions).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularityAnalysis {
    pub top_playlists: Vec<ScoredPlaylist>,
    pub avg_popularity_score: f64,
    /// Playlists scoring strictly above 0.5.
    pub high_popularity_count: usize,
}

// ============================================================================
// Track Aggregates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStats {
    pub total_tracks: usize,
    pub unique_songs: usize,
    pub total_artists: usize,
    pub total_albums: usize,
    pub avg_duration_ms: f64,
    pub avg_popularity: f64,
    pub max_popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistStats {
    pub artist: String,
    pub song_count: usize,
    pub avg_popularity: u64,
    pub avg_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumStats {
    pub album: String,
    pub song_count: usize,
    /// First-seen artist for the album.
    pub artist: String,
    pub avg_popularity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumPopularity {
    pub album: String,
    pub song_count: usize,
    pub avg_popularity: f64,
}

/// A song that appears under several distinct playlists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossPlaylistSong {
    pub song_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Distinct owning playlists, never the raw row count.
    pub playlist_count: usize,
    pub avg_position: f64,
    pub avg_popularity: f64,
}

/// Artist dimensions min-max normalized to 0-100 across the compared artists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileScores {
    pub song_count: f64,
    pub avg_popularity: f64,
    pub max_popularity: f64,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistProfile {
    pub artist: String,
    pub song_count: usize,
    pub avg_popularity: f64,
    pub max_popularity: u8,
    pub avg_duration_ms: f64,
    pub scores: ProfileScores,
}
