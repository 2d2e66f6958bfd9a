//! One full analysis run: snapshot the store, compute every aggregate, and
//! bundle the results into a serializable report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::distribution::Distribution;
use crate::keywords::extract_keywords;
use crate::models::{
    AlbumPopularity, AlbumStats, ArtistProfile, ArtistStats, CreatorStats, CrossOrdering,
    CrossPlaylistSong, KeywordCount, PlaylistRecord, PlaylistSortField, PlaylistStats,
    PopularityAnalysis, TagCount, TrackRecord, TrackSortField, TrackStats,
};
use crate::numeric::{format_duration_ms, format_large_number};
use crate::observer::Observer;
use crate::store::{RecordSource, StoreResult};
use crate::{playlists, tracks};

/// Both record collections, read once and held in memory for a run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub playlists: Vec<PlaylistRecord>,
    pub tracks: Vec<TrackRecord>,
}

impl Snapshot {
    pub fn new(playlists: Vec<PlaylistRecord>, tracks: Vec<TrackRecord>) -> Self {
        Self { playlists, tracks }
    }

    pub fn load<S: RecordSource + ?Sized>(source: &S) -> StoreResult<Self> {
        Ok(Self {
            playlists: source.get_all_playlists()?,
            tracks: source.get_all_tracks()?,
        })
    }
}

impl RecordSource for Snapshot {
    fn get_all_playlists(&self) -> StoreResult<Vec<PlaylistRecord>> {
        Ok(self.playlists.clone())
    }

    fn get_all_tracks(&self) -> StoreResult<Vec<TrackRecord>> {
        Ok(self.tracks.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,

    // Playlists
    pub playlist_stats: Option<PlaylistStats>,
    pub top_playlists_by_play: Vec<PlaylistRecord>,
    pub top_playlists_by_subscribed: Vec<PlaylistRecord>,
    pub creators: Vec<CreatorStats>,
    pub tags: Vec<TagCount>,
    pub scale_distribution: Distribution,
    pub popularity: Option<PopularityAnalysis>,
    pub play_subscribe_pairs: Vec<(u64, u64)>,
    pub keywords: Vec<KeywordCount>,

    // Tracks
    pub track_stats: Option<TrackStats>,
    pub top_tracks: Vec<TrackRecord>,
    pub artists: Vec<ArtistStats>,
    pub albums: Vec<AlbumStats>,
    pub album_popularity: Vec<AlbumPopularity>,
    pub duration_distribution: Distribution,
    pub popularity_distribution: Distribution,
    pub cross_playlist_by_position: Vec<CrossPlaylistSong>,
    pub cross_playlist_by_popularity: Vec<CrossPlaylistSong>,
    pub canonical_track_count: usize,
    pub canonical_tracks: Vec<TrackRecord>,
    pub artist_profiles: Vec<ArtistProfile>,
}

fn note_empty(observer: &dyn Observer, stage: &str, empty: bool, what: &str) {
    if empty {
        observer.warn(stage, &format!("no {}", what));
    }
}

/// Compute every aggregate over `snapshot`. Never fails; sections with no
/// data come back empty and are reported to `observer` at warn level.
pub fn build_report(
    snapshot: &Snapshot,
    config: &AnalysisConfig,
    observer: &dyn Observer,
) -> AnalysisReport {
    let pls = &snapshot.playlists;
    let trs = &snapshot.tracks;

    observer.info(
        "load",
        &format!("{} playlists, {} track rows", pls.len(), trs.len()),
    );

    let playlist_stats = playlists::basic_statistics(pls);
    note_empty(observer, "playlists", playlist_stats.is_none(), "playlist data");

    let top_playlists_by_play = playlists::top_playlists(pls, config.top_playlists, PlaylistSortField::PlayCount);
    let top_playlists_by_subscribed =
        playlists::top_playlists(pls, config.top_playlists, PlaylistSortField::SubscribedCount);
    let creators = playlists::creator_distribution(pls, config.top_creators);
    observer.debug("creators", &format!("{} creators ranked", creators.len()));

    let tags = playlists::tag_distribution(pls, config.top_tags);
    note_empty(observer, "tags", tags.is_empty(), "tags");

    let scale_distribution = playlists::scale_distribution(pls);
    let popularity = playlists::popularity_analysis(pls);
    note_empty(observer, "popularity", popularity.is_none(), "play/subscribe signal to score");
    let play_subscribe_pairs = playlists::play_subscribe_pairs(pls);

    let tokenizer = config.tokenizer.build();
    let keywords = extract_keywords(pls, config.top_keywords, tokenizer.as_ref(), &config.stopwords());
    note_empty(observer, "keywords", keywords.is_empty(), "description keywords");
    observer.debug("keywords", &format!("{} keywords kept", keywords.len()));

    let track_stats = tracks::basic_statistics(trs);
    note_empty(observer, "tracks", track_stats.is_none(), "track data");

    let top_tracks = tracks::top_tracks(trs, config.top_tracks, TrackSortField::Popularity);
    let artists = tracks::artist_distribution(trs, config.top_artists);
    let albums = tracks::album_distribution(trs, config.top_albums);
    let album_popularity = tracks::album_popularity(trs, config.top_albums);
    let duration_distribution = tracks::duration_distribution(trs);
    let popularity_distribution = tracks::popularity_distribution(trs);

    let cross_playlist_by_position =
        tracks::cross_playlist_songs(trs, config.min_cross_playlists, CrossOrdering::EarliestPosition);
    let cross_playlist_by_popularity =
        tracks::cross_playlist_songs(trs, config.min_cross_playlists, CrossOrdering::Popularity);
    observer.info(
        "cross-playlist",
        &format!(
            "{} songs in at least {} playlists",
            cross_playlist_by_position.len(),
            config.min_cross_playlists
        ),
    );

    let mut canonical_tracks = tracks::unique_tracks(trs);
    let canonical_track_count = canonical_tracks.len();
    canonical_tracks.truncate(config.top_tracks);
    observer.debug(
        "dedup",
        &format!("{} rows collapse to {} songs", trs.len(), canonical_track_count),
    );

    let artist_profiles = tracks::artist_profiles(trs, config.artist_profile_size);

    observer.info("report", "analysis complete");

    AnalysisReport {
        generated_at: Utc::now(),
        playlist_stats,
        top_playlists_by_play,
        top_playlists_by_subscribed,
        creators,
        tags,
        scale_distribution,
        popularity,
        play_subscribe_pairs,
        keywords,
        track_stats,
        top_tracks,
        artists,
        albums,
        album_popularity,
        duration_distribution,
        popularity_distribution,
        cross_playlist_by_position,
        cross_playlist_by_popularity,
        canonical_track_count,
        canonical_tracks,
        artist_profiles,
    }
}

impl AnalysisReport {
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))
    }

    pub fn print_summary(&self) {
        println!("\n{:=<60}", "");
        println!("Playlist analysis");
        println!("{:=<60}", "");

        match &self.playlist_stats {
            Some(s) => {
                println!("  Playlists: {}", s.total_playlists);
                println!("  Creators: {}", s.total_creators);
                println!(
                    "  Plays: {} total, {} avg, {} max",
                    format_large_number(s.total_play_count),
                    format_large_number(s.avg_play_count as u64),
                    format_large_number(s.max_play_count)
                );
                println!(
                    "  Subscriptions: {} total, {} avg",
                    format_large_number(s.total_subscribed_count),
                    format_large_number(s.avg_subscribed_count as u64)
                );
                println!("  Avg tracks per playlist: {:.1}", s.avg_track_count);
            }
            None => println!("  No playlist data"),
        }

        if let Some(t) = &self.track_stats {
            println!(
                "  Track rows: {} ({} unique songs, {} artists, {} albums)",
                t.total_tracks, t.unique_songs, t.total_artists, t.total_albums
            );
            println!(
                "  Avg duration: {}, avg popularity: {:.1}",
                format_duration_ms(t.avg_duration_ms as u64),
                t.avg_popularity
            );
        }

        if !self.top_playlists_by_play.is_empty() {
            println!("\nTop playlists by plays:");
            for (i, p) in self.top_playlists_by_play.iter().take(10).enumerate() {
                println!(
                    "  {:>2}. {} ({}) - {} plays",
                    i + 1,
                    p.name,
                    p.creator_name,
                    format_large_number(p.play_count)
                );
            }
        }

        if !self.tags.is_empty() {
            let tags: Vec<String> = self
                .tags
                .iter()
                .take(10)
                .map(|t| format!("{} ({})", t.tag, t.count))
                .collect();
            println!("\nTop tags: {}", tags.join(", "));
        }

        if !self.keywords.is_empty() {
            let words: Vec<&str> = self.keywords.iter().take(15).map(|k| k.word.as_str()).collect();
            println!("Keywords: {}", words.join(" "));
        }

        if !self.artists.is_empty() {
            println!("\nTop artists:");
            for a in self.artists.iter().take(10) {
                println!("  {} - {} songs", a.artist, a.song_count);
            }
        }

        if !self.cross_playlist_by_position.is_empty() {
            println!("\nSongs shared across playlists:");
            for s in self.cross_playlist_by_position.iter().take(10) {
                println!("  {} - {} ({} playlists)", s.name, s.artist, s.playlist_count);
            }
        }

        println!("{:=<60}", "");
    }
}
