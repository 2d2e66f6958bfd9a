//! Track aggregations over all track rows (not deduplicated by song unless
//! stated): statistics, rankings, artist/album distributions, duration and
//! popularity histograms, cross-playlist membership and canonical dedup.
//!
//! NOTE: `popularity` is source-defined and may be near-constant; the
//! cross-playlist count is the stronger popularity signal. Both are kept.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::distribution::{
    duration_bucket, popularity_bucket, Distribution, DURATION_LABELS, POPULARITY_LABELS,
};
use crate::group::group_by;
use crate::models::{
    group_key, AlbumPopularity, AlbumStats, ArtistProfile, ArtistStats, CrossOrdering,
    CrossPlaylistSong, ProfileScores, TrackRecord, TrackSortField, TrackStats,
};
use crate::numeric::{mean, normalize_column, top_n_by};

/// Default minimum number of distinct playlists for a cross-playlist song.
pub const DEFAULT_MIN_PLAYLISTS: usize = 2;

fn album_key(t: &TrackRecord) -> Option<String> {
    let album = t.album.trim();
    (!album.is_empty()).then(|| album.to_string())
}

fn mean_popularity(group: &[&TrackRecord]) -> f64 {
    mean(group.iter().map(|t| t.popularity as f64)).unwrap_or(0.0)
}

fn mean_duration(group: &[&TrackRecord]) -> f64 {
    mean(group.iter().map(|t| t.duration_ms as f64)).unwrap_or(0.0)
}

pub fn basic_statistics(tracks: &[TrackRecord]) -> Option<TrackStats> {
    if tracks.is_empty() {
        return None;
    }

    let songs: FxHashSet<&str> = tracks.iter().map(|t| t.song_id.as_str()).collect();
    let artists: FxHashSet<&str> = tracks
        .iter()
        .map(|t| t.artist.trim())
        .filter(|a| !a.is_empty())
        .collect();
    let albums: FxHashSet<&str> = tracks
        .iter()
        .map(|t| t.album.trim())
        .filter(|a| !a.is_empty())
        .collect();

    Some(TrackStats {
        total_tracks: tracks.len(),
        unique_songs: songs.len(),
        total_artists: artists.len(),
        total_albums: albums.len(),
        avg_duration_ms: mean(tracks.iter().map(|t| t.duration_ms as f64)).unwrap_or(0.0),
        avg_popularity: mean(tracks.iter().map(|t| t.popularity as f64)).unwrap_or(0.0),
        max_popularity: tracks.iter().map(|t| t.popularity).max().unwrap_or(0),
    })
}

/// The `n` track rows with the largest `field`, ties in input order.
pub fn top_tracks(tracks: &[TrackRecord], n: usize, field: TrackSortField) -> Vec<TrackRecord> {
    top_n_by(tracks, n, |t| field.value(t))
        .into_iter()
        .cloned()
        .collect()
}

/// Row counts per artist with mean popularity and duration (truncated).
pub fn artist_distribution(tracks: &[TrackRecord], n: usize) -> Vec<ArtistStats> {
    let mut stats: Vec<ArtistStats> = group_by(tracks, |t| Some(group_key(&t.artist).to_string()))
        .into_iter()
        .map(|(artist, group)| ArtistStats {
            artist,
            song_count: group.len(),
            avg_popularity: mean_popularity(&group) as u64,
            avg_duration_ms: mean_duration(&group) as u64,
        })
        .collect();

    stats.sort_by(|a, b| b.song_count.cmp(&a.song_count));
    stats.truncate(n);
    stats
}

/// Row counts per non-empty album, with the first-seen artist.
pub fn album_distribution(tracks: &[TrackRecord], n: usize) -> Vec<AlbumStats> {
    let mut stats: Vec<AlbumStats> = group_by(tracks, album_key)
        .into_iter()
        .map(|(album, group)| AlbumStats {
            album,
            song_count: group.len(),
            artist: group[0].artist.clone(),
            avg_popularity: mean_popularity(&group) as u64,
        })
        .collect();

    stats.sort_by(|a, b| b.song_count.cmp(&a.song_count));
    stats.truncate(n);
    stats
}

/// Albums ranked by mean popularity.
pub fn album_popularity(tracks: &[TrackRecord], n: usize) -> Vec<AlbumPopularity> {
    let albums: Vec<AlbumPopularity> = group_by(tracks, album_key)
        .into_iter()
        .map(|(album, group)| AlbumPopularity {
            album,
            song_count: group.len(),
            avg_popularity: mean_popularity(&group),
        })
        .collect();

    top_n_by(&albums, n, |a| a.avg_popularity)
        .into_iter()
        .cloned()
        .collect()
}

pub fn duration_distribution(tracks: &[TrackRecord]) -> Distribution {
    Distribution::tally(
        &DURATION_LABELS,
        tracks.iter().map(|t| t.duration_ms),
        duration_bucket,
    )
}

pub fn popularity_distribution(tracks: &[TrackRecord]) -> Distribution {
    Distribution::tally(
        &POPULARITY_LABELS,
        tracks.iter().map(|t| t.popularity as u64),
        popularity_bucket,
    )
}

/// Number of distinct owning playlists per song id.
pub fn playlist_membership(tracks: &[TrackRecord]) -> FxHashMap<&str, usize> {
    let mut owners: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
    for t in tracks {
        owners
            .entry(t.song_id.as_str())
            .or_default()
            .insert(t.playlist_id.as_str());
    }
    owners
        .into_iter()
        .map(|(song, playlists)| (song, playlists.len()))
        .collect()
}

/// Songs found in at least `min_playlists` distinct playlists, most shared first.
///
/// Repeated rows of a song within one playlist do not inflate its count.
/// Equal counts are ordered by `ordering`, then by first appearance.
pub fn cross_playlist_songs(
    tracks: &[TrackRecord],
    min_playlists: usize,
    ordering: CrossOrdering,
) -> Vec<CrossPlaylistSong> {
    let mut songs: Vec<CrossPlaylistSong> = group_by(tracks, |t| Some(t.song_id.clone()))
        .into_iter()
        .filter_map(|(song_id, group)| {
            let playlists: FxHashSet<&str> =
                group.iter().map(|t| t.playlist_id.as_str()).collect();
            if playlists.len() < min_playlists {
                return None;
            }
            let first = group[0];
            Some(CrossPlaylistSong {
                song_id,
                name: first.name.clone(),
                artist: first.artist.clone(),
                album: first.album.clone(),
                playlist_count: playlists.len(),
                avg_position: mean(group.iter().map(|t| t.position as f64)).unwrap_or(0.0),
                avg_popularity: mean_popularity(&group),
            })
        })
        .collect();

    songs.sort_by(|a, b| {
        b.playlist_count.cmp(&a.playlist_count).then_with(|| match ordering {
            CrossOrdering::EarliestPosition => a.avg_position.total_cmp(&b.avg_position),
            CrossOrdering::Popularity => b.avg_popularity.total_cmp(&a.avg_popularity),
        })
    });
    songs
}

/// One canonical row per song id: the highest-popularity row, first row on ties.
///
/// Canonical rows are returned in input order, so deduplicating an already
/// deduplicated collection returns it unchanged.
pub fn unique_tracks(tracks: &[TrackRecord]) -> Vec<TrackRecord> {
    let mut best: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, t) in tracks.iter().enumerate() {
        match best.get(t.song_id.as_str()) {
            Some(&j) if tracks[j].popularity >= t.popularity => {}
            _ => {
                best.insert(t.song_id.as_str(), i);
            }
        }
    }

    let mut keep: Vec<usize> = best.into_values().collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| tracks[i].clone()).collect()
}

/// Top `n` artists by row count, each dimension normalized to 0-100 across them.
pub fn artist_profiles(tracks: &[TrackRecord], n: usize) -> Vec<ArtistProfile> {
    let mut groups = group_by(tracks, |t| Some(group_key(&t.artist).to_string()));
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups.truncate(n);

    let song_counts: Vec<f64> = groups.iter().map(|(_, g)| g.len() as f64).collect();
    let avg_pops: Vec<f64> = groups.iter().map(|(_, g)| mean_popularity(g)).collect();
    let max_pops: Vec<f64> = groups
        .iter()
        .map(|(_, g)| g.iter().map(|t| t.popularity).max().unwrap_or(0) as f64)
        .collect();
    let avg_durs: Vec<f64> = groups.iter().map(|(_, g)| mean_duration(g)).collect();

    let song_scores = normalize_column(&song_counts, 0.0, 100.0);
    let avg_pop_scores = normalize_column(&avg_pops, 0.0, 100.0);
    let max_pop_scores = normalize_column(&max_pops, 0.0, 100.0);
    let dur_scores = normalize_column(&avg_durs, 0.0, 100.0);

    groups
        .into_iter()
        .enumerate()
        .map(|(i, (artist, group))| ArtistProfile {
            artist,
            song_count: group.len(),
            avg_popularity: avg_pops[i],
            max_popularity: max_pops[i] as u8,
            avg_duration_ms: avg_durs[i],
            scores: ProfileScores {
                song_count: song_scores[i],
                avg_popularity: avg_pop_scores[i],
                max_popularity: max_pop_scores[i],
                avg_duration: dur_scores[i],
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn track(song: &str, playlist: &str, pop: u8) -> TrackRecord {
        TrackRecord {
            song_id: song.to_string(),
            name: format!("Song {}", song),
            artist: "Artist".to_string(),
            playlist_id: playlist.to_string(),
            popularity: pop,
            ..Default::default()
        }
    }

    fn scenario() -> Vec<TrackRecord> {
        vec![
            track("s1", "P1", 80),
            track("s1", "P2", 60),
            track("s2", "P1", 90),
        ]
    }

    #[test]
    fn test_basic_statistics() {
        assert!(basic_statistics(&[]).is_none());

        let mut tracks = scenario();
        tracks[0].album = "A1".to_string();
        tracks[1].album = "A1".to_string();
        tracks[2].artist = "Other".to_string();
        tracks[0].duration_ms = 100_000;
        tracks[1].duration_ms = 200_000;
        tracks[2].duration_ms = 300_000;

        let stats = basic_statistics(&tracks).unwrap();
        assert_eq!(stats.total_tracks, 3);
        assert_eq!(stats.unique_songs, 2);
        assert_eq!(stats.total_artists, 2);
        assert_eq!(stats.total_albums, 1);
        assert_eq!(stats.avg_duration_ms, 200_000.0);
        assert!((stats.avg_popularity - 230.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.max_popularity, 90);
    }

    #[test]
    fn test_artist_count_skips_blank_names() {
        let mut tracks = scenario();
        tracks[2].artist = " ".to_string();
        assert_eq!(basic_statistics(&tracks).unwrap().total_artists, 1);

        // blank artists still group under the placeholder
        let stats = artist_distribution(&tracks, 10);
        assert!(stats.iter().any(|a| a.artist == "unknown"));
    }

    #[test]
    fn test_top_tracks() {
        let top = top_tracks(&scenario(), 2, TrackSortField::from("popularity"));
        assert_eq!(top[0].song_id, "s2");
        assert_eq!(top[1].popularity, 80);

        let mut tracks = scenario();
        tracks[1].duration_ms = 500_000;
        let top = top_tracks(&tracks, 1, TrackSortField::from("duration"));
        assert_eq!(top[0].playlist_id, "P2");
    }

    #[test]
    fn test_artist_distribution() {
        let mut tracks = scenario();
        tracks.push(TrackRecord {
            artist: "".to_string(),
            ..track("s3", "P3", 10)
        });
        tracks[0].duration_ms = 200_000;
        tracks[1].duration_ms = 100_000;
        tracks[2].duration_ms = 150_001;

        let artists = artist_distribution(&tracks, 5);
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].artist, "Artist");
        assert_eq!(artists[0].song_count, 3);
        assert_eq!(artists[0].avg_popularity, 76);
        assert_eq!(artists[0].avg_duration_ms, 150_000);
        assert_eq!(artists[1].artist, "unknown");
    }

    #[test]
    fn test_album_distribution_skips_empty_albums() {
        let mut tracks = scenario();
        tracks[0].album = "Blue".to_string();
        tracks[0].artist = "First".to_string();
        tracks[1].album = "Blue".to_string();
        tracks[1].artist = "Second".to_string();

        let albums = album_distribution(&tracks, 10);
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].album, "Blue");
        assert_eq!(albums[0].song_count, 2);
        assert_eq!(albums[0].artist, "First");
        assert_eq!(albums[0].avg_popularity, 70);

        assert!(album_distribution(&scenario(), 10).is_empty());
    }

    #[test]
    fn test_album_popularity_ranking() {
        let mut tracks = scenario();
        tracks[0].album = "Low".to_string();
        tracks[1].album = "Low".to_string();
        tracks[2].album = "High".to_string();
        let ranked = album_popularity(&tracks, 5);
        assert_eq!(ranked[0].album, "High");
        assert_eq!(ranked[0].avg_popularity, 90.0);
        assert_eq!(ranked[1].album, "Low");
        assert_eq!(ranked[1].song_count, 2);
    }

    #[test]
    fn test_duration_distribution() {
        let tracks: Vec<TrackRecord> = [60_000, 150_000, 240_000, 360_000, 480_000, 120_000]
            .iter()
            .map(|&ms| TrackRecord { duration_ms: ms, ..track("s", "p", 0) })
            .collect();
        let dist = duration_distribution(&tracks);
        assert_eq!(dist.get("very short (<=2min)"), Some(2));
        assert_eq!(dist.get("short (2-3min)"), Some(1));
        assert_eq!(dist.get("medium (3-5min)"), Some(1));
        assert_eq!(dist.get("long (5-7min)"), Some(1));
        assert_eq!(dist.get("very long (>7min)"), Some(1));
    }

    #[test]
    fn test_popularity_distribution() {
        let dist = popularity_distribution(&scenario());
        assert_eq!(dist.get("mid (41-60)"), Some(1));
        assert_eq!(dist.get("mid-high (61-80)"), Some(1));
        assert_eq!(dist.get("high (81-100)"), Some(1));
        assert_eq!(dist.total(), 3);
    }

    #[test]
    fn test_cross_playlist_scenario() {
        let tracks = scenario();
        let membership = playlist_membership(&tracks);
        assert_eq!(membership["s1"], 2);
        assert_eq!(membership["s2"], 1);

        let songs = cross_playlist_songs(&tracks, DEFAULT_MIN_PLAYLISTS, CrossOrdering::Popularity);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song_id, "s1");
        assert_eq!(songs[0].playlist_count, 2);
        assert_eq!(songs[0].avg_popularity, 70.0);
    }

    #[test]
    fn test_cross_playlist_duplicates_do_not_inflate() {
        let tracks = vec![track("s1", "P1", 50), track("s1", "P1", 50), track("s1", "P1", 50)];
        assert_eq!(playlist_membership(&tracks)["s1"], 1);
        assert!(cross_playlist_songs(&tracks, 2, CrossOrdering::EarliestPosition).is_empty());
        assert_eq!(cross_playlist_songs(&tracks, 1, CrossOrdering::EarliestPosition).len(), 1);
    }

    #[test]
    fn test_cross_playlist_orderings() {
        let mut tracks = vec![
            track("early", "P1", 10),
            track("early", "P2", 10),
            track("popular", "P1", 90),
            track("popular", "P2", 90),
            track("top", "P1", 0),
            track("top", "P2", 0),
            track("top", "P3", 0),
        ];
        tracks[0].position = 1;
        tracks[1].position = 2;
        tracks[2].position = 20;
        tracks[3].position = 30;

        let by_pos = cross_playlist_songs(&tracks, 2, CrossOrdering::EarliestPosition);
        let ids: Vec<&str> = by_pos.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(ids, vec!["top", "early", "popular"]);
        assert_eq!(by_pos[1].avg_position, 1.5);

        let by_pop = cross_playlist_songs(&tracks, 2, CrossOrdering::Popularity);
        let ids: Vec<&str> = by_pop.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(ids, vec!["top", "popular", "early"]);
    }

    #[test]
    fn test_unique_tracks_scenario() {
        let unique = unique_tracks(&scenario());
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].song_id, "s1");
        assert_eq!(unique[0].popularity, 80);
        assert_eq!(unique[0].playlist_id, "P1");
        assert_eq!(unique[1].song_id, "s2");
    }

    #[test]
    fn test_unique_tracks_tie_keeps_first_row() {
        let tracks = vec![track("s1", "P1", 40), track("s1", "P2", 70), track("s1", "P3", 70)];
        let unique = unique_tracks(&tracks);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].playlist_id, "P2");
    }

    #[test]
    fn test_artist_profiles() {
        let mut tracks = scenario();
        tracks.push(TrackRecord {
            artist: "Solo".to_string(),
            duration_ms: 300_000,
            ..track("s9", "P9", 20)
        });
        let profiles = artist_profiles(&tracks, 8);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].artist, "Artist");
        assert_eq!(profiles[0].scores.song_count, 100.0);
        assert_eq!(profiles[1].scores.song_count, 0.0);
        assert_eq!(profiles[0].scores.avg_duration, 0.0);
        assert_eq!(profiles[1].scores.avg_duration, 100.0);
        assert_eq!(profiles[0].max_popularity, 90);

        let single = artist_profiles(&scenario(), 8);
        assert_eq!(single[0].scores.avg_popularity, 50.0);
        assert!(artist_profiles(&[], 8).is_empty());
    }

    fn arb_tracks() -> impl Strategy<Value = Vec<TrackRecord>> {
        proptest::collection::vec((0u8..6, 0u8..4, 0u8..101), 0..40).prop_map(|rows| {
            rows.into_iter()
                .map(|(s, p, pop)| track(&format!("s{}", s), &format!("P{}", p), pop))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_dedup_idempotent(tracks in arb_tracks()) {
            let once = unique_tracks(&tracks);
            let twice = unique_tracks(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_membership_counts_distinct_playlists(tracks in arb_tracks()) {
            let total_playlists: FxHashSet<&str> =
                tracks.iter().map(|t| t.playlist_id.as_str()).collect();
            for (song, count) in playlist_membership(&tracks) {
                let distinct: FxHashSet<&str> = tracks
                    .iter()
                    .filter(|t| t.song_id == song)
                    .map(|t| t.playlist_id.as_str())
                    .collect();
                prop_assert_eq!(count, distinct.len());
                prop_assert!(count <= total_playlists.len());
            }
        }

        #[test]
        fn prop_duration_buckets_cover_all(tracks in arb_tracks()) {
            prop_assert_eq!(duration_distribution(&tracks).total(), tracks.len());
        }
    }
}
