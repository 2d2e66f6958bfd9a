//! Playlist aggregations: statistics, rankings, creator/tag/scale
//! distributions and the composite popularity score.
//!
//! All functions are pure over a slice of [`PlaylistRecord`] and treat an
//! empty slice as "no data" rather than an error.

use rustc_hash::FxHashSet;

use crate::distribution::{scale_bucket, Distribution, SCALE_LABELS};
use crate::group::{count_frequencies, group_by};
use crate::models::{
    group_key, CreatorStats, PlaylistRecord, PlaylistSortField, PlaylistStats,
    PopularityAnalysis, ScoredPlaylist, TagCount,
};
use crate::numeric::{mean, saturating_sum, top_n_by, truncated_mean};

/// Weight of normalized plays in the composite popularity score.
pub const PLAY_WEIGHT: f64 = 0.6;
/// Weight of normalized subscriptions in the composite popularity score.
pub const SUBSCRIBE_WEIGHT: f64 = 0.4;
/// Scores strictly above this count as high popularity.
pub const HIGH_POPULARITY_THRESHOLD: f64 = 0.5;
/// Number of playlists reported in the popularity ranking.
pub const POPULARITY_TOP_N: usize = 10;

/// Overall playlist statistics. `total_creators` counts distinct non-empty
/// creator names; playlists without a creator are not a creator of their own.
pub fn basic_statistics(playlists: &[PlaylistRecord]) -> Option<PlaylistStats> {
    if playlists.is_empty() {
        return None;
    }

    let creators: FxHashSet<&str> = playlists
        .iter()
        .map(|p| p.creator_name.trim())
        .filter(|c| !c.is_empty())
        .collect();

    Some(PlaylistStats {
        total_playlists: playlists.len(),
        total_play_count: saturating_sum(playlists.iter().map(|p| p.play_count)),
        total_subscribed_count: saturating_sum(playlists.iter().map(|p| p.subscribed_count)),
        avg_play_count: mean(playlists.iter().map(|p| p.play_count as f64)).unwrap_or(0.0),
        avg_subscribed_count: mean(playlists.iter().map(|p| p.subscribed_count as f64))
            .unwrap_or(0.0),
        avg_track_count: mean(playlists.iter().map(|p| p.track_count as f64)).unwrap_or(0.0),
        max_play_count: playlists.iter().map(|p| p.play_count).max().unwrap_or(0),
        max_subscribed_count: playlists.iter().map(|p| p.subscribed_count).max().unwrap_or(0),
        total_creators: creators.len(),
    })
}

/// The `n` playlists with the largest `field`, ties in input order.
pub fn top_playlists(
    playlists: &[PlaylistRecord],
    n: usize,
    field: PlaylistSortField,
) -> Vec<PlaylistRecord> {
    top_n_by(playlists, n, |p| field.value(p))
        .into_iter()
        .cloned()
        .collect()
}

/// Per-creator totals, most prolific creators first.
pub fn creator_distribution(playlists: &[PlaylistRecord], n: usize) -> Vec<CreatorStats> {
    let mut stats: Vec<CreatorStats> = group_by(playlists, |p| {
        Some(group_key(&p.creator_name).to_string())
    })
    .into_iter()
    .map(|(creator_name, group)| {
        let plays = || group.iter().map(|p| p.play_count);
        let subs = || group.iter().map(|p| p.subscribed_count);
        CreatorStats {
            creator_name,
            playlist_count: group.len(),
            total_play_count: saturating_sum(plays()),
            avg_play_count: truncated_mean(plays()),
            total_subscribed_count: saturating_sum(subs()),
            avg_subscribed_count: truncated_mean(subs()),
        }
    })
    .collect();

    stats.sort_by(|a, b| b.playlist_count.cmp(&a.playlist_count));
    stats.truncate(n);
    stats
}

/// Tag frequencies across all playlists.
///
/// Each stored tag is re-split on commas and trimmed, so legacy comma-joined
/// values and tag lists count the same way.
pub fn tag_distribution(playlists: &[PlaylistRecord], top_n: usize) -> Vec<TagCount> {
    let all_tags = playlists.iter().flat_map(|p| {
        p.tags
            .iter()
            .flat_map(|t| t.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    });

    count_frequencies(all_tags)
        .into_iter()
        .take(top_n)
        .map(|(tag, count)| TagCount { tag, count })
        .collect()
}

/// Playlists bucketed by track count.
pub fn scale_distribution(playlists: &[PlaylistRecord]) -> Distribution {
    Distribution::tally(
        &SCALE_LABELS,
        playlists.iter().map(|p| p.track_count),
        scale_bucket,
    )
}

/// Composite popularity ranking.
///
/// Returns `None` when either the play or the subscription maximum is zero.
pub fn popularity_analysis(playlists: &[PlaylistRecord]) -> Option<PopularityAnalysis> {
    let max_play = playlists.iter().map(|p| p.play_count).max()?;
    let max_sub = playlists.iter().map(|p| p.subscribed_count).max()?;
    if max_play == 0 || max_sub == 0 {
        return None;
    }

    let scored: Vec<ScoredPlaylist> = playlists
        .iter()
        .map(|p| {
            let norm_play = p.play_count as f64 / max_play as f64;
            let norm_sub = p.subscribed_count as f64 / max_sub as f64;
            ScoredPlaylist {
                playlist_id: p.playlist_id.clone(),
                name: p.name.clone(),
                creator_name: p.creator_name.clone(),
                play_count: p.play_count,
                subscribed_count: p.subscribed_count,
                score: norm_play * PLAY_WEIGHT + norm_sub * SUBSCRIBE_WEIGHT,
            }
        })
        .collect();

    let avg_popularity_score = mean(scored.iter().map(|s| s.score)).unwrap_or(0.0);
    let high_popularity_count = scored
        .iter()
        .filter(|s| s.score > HIGH_POPULARITY_THRESHOLD)
        .count();
    let top_playlists = top_n_by(&scored, POPULARITY_TOP_N, |s| s.score)
        .into_iter()
        .cloned()
        .collect();

    Some(PopularityAnalysis {
        top_playlists,
        avg_popularity_score,
        high_popularity_count,
    })
}

/// `(play_count, subscribed_count)` pairs where both counters are positive.
pub fn play_subscribe_pairs(playlists: &[PlaylistRecord]) -> Vec<(u64, u64)> {
    playlists
        .iter()
        .filter(|p| p.play_count > 0 && p.subscribed_count > 0)
        .map(|p| (p.play_count, p.subscribed_count))
        .collect()
}
