//! Fixed, labeled bucket sets for histogram-style reporting.
//!
//! Every bucket has an inclusive upper bound and the last bucket is open-ended,
//! so each value lands in exactly one bucket.

use serde::Serialize;

pub const SCALE_LABELS: [&str; 4] = [
    "small (<=20)",
    "medium (21-50)",
    "large (51-100)",
    "extra-large (>100)",
];

pub const DURATION_LABELS: [&str; 5] = [
    "very short (<=2min)",
    "short (2-3min)",
    "medium (3-5min)",
    "long (5-7min)",
    "very long (>7min)",
];

pub const POPULARITY_LABELS: [&str; 5] = [
    "low (0-20)",
    "mid-low (21-40)",
    "mid (41-60)",
    "mid-high (61-80)",
    "high (81-100)",
];

/// Playlist scale bucket by track count.
pub fn scale_bucket(track_count: u64) -> usize {
    match track_count {
        0..=20 => 0,
        21..=50 => 1,
        51..=100 => 2,
        _ => 3,
    }
}

/// Track duration bucket. Bounds are whole seconds, compared in milliseconds.
pub fn duration_bucket(duration_ms: u64) -> usize {
    match duration_ms {
        0..=120_000 => 0,
        120_001..=180_000 => 1,
        180_001..=300_000 => 2,
        300_001..=420_000 => 3,
        _ => 4,
    }
}

/// Track popularity bucket; anything above 100 lands in the top bucket.
pub fn popularity_bucket(popularity: u64) -> usize {
    match popularity {
        0..=20 => 0,
        21..=40 => 1,
        41..=60 => 2,
        61..=80 => 3,
        _ => 4,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub label: &'static str,
    pub count: usize,
}

/// Bucket label to count, in the bucket set's fixed order.
/// Zero-count buckets are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub buckets: Vec<BucketCount>,
}

impl Distribution {
    /// Tally `values` into the buckets named by `labels` using `bucket_of`.
    pub fn tally<I, F>(labels: &[&'static str], values: I, bucket_of: F) -> Self
    where
        I: IntoIterator<Item = u64>,
        F: Fn(u64) -> usize,
    {
        let mut counts = vec![0usize; labels.len()];
        for v in values {
            let idx = bucket_of(v).min(labels.len() - 1);
            counts[idx] += 1;
        }
        Self {
            buckets: labels
                .iter()
                .zip(counts)
                .map(|(&label, count)| BucketCount { label, count })
                .collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.count)
    }

    /// Buckets with a non-zero count, for chart-facing output.
    pub fn non_empty(&self) -> impl Iterator<Item = &BucketCount> {
        self.buckets.iter().filter(|b| b.count > 0)
    }
}
