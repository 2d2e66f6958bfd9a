//! Shared numeric and formatting helpers.

use std::cmp::Ordering;

/// Select the `n` items with the largest `key`, in descending key order.
///
/// The sort is stable: items with equal keys keep their input order. When `n`
/// exceeds the input length every item is returned.
pub fn top_n_by<T, K, F>(items: &[T], n: usize, key: F) -> Vec<&T>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let mut ranked: Vec<&T> = items.iter().collect();
    ranked.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    ranked.truncate(n);
    ranked
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sum that stops at `u64::MAX` instead of overflowing.
pub fn saturating_sum<I>(values: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().fold(0u64, u64::saturating_add)
}

/// Truncated integer mean, exact for any input (accumulates in `u128`).
/// Zero for an empty input.
pub fn truncated_mean<I>(values: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u128, 0u128), |(s, c), v| (s + v as u128, c + 1));
    if count == 0 {
        0
    } else {
        (sum / count) as u64
    }
}

/// Linear min-max mapping of `v` from `[min, max]` onto `[lo, hi]`.
/// A zero-width source range maps every value to the midpoint of the target range.
pub fn normalize(v: f64, min: f64, max: f64, lo: f64, hi: f64) -> f64 {
    if max == min {
        return (lo + hi) / 2.0;
    }
    lo + (v - min) / (max - min) * (hi - lo)
}

/// Normalize a whole column against its own minimum and maximum.
pub fn normalize_column(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|&v| normalize(v, min, max, lo, hi))
        .collect()
}

const HUNDRED_MILLION: u64 = 100_000_000;
const TEN_THOUSAND: u64 = 10_000;

/// Human-scale count using the 万 (10^4) / 亿 (10^8) grouping convention.
pub fn format_large_number(n: u64) -> String {
    if n >= HUNDRED_MILLION {
        format!("{:.1}亿", n as f64 / HUNDRED_MILLION as f64)
    } else if n >= TEN_THOUSAND {
        format!("{:.1}万", n as f64 / TEN_THOUSAND as f64)
    } else {
        n.to_string()
    }
}

/// Format a millisecond duration as `M:SS`.
pub fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_top_n_stable_ties() {
        let items = vec![("a", 5), ("b", 7), ("c", 5), ("d", 9), ("e", 7)];
        let top: Vec<&str> = top_n_by(&items, 4, |x| x.1).iter().map(|x| x.0).collect();
        assert_eq!(top, vec!["d", "b", "e", "a"]);
    }

    #[test]
    fn test_top_n_larger_than_input() {
        let items = vec![1, 3, 2];
        let top = top_n_by(&items, 10, |x| *x);
        assert_eq!(top, vec![&3, &2, &1]);
        assert!(top_n_by(&Vec::<i32>::new(), 5, |x| *x).is_empty());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_sums_do_not_overflow() {
        let big = [u64::MAX / 2, u64::MAX / 2, u64::MAX / 2];
        assert_eq!(saturating_sum(big), u64::MAX);
        assert_eq!(saturating_sum([1, 2, 3]), 6);
        assert_eq!(truncated_mean(big), u64::MAX / 2);
        assert_eq!(truncated_mean([u64::MAX, u64::MAX]), u64::MAX);
        assert_eq!(truncated_mean([1, 2]), 1);
        assert_eq!(truncated_mean(Vec::new()), 0);
    }

    #[test]
    fn test_normalize_endpoints_and_midpoint() {
        assert_eq!(normalize(10.0, 10.0, 30.0, 0.0, 100.0), 0.0);
        assert_eq!(normalize(30.0, 10.0, 30.0, 0.0, 100.0), 100.0);
        assert_eq!(normalize(20.0, 10.0, 30.0, 0.0, 100.0), 50.0);
        assert_eq!(normalize(7.0, 7.0, 7.0, 0.0, 100.0), 50.0);
    }

    #[test]
    fn test_normalize_column_zero_variance() {
        assert_eq!(normalize_column(&[4.0, 4.0], 0.0, 100.0), vec![50.0, 50.0]);
        assert_eq!(normalize_column(&[0.0, 5.0, 10.0], 0.0, 100.0), vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_format_large_number() {
        assert_eq!(format_large_number(0), "0");
        assert_eq!(format_large_number(9_999), "9999");
        assert_eq!(format_large_number(10_000), "1.0万");
        assert_eq!(format_large_number(123_400), "12.3万");
        assert_eq!(format_large_number(99_999_999), "10000.0万");
        assert_eq!(format_large_number(100_000_000), "1.0亿");
        assert_eq!(format_large_number(2_340_000_000), "23.4亿");
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(215_000), "3:35");
        assert_eq!(format_duration_ms(61_999), "1:01");
    }

    proptest! {
        #[test]
        fn prop_top_n_non_increasing_and_stable(
            values in proptest::collection::vec(0u8..5, 0..40),
            n in 0usize..50,
        ) {
            let items: Vec<(usize, u8)> = values.into_iter().enumerate().collect();
            let top = top_n_by(&items, n, |x| x.1);

            prop_assert_eq!(top.len(), n.min(items.len()));
            for pair in top.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
        }

        #[test]
        fn prop_normalize_range(min in -1e6f64..1e6, width in 0.0f64..1e6, t in 0.0f64..=1.0) {
            let max = min + width;
            let v = min + t * width;
            let out = normalize(v, min, max, 0.0, 100.0);
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(&out));
            let expected_at_min = if max == min { 50.0 } else { 0.0 };
            prop_assert_eq!(normalize(min, min, max, 0.0, 100.0), expected_at_min);
        }
    }
}
