//! Insertion-ordered grouping.
//!
//! Groups keep the order in which their key was first encountered, so every
//! tie-break downstream is "first seen wins" and repeated runs are identical.

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Index mapping a group key to its position in the group vector.
type GroupIndex<K> = FxHashMap<K, usize>;

/// Group `items` by `key`, preserving first-encountered key order.
/// Items whose key is `None` are skipped.
pub fn group_by<'a, T, K, F>(items: &'a [T], mut key: F) -> Vec<(K, Vec<&'a T>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> Option<K>,
{
    let mut index: GroupIndex<K> = FxHashMap::default();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

    for item in items {
        let Some(k) = key(item) else { continue };
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}

/// Count occurrences, returning `(value, count)` sorted by count descending.
/// Equal counts keep first-encountered order.
pub fn count_frequencies<I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut index: GroupIndex<String> = FxHashMap::default();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for v in values {
        let v = v.as_ref();
        match index.get(v) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(v.to_string(), counts.len());
                counts.push((v.to_string(), 1));
            }
        }
    }

    // Stable sort keeps insertion order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let items = vec![("b", 1), ("a", 2), ("b", 3), ("c", 4), ("a", 5)];
        let groups = group_by(&items, |(k, _)| Some(k.to_string()));
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1].1, 3);
    }

    #[test]
    fn test_group_by_skips_none() {
        let items = vec![1, 2, 3, 4];
        let groups = group_by(&items, |v| (v % 2 == 0).then_some("even"));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_count_frequencies_ties_first_seen() {
        let counts = count_frequencies(["rock", "pop", "dance", "pop", "jazz"]);
        assert_eq!(counts[0], ("pop".to_string(), 2));
        assert_eq!(counts[1], ("rock".to_string(), 1));
        assert_eq!(counts[2], ("dance".to_string(), 1));
        assert_eq!(counts[3], ("jazz".to_string(), 1));
    }

    #[test]
    fn test_count_frequencies_empty() {
        let counts = count_frequencies(Vec::<String>::new());
        assert!(counts.is_empty());
    }
}
