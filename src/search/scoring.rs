//! Frequency scoring and min-max normalization

use crate::search::MatchRow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Counts match rows per url
pub fn match_counts(rows: &[MatchRow]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.url_id).or_insert(0) += 1;
    }
    counts
}

/// Min-max normalizes counts into `[0, 1]`
///
/// `score = (count - min) / (max - min)`. When every candidate has the same
/// count (including a single candidate) every score is 1.
pub fn normalize_scores(counts: &BTreeMap<i64, usize>) -> BTreeMap<i64, f64> {
    let (Some(&min), Some(&max)) = (counts.values().min(), counts.values().max()) else {
        return BTreeMap::new();
    };

    if max == min {
        return counts.keys().map(|&url_id| (url_id, 1.0)).collect();
    }

    let range = (max - min) as f64;
    counts
        .iter()
        .map(|(&url_id, &count)| (url_id, (count - min) as f64 / range))
        .collect()
}

/// Orders scores best first, ties by ascending url id, and keeps `limit` of them
pub fn top_scores(scores: &BTreeMap<i64, f64>, limit: usize) -> Vec<(i64, f64)> {
    let mut ordered: Vec<(i64, f64)> = scores.iter().map(|(&id, &score)| (id, score)).collect();
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ordered.truncate(limit);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(i64, usize)]) -> BTreeMap<i64, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_match_counts() {
        let rows = [
            MatchRow { url_id: 2, location0: 0, location1: 1 },
            MatchRow { url_id: 1, location0: 0, location1: 1 },
            MatchRow { url_id: 2, location0: 2, location1: 1 },
        ];
        assert_eq!(match_counts(&rows), counts(&[(1, 1), (2, 2)]));
    }

    #[test]
    fn test_normalize_range() {
        let scores = normalize_scores(&counts(&[(1, 2), (2, 4), (3, 6)]));
        assert_eq!(scores[&1], 0.0);
        assert_eq!(scores[&2], 0.5);
        assert_eq!(scores[&3], 1.0);
    }

    #[test]
    fn test_normalize_ties_score_one() {
        let scores = normalize_scores(&counts(&[(1, 3), (2, 3)]));
        assert!(scores.values().all(|&s| s == 1.0));
    }

    #[test]
    fn test_normalize_single_candidate() {
        let scores = normalize_scores(&counts(&[(7, 5)]));
        assert_eq!(scores[&7], 1.0);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_scores(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_top_scores_order_and_limit() {
        let scores: BTreeMap<i64, f64> = [(4, 0.5), (2, 1.0), (3, 0.5), (1, 0.0)].into_iter().collect();
        assert_eq!(top_scores(&scores, 3), vec![(2, 1.0), (3, 0.5), (4, 0.5)]);
    }
}
