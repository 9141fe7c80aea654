// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-K selection over a score vector.

use crate::errors::RetrievalError;

/// Number of matches returned when the caller does not ask for a specific K.
pub const DEFAULT_TOP_K: usize = 3;

/// Selects the `k` highest scores as `(index, score)` pairs.
///
/// Pairs are ordered by descending score; equal scores keep their original
/// index order. A `k` larger than the number of scores is clamped, so the
/// result always has `min(k, scores.len())` entries. `k == 0` is rejected.
pub fn top_k(scores: &[f32], k: usize) -> Result<Vec<(usize, f32)>, RetrievalError> {
    if k == 0 {
        return Err(RetrievalError::InvalidTopK { k });
    }

    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    // Stable sort: ties stay in index order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_in_descending_order() {
        let result = top_k(&[0.1, 0.9, 0.5, 0.7], 3).unwrap();
        assert_eq!(result, vec![(1, 0.9), (3, 0.7), (2, 0.5)]);
    }

    #[test]
    fn ties_keep_index_order() {
        let result = top_k(&[0.5, 0.8, 0.5, 0.8, 0.5], 4).unwrap();
        let indices: Vec<usize> = result.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 3, 0, 2]);
    }

    #[test]
    fn k_larger_than_n_is_clamped() {
        let result = top_k(&[0.2, 0.4], 10).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, 1);
    }

    #[test]
    fn zero_k_is_invalid() {
        let err = top_k(&[0.2, 0.4], 0).unwrap_err();
        assert_eq!(err, RetrievalError::InvalidTopK { k: 0 });
        assert!(err.is_invalid_input());
    }

    #[test]
    fn empty_scores_give_empty_result() {
        assert!(top_k(&[], DEFAULT_TOP_K).unwrap().is_empty());
    }

    #[test]
    fn negative_scores_rank_below_positive() {
        let result = top_k(&[-1.0, 0.0, -0.5], 3).unwrap();
        let indices: Vec<usize> = result.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn no_duplicate_indices() {
        let scores: Vec<f32> = (0..50).map(|i| ((i * 7) % 11) as f32 / 10.0).collect();
        let result = top_k(&scores, 20).unwrap();
        let mut seen: Vec<usize> = result.iter().map(|(i, _)| *i).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 20);
        assert!(result.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
