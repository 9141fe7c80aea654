// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory FAQ retriever.
//!
//! Holds the FAQ entries and a parallel embedding matrix. Both are read-only
//! after construction, so a retriever can be shared across threads by
//! reference.

use serde::Serialize;

use crate::errors::RetrievalError;
use crate::faq::FaqEntry;
use crate::retrieval::similarity::cosine_scores;
use crate::retrieval::topk::top_k;

/// Dense row-major matrix of embedding vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    dimension: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Builds a matrix whose rows all have length `dimension`.
    pub fn with_dimension(dimension: usize, rows: Vec<Vec<f32>>) -> Result<Self, RetrievalError> {
        if dimension == 0 {
            return Err(RetrievalError::EmptyDimension);
        }

        let mut data = Vec::with_capacity(dimension * rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(RetrievalError::DimensionMismatch {
                    what: format!("document row {}", idx),
                    expected: dimension,
                    actual: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(RetrievalError::non_finite(format!("document row {}", idx)));
            }
            data.extend(row);
        }

        Ok(Self { dimension, data })
    }

    /// Builds a matrix, taking the dimension from the first row.
    ///
    /// At least one row is required to know the dimension.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, RetrievalError> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        Self::with_dimension(dimension, rows)
    }

    /// A matrix with no rows.
    pub fn empty(dimension: usize) -> Result<Self, RetrievalError> {
        Self::with_dimension(dimension, Vec::new())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }
}

/// A retrieved FAQ entry with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqMatch {
    /// Position of the entry in the FAQ file
    pub index: usize,
    pub question: String,
    pub answer: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Scores a query against every FAQ entry and keeps the best K.
#[derive(Debug, Clone)]
pub struct FaqRetriever {
    entries: Vec<FaqEntry>,
    matrix: EmbeddingMatrix,
}

impl FaqRetriever {
    /// Pairs FAQ entries with their embeddings. Row `i` must embed entry `i`.
    pub fn new(entries: Vec<FaqEntry>, matrix: EmbeddingMatrix) -> Result<Self, RetrievalError> {
        if entries.len() != matrix.len() {
            return Err(RetrievalError::RowCountMismatch {
                rows: matrix.len(),
                entries: entries.len(),
            });
        }
        Ok(Self { entries, matrix })
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    /// Returns the `k` entries most similar to `query`, best first.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<FaqMatch>, RetrievalError> {
        let scores = cosine_scores(query, &self.matrix)?;
        let selected = top_k(&scores, k)?;

        Ok(selected
            .into_iter()
            .map(|(index, score)| {
                let entry = &self.entries[index];
                FaqMatch {
                    index,
                    question: entry.question.clone(),
                    answer: entry.answer.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), dropping matches scored below `min_score`.
    pub fn retrieve_above(
        &self,
        query: &[f32],
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<FaqMatch>, RetrievalError> {
        let mut matches = self.retrieve(query, k)?;
        if let Some(floor) = min_score {
            matches.retain(|m| m.score >= floor);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FaqRetriever {
        let entries = vec![
            FaqEntry::new("east", "points east"),
            FaqEntry::new("north", "points north"),
            FaqEntry::new("north-east", "points diagonally"),
        ];
        let matrix = EmbeddingMatrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.707, 0.707],
        ])
        .unwrap();
        FaqRetriever::new(entries, matrix).unwrap()
    }

    #[test]
    fn diagonal_scenario() {
        let results = sample().retrieve(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].index, 2);
        assert!((results[1].score - 0.707_106_8).abs() < 1e-3);
        assert_eq!(results[1].answer, "points diagonally");
    }

    #[test]
    fn k_above_corpus_size_returns_everything() {
        let results = sample().retrieve(&[0.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].question, "north");
    }

    #[test]
    fn zero_k_is_invalid() {
        let err = sample().retrieve(&[1.0, 0.0], 0).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn zero_query_is_invalid() {
        let err = sample().retrieve(&[0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, RetrievalError::ZeroNorm { .. }));
    }

    #[test]
    fn min_score_filters_weak_matches() {
        let results = sample().retrieve_above(&[1.0, 0.0], 3, Some(0.5)).unwrap();
        let indices: Vec<usize> = results.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn row_count_must_match_entries() {
        let matrix = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0]]).unwrap();
        let err = FaqRetriever::new(Vec::new(), matrix).unwrap_err();
        assert_eq!(
            err,
            RetrievalError::RowCountMismatch {
                rows: 1,
                entries: 0
            }
        );
    }

    #[test]
    fn matrix_rejects_ragged_rows() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn matrix_rejects_infinite_values() {
        let err = EmbeddingMatrix::from_rows(vec![vec![f32::INFINITY, 0.0]]).unwrap_err();
        assert!(matches!(err, RetrievalError::NonFinite { .. }));
    }

    #[test]
    fn matrix_rows_round_trip() {
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(m.row(2), None);
        assert_eq!(m.rows().count(), 2);
    }

    #[test]
    fn retriever_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FaqRetriever>();
    }
}
