// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for similarity scoring and top-K retrieval.

use thiserror::Error;

/// Invalid input rejected by the retrieval core.
///
/// Every variant describes caller-supplied data that cannot be scored. None of
/// them is transient, so there is nothing to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    /// A vector with Euclidean norm 0 cannot be normalized.
    #[error("invalid input: {what} has zero norm")]
    ZeroNorm { what: String },

    /// Query and document vectors disagree on dimensionality.
    #[error("invalid input: {what} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A vector contains NaN or an infinity.
    #[error("invalid input: {what} contains a non-finite value")]
    NonFinite { what: String },

    /// Requested K is outside the accepted range.
    #[error("invalid input: top-k must be at least 1 (got {k})")]
    InvalidTopK { k: usize },

    /// Embedding rows and FAQ entries are not parallel.
    #[error("invalid input: {rows} embedding rows for {entries} FAQ entries")]
    RowCountMismatch { rows: usize, entries: usize },

    /// Embeddings must have at least one component.
    #[error("invalid input: embedding dimension must be at least 1")]
    EmptyDimension,
}

impl RetrievalError {
    /// True for every variant; all retrieval failures are invalid input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            RetrievalError::ZeroNorm { .. }
                | RetrievalError::DimensionMismatch { .. }
                | RetrievalError::NonFinite { .. }
                | RetrievalError::InvalidTopK { .. }
                | RetrievalError::RowCountMismatch { .. }
                | RetrievalError::EmptyDimension
        )
    }

    pub(crate) fn zero_norm(what: impl Into<String>) -> Self {
        RetrievalError::ZeroNorm { what: what.into() }
    }

    pub(crate) fn non_finite(what: impl Into<String>) -> Self {
        RetrievalError::NonFinite { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = RetrievalError::DimensionMismatch {
            what: "query vector".to_string(),
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid input: query vector has dimension 3, expected 384"
        );
        assert!(err.is_invalid_input());
    }

    #[test]
    fn converts_into_anyhow() {
        fn fail() -> anyhow::Result<()> {
            Err(RetrievalError::InvalidTopK { k: 0 })?;
            Ok(())
        }
        let err = fail().unwrap_err();
        assert!(err.downcast_ref::<RetrievalError>().is_some());
    }
}
