// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine similarity between a query vector and the rows of a matrix.
//!
//! Both sides are normalized at scoring time. Rows produced by a normalizing
//! embedder are already unit length, but nothing here relies on that.

use crate::errors::RetrievalError;
use crate::retrieval::EmbeddingMatrix;

/// Euclidean norm of a vector.
///
/// Accumulates in f64: squaring very large or very small f32 components
/// would overflow to infinity or underflow to zero in f32.
pub fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}

/// Returns a unit-length copy of `vector`.
///
/// `what` names the vector in the error message.
pub fn normalized(vector: &[f32], what: &str) -> Result<Vec<f32>, RetrievalError> {
    Ok(unit(vector, what)?.into_iter().map(|v| v as f32).collect())
}

/// Cosine similarity of two vectors of equal length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RetrievalError> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            what: "second vector".to_string(),
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(RetrievalError::EmptyDimension);
    }
    let a = unit(a, "first vector")?;
    let b = unit(b, "second vector")?;
    let dot: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
    Ok(clamp_unit(dot))
}

/// Scores every row of `matrix` against `query`.
///
/// Returns one cosine similarity per row, in row order.
pub fn cosine_scores(query: &[f32], matrix: &EmbeddingMatrix) -> Result<Vec<f32>, RetrievalError> {
    if query.len() != matrix.dimension() {
        return Err(RetrievalError::DimensionMismatch {
            what: "query vector".to_string(),
            expected: matrix.dimension(),
            actual: query.len(),
        });
    }
    let query = unit(query, "query vector")?;

    matrix
        .rows()
        .enumerate()
        .map(|(idx, row)| {
            let norm = checked_norm(row, || format!("document row {}", idx))?;
            Ok(clamp_unit(dot(row, &query) / norm))
        })
        .collect()
}

/// Unit-length f64 copy of `vector`.
fn unit(vector: &[f32], what: &str) -> Result<Vec<f64>, RetrievalError> {
    let norm = checked_norm(vector, || what.to_string())?;
    Ok(vector.iter().map(|&v| f64::from(v) / norm).collect())
}

/// Norm of `vector`, rejecting non-finite components and zero or non-finite norms.
fn checked_norm(vector: &[f32], what: impl Fn() -> String) -> Result<f64, RetrievalError> {
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RetrievalError::non_finite(what()));
    }
    let norm = l2_norm(vector);
    if norm == 0.0 || !norm.is_finite() {
        return Err(RetrievalError::zero_norm(what()));
    }
    Ok(norm)
}

fn dot(row: &[f32], query: &[f64]) -> f64 {
    row.iter().zip(query).map(|(&x, y)| f64::from(x) * y).sum()
}

// Rounding can push a unit dot product just past 1.0.
fn clamp_unit(score: f64) -> f32 {
    score.clamp(-1.0, 1.0) as f32
}
