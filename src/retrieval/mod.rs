// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval module - cosine scoring and top-K selection over FAQ embeddings
//!
//! The retriever holds a read-only embedding matrix parallel to the FAQ
//! entries. Every query is a full linear scan followed by a stable sort.

pub mod retriever;
pub mod similarity;
pub mod topk;

pub use retriever::{EmbeddingMatrix, FaqMatch, FaqRetriever};
pub use similarity::{cosine_scores, cosine_similarity, l2_norm, normalized};
pub use topk::{top_k, DEFAULT_TOP_K};
