// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns FAQ questions and queries into vectors
//!
//! Providers are injected behind the `EmbeddingProvider` trait so retrieval
//! never depends on a particular model runtime. Corpus embeddings can be
//! cached on disk between runs.

pub mod cache;
pub mod provider;

pub use cache::EmbeddingCache;
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use provider::FastEmbedder;
pub use provider::{
    create_provider, CommandProvider, EmbeddingProvider, EmbeddingProviderConfig,
    HashingProvider, DEFAULT_EMBEDDING_DIM,
};
