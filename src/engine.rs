// SPDX-License-Identifier: MIT OR Apache-2.0

//! FAQ engine: embeds the corpus once and answers queries against it.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::embedding::{EmbeddingCache, EmbeddingProvider};
use crate::faq::{questions, FaqEntry};
use crate::retrieval::{EmbeddingMatrix, FaqMatch, FaqRetriever};

/// A provider paired with a retriever built from that provider's vectors.
pub struct FaqEngine {
    provider: Box<dyn EmbeddingProvider>,
    retriever: FaqRetriever,
}

impl FaqEngine {
    /// Embeds every FAQ question and builds the retriever.
    ///
    /// Cached vectors are reused when `cache` is given; new ones are written
    /// back. Cache failures are logged and otherwise ignored.
    pub fn build(
        entries: Vec<FaqEntry>,
        mut provider: Box<dyn EmbeddingProvider>,
        cache: Option<&EmbeddingCache>,
    ) -> Result<Self> {
        if entries.is_empty() {
            bail!("FAQ data contains no entries");
        }

        let texts = questions(&entries);
        let vectors = embed_corpus(provider.as_mut(), &texts, cache)?;
        let matrix = EmbeddingMatrix::from_rows(vectors)
            .context("Embedding provider returned unusable vectors")?;
        let retriever = FaqRetriever::new(entries, matrix)?;

        tracing::info!(
            entries = retriever.len(),
            dimension = retriever.dimension(),
            model = provider.model_id(),
            "FAQ corpus embedded"
        );

        Ok(Self {
            provider,
            retriever,
        })
    }

    /// Embeds `query` and returns the `k` closest FAQ entries.
    pub fn ask(&mut self, query: &str, k: usize) -> Result<Vec<FaqMatch>> {
        self.ask_above(query, k, None)
    }

    /// Like [`ask`](Self::ask), hiding matches below `min_score`.
    pub fn ask_above(
        &mut self,
        query: &str,
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<FaqMatch>> {
        let embedding = self
            .provider
            .embed_one(query)
            .context("Failed to embed query")?;
        let matches = self.retriever.retrieve_above(&embedding, k, min_score)?;
        Ok(matches)
    }

    pub fn retriever(&self) -> &FaqRetriever {
        &self.retriever
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub fn len(&self) -> usize {
        self.retriever.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retriever.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.retriever.dimension()
    }
}

fn embed_corpus(
    provider: &mut dyn EmbeddingProvider,
    texts: &[String],
    cache: Option<&EmbeddingCache>,
) -> Result<Vec<Vec<f32>>> {
    let model = provider.model_id().to_string();
    let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

    if let Some(cache) = cache {
        for (slot, text) in vectors.iter_mut().zip(texts) {
            match cache.get(&model, text) {
                Ok(hit) => *slot = hit,
                Err(err) => {
                    tracing::warn!("embedding cache read failed: {:#}", err);
                    break;
                }
            }
        }
    }

    let missing: Vec<usize> = vectors
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_none())
        .map(|(idx, _)| idx)
        .collect();
    tracing::debug!(
        cached = texts.len() - missing.len(),
        missing = missing.len(),
        "embedding FAQ questions"
    );

    if !missing.is_empty() {
        let pb = ProgressBar::new(missing.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} questions | Embedding")
                .expect("valid progress bar template")
                .progress_chars("##."),
        );

        let batch_size = provider.batch_size().max(1);
        for batch in missing.chunks(batch_size) {
            let batch_texts: Vec<String> = batch.iter().map(|&idx| texts[idx].clone()).collect();
            let embedded = provider
                .embed_texts(&batch_texts)
                .context("Failed to embed FAQ questions")?;
            if embedded.len() != batch_texts.len() {
                pb.abandon();
                bail!(
                    "Embedding provider returned {} vectors for {} texts",
                    embedded.len(),
                    batch_texts.len()
                );
            }

            if let Some(cache) = cache {
                let items: Vec<(&str, &[f32])> = batch_texts
                    .iter()
                    .zip(&embedded)
                    .map(|(t, v)| (t.as_str(), v.as_slice()))
                    .collect();
                if let Err(err) = cache.put_many(&model, &items) {
                    tracing::warn!("embedding cache write failed: {:#}", err);
                }
            }

            for (&idx, vector) in batch.iter().zip(embedded) {
                vectors[idx] = Some(vector);
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
    }

    Ok(vectors.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{CommandProvider, HashingProvider};
    use tempfile::tempdir;

    /// Counts how many texts reach the wrapped provider.
    struct CountingProvider {
        inner: HashingProvider,
        embedded: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl EmbeddingProvider for CountingProvider {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }

        fn batch_size(&self) -> usize {
            2
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embedded
                .fetch_add(texts.len(), std::sync::atomic::Ordering::SeqCst);
            self.inner.embed_texts(texts)
        }
    }

    /// Always returns one vector too few.
    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn model_id(&self) -> &str {
            "short"
        }

        fn batch_size(&self) -> usize {
            8
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
        }
    }

    fn sample_entries() -> Vec<FaqEntry> {
        vec![
            FaqEntry::new("How do I reset my password?", "Use the reset link on the login page."),
            FaqEntry::new("Which payment methods do you accept?", "Cards and bank transfer."),
            FaqEntry::new("How can I contact support?", "Email support@example.com."),
        ]
    }

    #[test]
    fn answers_with_best_match_first() {
        let mut engine =
            FaqEngine::build(sample_entries(), Box::new(HashingProvider::new(384)), None).unwrap();
        assert_eq!(engine.len(), 3);
        assert_eq!(engine.dimension(), 384);
        assert_eq!(engine.model_id(), "hashing-384");

        let matches = engine.ask("reset password", 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].index, 0);
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn blank_query_is_invalid_input() {
        let mut engine =
            FaqEngine::build(sample_entries(), Box::new(HashingProvider::new(64)), None).unwrap();
        let err = engine.ask("???", 3).unwrap_err();
        let retrieval = err.downcast_ref::<crate::errors::RetrievalError>().unwrap();
        assert!(retrieval.is_invalid_input());
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let result = FaqEngine::build(Vec::new(), Box::new(HashingProvider::new(8)), None);
        assert!(result.is_err());
    }

    #[test]
    fn short_provider_output_is_rejected() {
        let err = FaqEngine::build(sample_entries(), Box::new(ShortProvider), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("2 vectors for 3 texts"));
    }

    #[test]
    fn cache_skips_already_embedded_questions() {
        let dir = tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path().join("cache.sqlite")).unwrap();
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let provider = CountingProvider {
            inner: HashingProvider::new(32),
            embedded: counter.clone(),
        };
        FaqEngine::build(sample_entries(), Box::new(provider), Some(&cache)).unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(cache.count().unwrap(), 3);

        let provider = CountingProvider {
            inner: HashingProvider::new(32),
            embedded: counter.clone(),
        };
        let mut engine =
            FaqEngine::build(sample_entries(), Box::new(provider), Some(&cache)).unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);

        // Queries are embedded fresh, never cached.
        engine.ask("contact support", 1).unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert_eq!(cache.count().unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn different_commands_do_not_share_cached_vectors() {
        let dir = tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path().join("cache.sqlite")).unwrap();
        let entries = vec![FaqEntry::new("Only question", "Only answer.")];

        let first = CommandProvider::new("cat >/dev/null; echo '[[1, 0]]'".to_string(), None);
        let engine = FaqEngine::build(entries.clone(), Box::new(first), Some(&cache)).unwrap();
        assert_eq!(engine.retriever().matrix().row(0), Some(&[1.0, 0.0][..]));

        let second = CommandProvider::new("cat >/dev/null; echo '[[0, 1]]'".to_string(), None);
        let engine = FaqEngine::build(entries, Box::new(second), Some(&cache)).unwrap();
        assert_eq!(engine.retriever().matrix().row(0), Some(&[0.0, 1.0][..]));
        assert_eq!(cache.count().unwrap(), 2);
    }
}
