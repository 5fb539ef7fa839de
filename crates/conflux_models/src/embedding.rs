//! Embedding model and store contracts, with an in-memory store and the
//! content retriever built on top of them.

use crate::error::GenerationError;
use crate::rag::{Content, ContentRetriever, Query};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// A dense vector representation of a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity in `[-1, 1]`. Returns 0 for mismatched or zero vectors.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
        for (a, b) in self.0.iter().zip(&other.0) {
            let (a, b) = (f64::from(*a), f64::from(*b));
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Turns text into embeddings.
#[async_trait]
pub trait EmbeddingModel: Send + Sync + 'static {
    /// Embeds `text`.
    async fn embed(&self, text: &str) -> Result<Embedding, GenerationError>;
}

/// A stored text segment returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatch {
    /// Store-assigned identifier.
    pub id: String,
    /// Relevance score in `[0, 1]`, derived from cosine similarity.
    pub score: f64,
    /// The stored text.
    pub text: String,
}

/// Persists embeddings and finds the closest ones to a query.
#[async_trait]
pub trait EmbeddingStore: Send + Sync + 'static {
    /// Stores `text` with its embedding and returns the new identifier.
    async fn add(&self, embedding: Embedding, text: String) -> Result<String, GenerationError>;

    /// Returns up to `max_results` matches scoring at least `min_score`,
    /// best first.
    async fn search(
        &self,
        query: &Embedding,
        max_results: usize,
        min_score: f64,
    ) -> Result<Vec<EmbeddingMatch>, GenerationError>;
}

/// An [`EmbeddingStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    entries: RwLock<Vec<(String, Embedding, String)>>,
}

impl InMemoryEmbeddingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddingStore {
    async fn add(&self, embedding: Embedding, text: String) -> Result<String, GenerationError> {
        let mut entries = self.entries.write();
        let id = format!("segment-{}", entries.len());
        entries.push((id.clone(), embedding, text));
        Ok(id)
    }

    async fn search(
        &self,
        query: &Embedding,
        max_results: usize,
        min_score: f64,
    ) -> Result<Vec<EmbeddingMatch>, GenerationError> {
        let mut matches: Vec<EmbeddingMatch> = self
            .entries
            .read()
            .iter()
            .map(|(id, embedding, text)| EmbeddingMatch {
                id: id.clone(),
                score: (query.cosine_similarity(embedding) + 1.0) / 2.0,
                text: text.clone(),
            })
            .filter(|candidate| candidate.score >= min_score)
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(max_results);
        Ok(matches)
    }
}

/// A [`ContentRetriever`] that embeds the query and searches an
/// [`EmbeddingStore`].
#[derive(Clone)]
pub struct EmbeddingStoreContentRetriever {
    display_name: String,
    model: Arc<dyn EmbeddingModel>,
    store: Arc<dyn EmbeddingStore>,
    max_results: usize,
    min_score: f64,
}

impl EmbeddingStoreContentRetriever {
    /// Default number of results.
    pub const DEFAULT_MAX_RESULTS: usize = 2;

    /// Default minimum relevance score.
    pub const DEFAULT_MIN_SCORE: f64 = 0.0;

    /// Creates a retriever with default limits.
    #[must_use]
    pub fn new(model: Arc<dyn EmbeddingModel>, store: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            display_name: "Default".to_string(),
            model,
            store,
            max_results: Self::DEFAULT_MAX_RESULTS,
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    /// Sets the name shown in logs.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Caps the number of returned contents.
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Drops matches scoring below `min_score`.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// The name shown in logs.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The result cap.
    #[must_use]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// The score threshold.
    #[must_use]
    pub fn min_score(&self) -> f64 {
        self.min_score
    }
}

impl core::fmt::Debug for EmbeddingStoreContentRetriever {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmbeddingStoreContentRetriever")
            .field("display_name", &self.display_name)
            .field("max_results", &self.max_results)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentRetriever for EmbeddingStoreContentRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<Content>, GenerationError> {
        let embedding = self.model.embed(&query.text).await?;
        let matches = self
            .store
            .search(&embedding, self.max_results, self.min_score)
            .await?;
        Ok(matches
            .into_iter()
            .map(|found| Content {
                text: found.text,
                score: Some(found.score),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds a text as letter counts for `a`, `b` and `c`.
    struct LetterModel;

    #[async_trait]
    impl EmbeddingModel for LetterModel {
        async fn embed(&self, text: &str) -> Result<Embedding, GenerationError> {
            let count = |c| text.chars().filter(|x| *x == c).count() as f32;
            Ok(Embedding(vec![count('a'), count('b'), count('c')]))
        }
    }

    #[test]
    fn cosine_similarity_bounds() {
        let a = Embedding(vec![1.0, 0.0]);
        let b = Embedding(vec![0.0, 1.0]);
        let c = Embedding(vec![-1.0, 0.0]);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-9);
        assert!(a.cosine_similarity(&b).abs() < 1e-9);
        assert!((a.cosine_similarity(&c) + 1.0).abs() < 1e-9);
        assert_eq!(a.cosine_similarity(&Embedding(vec![1.0])), 0.0);
    }

    #[tokio::test]
    async fn retriever_ranks_and_limits_matches() {
        let store = Arc::new(InMemoryEmbeddingStore::new());
        for text in ["aaa", "bbb", "aab", "ccc"] {
            let embedding = LetterModel.embed(text).await.unwrap();
            store.add(embedding, text.to_string()).await.unwrap();
        }
        assert_eq!(store.len(), 4);

        let retriever = EmbeddingStoreContentRetriever::new(Arc::new(LetterModel), store)
            .with_max_results(2)
            .with_min_score(0.6);
        let contents = retriever.retrieve(&Query::new("a")).await.unwrap();

        let texts: Vec<_> = contents.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa", "aab"]);
        assert!(contents[0].score.unwrap() > contents[1].score.unwrap());
    }

    #[tokio::test]
    async fn min_score_filters_everything_out() {
        let store = Arc::new(InMemoryEmbeddingStore::new());
        store
            .add(Embedding(vec![0.0, 1.0, 0.0]), "bbb".into())
            .await
            .unwrap();

        let retriever =
            EmbeddingStoreContentRetriever::new(Arc::new(LetterModel), store).with_min_score(0.9);
        assert!(retriever.retrieve(&Query::new("a")).await.unwrap().is_empty());
    }
}
