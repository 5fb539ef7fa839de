//! Retrieval-augmented generation contracts.

use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;

/// A retrieval query derived from a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Query text.
    pub text: String,
    /// Conversation the query belongs to, when known.
    pub memory_id: Option<String>,
}

impl Query {
    /// Creates a query without conversation context.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            memory_id: None,
        }
    }

    /// Attaches the conversation identifier.
    #[must_use]
    pub fn with_memory_id(mut self, memory_id: impl Into<String>) -> Self {
        self.memory_id = Some(memory_id.into());
        self
    }
}

/// A piece of content found by a [`ContentRetriever`].
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    /// The retrieved text.
    pub text: String,
    /// Relevance score in `[0, 1]`, when the retriever computes one.
    pub score: Option<f64>,
}

impl Content {
    /// Creates unscored content.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
        }
    }
}

/// Fetches content relevant to a query.
#[async_trait]
pub trait ContentRetriever: Send + Sync + 'static {
    /// Retrieves content for `query`, most relevant first.
    async fn retrieve(&self, query: &Query) -> Result<Vec<Content>, GenerationError>;
}

/// A user message after augmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Augmented {
    /// The text to send in place of the original user message.
    pub message: String,
    /// The content that was injected.
    pub contents: Vec<Content>,
}

/// Rewrites a user message with retrieved context.
#[async_trait]
pub trait RetrievalAugmentor: Send + Sync + 'static {
    /// Augments the user message carried by `query`.
    async fn augment(&self, query: Query) -> Result<Augmented, GenerationError>;
}

/// A [`RetrievalAugmentor`] that runs a single [`ContentRetriever`] and
/// appends its results to the user message.
#[derive(Clone)]
pub struct DefaultRetrievalAugmentor {
    retriever: Arc<dyn ContentRetriever>,
}

impl DefaultRetrievalAugmentor {
    /// Wraps `retriever`.
    #[must_use]
    pub fn new(retriever: Arc<dyn ContentRetriever>) -> Self {
        Self { retriever }
    }

    /// Builds the augmented message. Without contents the message is unchanged.
    #[must_use]
    pub fn inject(message: &str, contents: &[Content]) -> String {
        if contents.is_empty() {
            return message.to_string();
        }
        let context = contents
            .iter()
            .map(|content| content.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("{message}\n\nAnswer using the following information:\n{context}")
    }
}

impl core::fmt::Debug for DefaultRetrievalAugmentor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DefaultRetrievalAugmentor").finish_non_exhaustive()
    }
}

#[async_trait]
impl RetrievalAugmentor for DefaultRetrievalAugmentor {
    async fn augment(&self, query: Query) -> Result<Augmented, GenerationError> {
        let contents = self.retriever.retrieve(&query).await?;
        Ok(Augmented {
            message: Self::inject(&query.text, &contents),
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRetriever(Vec<&'static str>);

    #[async_trait]
    impl ContentRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &Query) -> Result<Vec<Content>, GenerationError> {
            Ok(self.0.iter().copied().map(Content::new).collect())
        }
    }

    #[tokio::test]
    async fn augmentor_appends_retrieved_content() {
        let augmentor = DefaultRetrievalAugmentor::new(Arc::new(FixedRetriever(vec![
            "Espresso costs 2 EUR.",
            "Latte costs 3 EUR.",
        ])));

        let augmented = augmentor.augment(Query::new("Prices?")).await.unwrap();
        assert_eq!(augmented.contents.len(), 2);
        assert!(augmented.message.starts_with("Prices?\n\n"));
        assert!(augmented.message.contains("Espresso costs 2 EUR.\n\nLatte costs 3 EUR."));
    }

    #[tokio::test]
    async fn augmentor_leaves_message_alone_without_content() {
        let augmentor = DefaultRetrievalAugmentor::new(Arc::new(FixedRetriever(vec![])));
        let augmented = augmentor
            .augment(Query::new("Prices?").with_memory_id("m1"))
            .await
            .unwrap();
        assert_eq!(augmented.message, "Prices?");
    }
}
