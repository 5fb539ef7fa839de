//! Configuration-driven embedding-store content retriever.
//!
//! [`EmbeddingStoreRetrieverFactory`] is a component that declares one
//! guarded producer: when `conflux.rag.embedding-store-content-retriever.enabled`
//! is `"true"`, it registers a content retriever named
//! `embeddingStoreContentRetriever`, built from the embedding model and
//! store named in configuration.
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `conflux.rag.embedding-model` | Name of the `dyn EmbeddingModel` component |
//! | `conflux.rag.embedding-store` | Name of the `dyn EmbeddingStore` component |
//! | `conflux.rag.display-name` | Retriever display name |
//! | `conflux.rag.max-results` | Matches returned per query (default 2) |
//! | `conflux.rag.min-score` | Minimum match score (default 0.0) |

use crate::app::Conflux;
use crate::component::{Component, ComponentDef};
use crate::container::Container;
use crate::error::BoxError;
use crate::plugin::Plugin;
use crate::producer::GuardedProducer;
use conflux_config::{ConfigError, ConfigSource};
use conflux_models::embedding::{
    EmbeddingModel, EmbeddingStore, EmbeddingStoreContentRetriever, InMemoryEmbeddingStore,
};
use conflux_models::rag::ContentRetriever;
use std::sync::Arc;

/// Guard key enabling the retriever.
pub const ENABLED_KEY: &str = "conflux.rag.embedding-store-content-retriever.enabled";
/// Name of the embedding model component.
pub const EMBEDDING_MODEL_KEY: &str = "conflux.rag.embedding-model";
/// Name of the embedding store component.
pub const EMBEDDING_STORE_KEY: &str = "conflux.rag.embedding-store";
/// Display name of the retriever.
pub const DISPLAY_NAME_KEY: &str = "conflux.rag.display-name";
/// Maximum number of matches per query.
pub const MAX_RESULTS_KEY: &str = "conflux.rag.max-results";
/// Minimum score of a match.
pub const MIN_SCORE_KEY: &str = "conflux.rag.min-score";
/// Name the produced retriever is registered under.
pub const RETRIEVER_NAME: &str = "embeddingStoreContentRetriever";

/// Builds an [`EmbeddingStoreContentRetriever`] from configuration.
pub struct EmbeddingStoreRetrieverFactory {
    model: Option<Arc<dyn EmbeddingModel>>,
    store: Option<Arc<dyn EmbeddingStore>>,
    display_name: Option<String>,
    max_results: usize,
    min_score: f64,
}

impl EmbeddingStoreRetrieverFactory {
    /// Reads the retriever settings and resolves the named model and store.
    ///
    /// # Errors
    ///
    /// Fails if a setting does not parse or a named component is missing.
    pub fn from_container(container: &Container) -> Result<Self, BoxError> {
        let config = container.resolve::<dyn ConfigSource>()?;

        let model = config
            .get_string(EMBEDDING_MODEL_KEY)
            .map(|name| container.resolve_named::<dyn EmbeddingModel>(&name))
            .transpose()?;
        let store = config
            .get_string(EMBEDDING_STORE_KEY)
            .map(|name| container.resolve_named::<dyn EmbeddingStore>(&name))
            .transpose()?;

        let max_results = match config.get_i64(MAX_RESULTS_KEY)? {
            Some(value) => usize::try_from(value).map_err(|_| ConfigError::InvalidValue {
                key: MAX_RESULTS_KEY.to_string(),
                value: value.to_string(),
                expected: "a non-negative integer",
            })?,
            None => EmbeddingStoreContentRetriever::DEFAULT_MAX_RESULTS,
        };

        Ok(Self {
            model,
            store,
            display_name: config.get_string(DISPLAY_NAME_KEY),
            max_results,
            min_score: config
                .get_f64(MIN_SCORE_KEY)?
                .unwrap_or(EmbeddingStoreContentRetriever::DEFAULT_MIN_SCORE),
        })
    }

    /// Component definition for registering the factory.
    #[must_use]
    pub fn definition() -> ComponentDef<Self> {
        ComponentDef::new(Self::from_container)
    }

    /// Builds the retriever.
    ///
    /// # Errors
    ///
    /// Fails if no embedding model or store is configured.
    pub fn create(&self) -> Result<Arc<dyn ContentRetriever>, BoxError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| format!("`{EMBEDDING_MODEL_KEY}` is not configured"))?;
        let store = self
            .store
            .clone()
            .ok_or_else(|| format!("`{EMBEDDING_STORE_KEY}` is not configured"))?;

        let mut retriever = EmbeddingStoreContentRetriever::new(model, store)
            .with_max_results(self.max_results)
            .with_min_score(self.min_score);
        if let Some(name) = &self.display_name {
            retriever = retriever.with_display_name(name.clone());
        }
        Ok(Arc::new(retriever))
    }
}

impl Component for EmbeddingStoreRetrieverFactory {
    fn guarded_producers() -> Vec<GuardedProducer> {
        vec![
            GuardedProducer::new::<Self, dyn ContentRetriever>(
                "create",
                ENABLED_KEY,
                "true",
                Self::create,
            )
            .named(RETRIEVER_NAME),
        ]
    }
}

impl core::fmt::Debug for EmbeddingStoreRetrieverFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmbeddingStoreRetrieverFactory")
            .field("model", &self.model.is_some())
            .field("store", &self.store.is_some())
            .field("display_name", &self.display_name)
            .field("max_results", &self.max_results)
            .field("min_score", &self.min_score)
            .finish()
    }
}

impl Component for InMemoryEmbeddingStore {}

/// Registers [`EmbeddingStoreRetrieverFactory`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RetrievalPlugin;

impl Plugin for RetrievalPlugin {
    fn build(&self, app: &mut Conflux) {
        app.add_component(EmbeddingStoreRetrieverFactory::definition());
    }
}
