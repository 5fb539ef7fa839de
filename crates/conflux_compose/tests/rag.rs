mod common;

use common::{FeatureModels, LetterEmbedding, echo};
use conflux_compose::error::{ProducerFailure, RegistrationError};
use conflux_compose::prelude::*;
use conflux_compose::rag::{
    EMBEDDING_MODEL_KEY, EMBEDDING_STORE_KEY, ENABLED_KEY, MAX_RESULTS_KEY, MIN_SCORE_KEY,
    RETRIEVER_NAME, RetrievalPlugin,
};
use conflux_config::MapConfig;
use conflux_models::embedding::{EmbeddingModel, EmbeddingStore, InMemoryEmbeddingStore};
use conflux_models::rag::{ContentRetriever, Query};

struct Library(Assistant);

impl AiService for Library {
    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new::<Self>().no_tools()
    }

    fn assemble(assistant: Assistant) -> Self {
        Library(assistant)
    }
}

fn settings() -> MapConfig {
    MapConfig::new()
        .with(ENABLED_KEY, "true")
        .with(EMBEDDING_MODEL_KEY, "letters")
        .with(EMBEDDING_STORE_KEY, "docs")
}

async fn documents() -> InMemoryEmbeddingStore {
    let store = InMemoryEmbeddingStore::new();
    for text in ["eat", "sss", "ooo"] {
        let embedding = LetterEmbedding.embed(text).await.unwrap();
        store.add(embedding, text.to_string()).await.unwrap();
    }
    store
}

async fn app(config: MapConfig) -> Conflux {
    let mut app = Conflux::new(config);
    app.add_plugins(RetrievalPlugin)
        .add_component(
            ComponentDef::instance(LetterEmbedding)
                .named("letters")
                .exposes::<dyn EmbeddingModel>(|model| model),
        )
        .add_component(
            ComponentDef::instance(documents().await)
                .named("docs")
                .exposes::<dyn EmbeddingStore>(|store| store),
        );
    app
}

async fn retrieve(runtime: &Runtime, text: &str) -> Vec<String> {
    let retriever = runtime
        .registry()
        .lookup::<dyn ContentRetriever>(Some(RETRIEVER_NAME))
        .unwrap();
    retriever
        .retrieve(&Query::new(text))
        .await
        .unwrap()
        .into_iter()
        .map(|content| content.text)
        .collect()
}

#[tokio::test]
async fn enabled_retriever_feeds_composed_services() {
    let mut app = app(settings()).await;
    app.add_provider(ProviderHandle::unnamed(Provider::new(echo("m"))))
        .add_service::<Library>();

    let runtime = app.finish().unwrap();
    let library = runtime.service::<Library>().unwrap();

    assert!(library.0.capabilities().has(CapabilityKind::ContentRetriever));
    let answer = library.0.chat("c", "tea").await.unwrap();
    assert!(answer.starts_with("m: tea\n\nAnswer using the following information:\neat"));
}

#[tokio::test]
async fn retriever_is_absent_unless_enabled() {
    for enabled in [None, Some("false"), Some("TRUE")] {
        let mut config = settings();
        match enabled {
            Some(value) => {
                config.insert(ENABLED_KEY, value);
            }
            None => config = MapConfig::new(),
        }

        let runtime = app(config).await.finish().unwrap();

        assert!(runtime.registry().lookup_all(CapabilityKind::ContentRetriever).is_empty());
        let report = runtime.registration_report();
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].ends_with("EmbeddingStoreRetrieverFactory::create"));
    }
}

#[tokio::test]
async fn max_results_and_min_score_are_applied() {
    let runtime = app(settings()).await.finish().unwrap();
    assert_eq!(retrieve(&runtime, "tea").await.len(), 2);

    let config = settings().with(MAX_RESULTS_KEY, "3");
    let runtime = app(config).await.finish().unwrap();
    assert_eq!(retrieve(&runtime, "tea").await.len(), 3);

    let config = settings().with(MIN_SCORE_KEY, "0.9");
    let runtime = app(config).await.finish().unwrap();
    assert_eq!(retrieve(&runtime, "tea").await, vec!["eat".to_string()]);
}

#[tokio::test]
async fn missing_embedding_model_fails_only_the_retriever() {
    let config = settings()
        .with(EMBEDDING_MODEL_KEY, "unknown")
        .with("feature.x.enabled", "true");
    let mut app = app(config).await;
    app.add_component(ComponentDef::new(|_| Ok(FeatureModels)));

    let runtime = app.finish().unwrap();
    let report = runtime.registration_report();

    assert!(matches!(
        &report.failed[..],
        [RegistrationError::ProducerInvocation {
            cause: ProducerFailure::Construction(_),
            ..
        }]
    ));
    assert!(runtime.registry().lookup_all(CapabilityKind::ContentRetriever).is_empty());
    assert!(
        runtime
            .registry()
            .lookup_by_name(CapabilityKind::ChatModel, "m1")
            .is_ok()
    );
}

#[tokio::test]
async fn negative_max_results_is_rejected() {
    let config = settings().with(MAX_RESULTS_KEY, "-1");
    let runtime = app(config).await.finish().unwrap();

    let failed = &runtime.registration_report().failed;
    assert_eq!(failed.len(), 1);
    assert!(failed[0].producer_id().ends_with("EmbeddingStoreRetrieverFactory::create"));
}
