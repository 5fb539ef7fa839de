mod common;

use common::{FixedRetriever, ScriptedModel, WordFilter, WordStreamer, echo, tool_call};
use conflux_compose::prelude::*;
use conflux_models::chat::{ChatModel, StreamingChatModel};
use conflux_models::memory::{ChatMemory, ChatMemoryProvider, WindowChatMemoryProvider};
use conflux_models::moderation::ModerationModel;
use conflux_models::rag::ContentRetriever;
use conflux_models::{ChatResponse, Message};
use conflux_tools::ToolError;
use futures::StreamExt;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Deserialize, JsonSchema)]
struct WeatherArgs {
    city: String,
}

#[derive(Default)]
struct Weather {
    forecasts: Arc<AtomicUsize>,
}

impl Weather {
    fn forecast(&self, args: WeatherArgs) -> Result<String, ToolError> {
        self.forecasts.fetch_add(1, Ordering::SeqCst);
        if args.city.is_empty() {
            return Err(ToolError::execution_error("city is required"));
        }
        Ok(format!("sunny in {}", args.city))
    }
}

impl Component for Weather {
    fn tools(tools: &mut ToolSet<Self>) {
        tools.method("forecast", "Weather forecast.", Weather::forecast);
    }
}

fn assistant(descriptor: &ServiceDescriptor, handles: Vec<ProviderHandle>) -> Assistant {
    assistant_with(descriptor, handles, Weather::default())
}

fn assistant_with(
    descriptor: &ServiceDescriptor,
    handles: Vec<ProviderHandle>,
    weather: Weather,
) -> Assistant {
    let mut registry = CapabilityRegistry::new();
    for handle in handles {
        registry.register(handle).unwrap();
    }
    let mut container = Container::new();
    container.register(ComponentDef::instance(weather)).unwrap();

    ServiceComposer::new(&registry, &container)
        .compose(descriptor)
        .unwrap()
        .assistant
}

struct Service;

fn chat(model: Arc<dyn ChatModel>) -> ProviderHandle {
    ProviderHandle::unnamed(Provider::new(model))
}

#[tokio::test]
async fn tool_calls_round_trip_through_bound_tools() {
    let model = ScriptedModel::new([
        tool_call("1", "forecast", serde_json::json!({"city": "Oslo"})),
        ChatResponse::text("It is sunny in Oslo."),
    ]);
    let descriptor = ServiceDescriptor::new::<Service>();
    let assistant = assistant(&descriptor, vec![chat(model.clone())]);

    let answer = assistant.chat("c", "Weather in Oslo?").await.unwrap();

    assert_eq!(answer, "It is sunny in Oslo.");
    let requests = model.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    let Some(Message::Tool(result)) = requests[1].messages.last() else {
        panic!("expected a tool result");
    };
    assert_eq!(result.call_id, "1");
    assert_eq!(result.content, "sunny in Oslo");
    assert!(!result.is_error);
}

#[tokio::test]
async fn failing_tools_are_reported_to_the_model() {
    let model = ScriptedModel::new([
        tool_call("1", "forecast", serde_json::json!({"city": ""})),
        tool_call("2", "teleport", serde_json::json!({})),
        ChatResponse::text("Sorry."),
    ]);
    let descriptor = ServiceDescriptor::new::<Service>();
    let assistant = assistant(&descriptor, vec![chat(model.clone())]);

    assert_eq!(assistant.chat("c", "?").await.unwrap(), "Sorry.");

    let requests = model.requests.lock();
    let results: Vec<_> = requests[2]
        .messages
        .iter()
        .filter_map(|message| match message {
            Message::Tool(result) => Some(result.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.is_error));
    assert!(results[1].content.contains("Unknown tool: teleport"));
}

#[tokio::test]
async fn endless_tool_requests_hit_the_round_limit() {
    let weather = Weather::default();
    let forecasts = Arc::clone(&weather.forecasts);
    let calls = (0..5).map(|i| tool_call(&i.to_string(), "forecast", serde_json::json!({"city": "Rome"})));
    let model = ScriptedModel::new(calls);
    let descriptor = ServiceDescriptor::new::<Service>().max_tool_rounds(2);
    let assistant = assistant_with(&descriptor, vec![chat(model.clone())], weather);

    let err = assistant.chat("c", "loop").await.unwrap_err();
    assert!(matches!(err, ServiceError::TooManyToolRounds { limit: 2 }));
    assert_eq!(model.requests.lock().len(), 3);
    assert_eq!(forecasts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn tools_are_not_run_past_the_round_limit() {
    let weather = Weather::default();
    let forecasts = Arc::clone(&weather.forecasts);
    let calls = (0..5).map(|i| tool_call(&i.to_string(), "forecast", serde_json::json!({"city": "Rome"})));
    let model = ScriptedModel::new(calls);
    let memories: Arc<dyn ChatMemoryProvider> = Arc::new(WindowChatMemoryProvider::new(20));
    let descriptor = ServiceDescriptor::new::<Service>().max_tool_rounds(1);
    let assistant = assistant_with(
        &descriptor,
        vec![chat(model.clone()), ProviderHandle::unnamed(Provider::new(Arc::clone(&memories)))],
        weather,
    );

    let err = assistant.chat("c", "loop").await.unwrap_err();
    assert!(matches!(err, ServiceError::TooManyToolRounds { limit: 1 }));
    assert_eq!(model.requests.lock().len(), 2);
    assert_eq!(forecasts.load(Ordering::SeqCst), 1);

    // The rejected request leaves no unanswered tool call behind.
    let history = memories.get("c").messages();
    assert!(matches!(history.last(), Some(Message::Tool(_))));
}

#[tokio::test]
async fn answers_after_the_last_allowed_round_succeed() {
    let weather = Weather::default();
    let forecasts = Arc::clone(&weather.forecasts);
    let model = ScriptedModel::new([
        tool_call("1", "forecast", serde_json::json!({"city": "Rome"})),
        ChatResponse::text("Sunny."),
    ]);
    let descriptor = ServiceDescriptor::new::<Service>().max_tool_rounds(1);
    let assistant = assistant_with(&descriptor, vec![chat(model)], weather);

    assert_eq!(assistant.chat("c", "?").await.unwrap(), "Sunny.");
    assert_eq!(forecasts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn memory_is_kept_per_memory_id() {
    let model = ScriptedModel::new([
        ChatResponse::text("one"),
        ChatResponse::text("two"),
        ChatResponse::text("three"),
    ]);
    let memories: Arc<dyn ChatMemoryProvider> = Arc::new(WindowChatMemoryProvider::new(10));
    let descriptor = ServiceDescriptor::new::<Service>()
        .no_tools()
        .system_message("Be brief.");
    let assistant = assistant(
        &descriptor,
        vec![chat(model.clone()), ProviderHandle::unnamed(Provider::new(memories))],
    );

    assistant.chat("alice", "first").await.unwrap();
    assistant.chat("bob", "hello").await.unwrap();
    assistant.chat("alice", "second").await.unwrap();

    let requests = model.requests.lock();
    // system, user, assistant, user
    assert_eq!(requests[2].messages.len(), 4);
    assert!(requests[2].messages[0].is_system());
    assert_eq!(requests[2].messages[1].text(), Some("first"));
    assert_eq!(requests[1].messages.len(), 2);

    let alice = assistant.memory("alice").unwrap();
    assert_eq!(alice.messages().len(), 5);
}

#[tokio::test]
async fn moderation_blocks_flagged_input() {
    let model = ScriptedModel::new([ChatResponse::text("never")]);
    let moderation: Arc<dyn ModerationModel> = Arc::new(WordFilter { word: "forbidden" });
    let descriptor = ServiceDescriptor::new::<Service>().no_tools();
    let assistant = assistant(
        &descriptor,
        vec![chat(model.clone()), ProviderHandle::unnamed(Provider::new(moderation))],
    );

    let err = assistant.chat("c", "a forbidden topic").await.unwrap_err();

    assert!(matches!(err, ServiceError::Moderated { ref text } if text == "a forbidden topic"));
    assert!(model.requests.lock().is_empty());
}

#[tokio::test]
async fn retrieved_content_is_injected_into_the_user_message() {
    let model = ScriptedModel::new([ChatResponse::text("ok")]);
    let retriever: Arc<dyn ContentRetriever> =
        Arc::new(FixedRetriever(vec!["Opening hours: 9-17.", "Closed on Sundays."]));
    let descriptor = ServiceDescriptor::new::<Service>().no_tools();
    let assistant = assistant(
        &descriptor,
        vec![chat(model.clone()), ProviderHandle::unnamed(Provider::new(retriever))],
    );

    assistant.chat("c", "When are you open?").await.unwrap();

    let requests = model.requests.lock();
    let sent = requests[0].last_user_text().unwrap();
    assert!(sent.starts_with("When are you open?"));
    assert!(sent.contains("Opening hours: 9-17.\n\nClosed on Sundays."));
}

#[tokio::test]
async fn streaming_model_serves_chat_when_no_blocking_model() {
    let streaming: Arc<dyn StreamingChatModel> = Arc::new(WordStreamer {
        answer: "streamed reply here",
    });
    let memories: Arc<dyn ChatMemoryProvider> = Arc::new(WindowChatMemoryProvider::new(10));
    let descriptor = ServiceDescriptor::new::<Service>().no_tools();
    let assistant = assistant(
        &descriptor,
        vec![
            ProviderHandle::unnamed(Provider::new(streaming)),
            ProviderHandle::unnamed(Provider::new(memories)),
        ],
    );

    assert_eq!(assistant.chat("c", "hi").await.unwrap(), "streamed reply here");

    let stored = assistant.memory("c").unwrap().messages();
    assert_eq!(stored.last().and_then(Message::text), Some("streamed reply here"));
}

#[tokio::test]
async fn chat_stream_yields_tokens() {
    let streaming: Arc<dyn StreamingChatModel> = Arc::new(WordStreamer { answer: "a b c" });
    let descriptor = ServiceDescriptor::new::<Service>().no_tools();
    let assistant = assistant(
        &descriptor,
        vec![chat(echo("m")), ProviderHandle::unnamed(Provider::new(streaming))],
    );

    let tokens: Vec<String> = assistant
        .chat_stream("c", "go")
        .await
        .unwrap()
        .map(|token| token.unwrap())
        .collect()
        .await;

    assert_eq!(tokens, vec!["a ", "b ", "c"]);
}

#[tokio::test]
async fn chat_stream_without_streaming_model_fails() {
    let descriptor = ServiceDescriptor::new::<Service>().no_tools();
    let assistant = assistant(&descriptor, vec![chat(echo("m"))]);

    let err = assistant.chat_stream("c", "go").await.err().unwrap();
    assert!(matches!(err, ServiceError::NoStreamingModel { .. }));
}
