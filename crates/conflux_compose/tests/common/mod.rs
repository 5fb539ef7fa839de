#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use conflux_compose::prelude::*;
use conflux_models::chat::{ChatModel, StreamingChatModel, TokenStream};
use conflux_models::embedding::{Embedding, EmbeddingModel};
use conflux_models::moderation::{Moderation, ModerationModel};
use conflux_models::rag::{Content, ContentRetriever, Query};
use conflux_models::{ChatRequest, ChatResponse, GenerationError, Message, ToolCall};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Chat models
// ─────────────────────────────────────────────────────────────────────────────

/// Replies with `"{label}: {last user message}"`.
pub struct EchoModel {
    pub label: &'static str,
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenerationError> {
        let text = request.last_user_text().unwrap_or_default();
        Ok(ChatResponse::text(format!("{}: {text}", self.label)))
    }
}

pub fn echo(label: &'static str) -> Arc<dyn ChatModel> {
    Arc::new(EchoModel { label })
}

/// Plays back scripted responses and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenerationError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| GenerationError::provider("script exhausted"))
    }
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ChatResponse {
    ChatResponse::tool_calls(vec![ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }])
}

/// Streams the words of a fixed answer.
pub struct WordStreamer {
    pub answer: &'static str,
}

#[async_trait]
impl StreamingChatModel for WordStreamer {
    async fn stream(&self, _request: ChatRequest) -> Result<TokenStream, GenerationError> {
        let tokens: Vec<Result<String, GenerationError>> = self
            .answer
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(Box::pin(futures::stream::iter(tokens)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Moderation and retrieval
// ─────────────────────────────────────────────────────────────────────────────

/// Flags any conversation containing `word`.
pub struct WordFilter {
    pub word: &'static str,
}

#[async_trait]
impl ModerationModel for WordFilter {
    async fn moderate(&self, messages: &[Message]) -> Result<Moderation, GenerationError> {
        Ok(messages
            .iter()
            .filter_map(Message::text)
            .find(|text| text.contains(self.word))
            .map_or_else(Moderation::not_flagged, Moderation::flagged))
    }
}

/// Always returns the same passages.
pub struct FixedRetriever(pub Vec<&'static str>);

#[async_trait]
impl ContentRetriever for FixedRetriever {
    async fn retrieve(&self, _query: &Query) -> Result<Vec<Content>, GenerationError> {
        Ok(self.0.iter().map(|text| Content::new(*text)).collect())
    }
}

/// Embeds text as counts of a handful of letters.
pub struct LetterEmbedding;

#[async_trait]
impl EmbeddingModel for LetterEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, GenerationError> {
        let text = text.to_lowercase();
        Ok(Embedding(
            ['a', 'e', 'i', 'o', 'u', 's', 't']
                .iter()
                .map(|letter| text.chars().filter(|c| c == letter).count() as f32)
                .collect(),
        ))
    }
}

impl Component for LetterEmbedding {}

// ─────────────────────────────────────────────────────────────────────────────
// Producers
// ─────────────────────────────────────────────────────────────────────────────

/// Declares echo chat models gated on `feature.x.enabled`.
pub struct FeatureModels;

impl FeatureModels {
    fn enabled(&self) -> Result<Arc<dyn ChatModel>, BoxError> {
        Ok(echo("m1"))
    }

    fn disabled(&self) -> Result<Arc<dyn ChatModel>, BoxError> {
        Ok(echo("m2"))
    }
}

impl Component for FeatureModels {
    fn guarded_producers() -> Vec<GuardedProducer> {
        vec![
            GuardedProducer::new::<Self, dyn ChatModel>(
                "enabled",
                "feature.x.enabled",
                "true",
                Self::enabled,
            )
            .named("m1"),
            GuardedProducer::new::<Self, dyn ChatModel>(
                "disabled",
                "feature.x.enabled",
                "false",
                Self::disabled,
            )
            .named("m2"),
        ]
    }
}

pub fn chat_handle(name: Option<&str>, model: Arc<dyn ChatModel>) -> ProviderHandle {
    ProviderHandle::new(name.map(str::to_string), Provider::new(model))
}
