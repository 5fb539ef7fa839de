//! Chat model contracts.

use crate::error::GenerationError;
use crate::message::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A stream of partial text tokens produced by a [`StreamingChatModel`].
pub type TokenStream = BoxStream<'static, Result<String, GenerationError>>;

/// A model that answers a chat request in one piece.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Sends a chat request to the model.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GenerationError>;
}

/// A model that streams its answer token by token.
///
/// Streaming models do not request tool calls; composed services only use
/// them for plain text exchanges.
#[async_trait]
pub trait StreamingChatModel: Send + Sync + 'static {
    /// Starts streaming the answer to `request`.
    async fn stream(&self, request: ChatRequest) -> Result<TokenStream, GenerationError>;
}
