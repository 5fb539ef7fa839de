//! Capability contracts for Conflux services.
//!
//! A composed service is assembled from independently registered providers,
//! one per capability kind. This crate defines the contract each kind of
//! provider implements, plus the conversation types they exchange.
//!
//! # Overview
//!
//! | Capability | Trait |
//! |------------|-------|
//! | Chat model | [`ChatModel`](chat::ChatModel) |
//! | Streaming chat model | [`StreamingChatModel`](chat::StreamingChatModel) |
//! | Memory | [`ChatMemory`](memory::ChatMemory) |
//! | Memory provider | [`ChatMemoryProvider`](memory::ChatMemoryProvider) |
//! | Moderation model | [`ModerationModel`](moderation::ModerationModel) |
//! | Content retriever | [`ContentRetriever`](rag::ContentRetriever) |
//! | Retrieval augmentor | [`RetrievalAugmentor`](rag::RetrievalAugmentor) |
//!
//! Provider crates depend only on this crate; they never see the
//! composition engine.
//!
//! # In-process implementations
//!
//! - [`MessageWindowChatMemory`](memory::MessageWindowChatMemory) and
//!   [`WindowChatMemoryProvider`](memory::WindowChatMemoryProvider)
//! - [`DefaultRetrievalAugmentor`](rag::DefaultRetrievalAugmentor)
//! - [`InMemoryEmbeddingStore`](embedding::InMemoryEmbeddingStore) and
//!   [`EmbeddingStoreContentRetriever`](embedding::EmbeddingStoreContentRetriever)

pub mod chat;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod message;
pub mod moderation;
pub mod rag;

pub use chat::{ChatModel, StreamingChatModel, TokenStream};
pub use error::GenerationError;
pub use message::{ChatRequest, ChatResponse, Message, ToolCall, ToolDefinition, ToolResult, Usage};
