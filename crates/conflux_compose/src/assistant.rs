//! The assembled service implementation.
//!
//! An [`Assistant`] holds the capabilities resolved for one service
//! descriptor and runs a conversation turn with them:
//!
//! 1. augment the user message with retrieved content, if a retrieval
//!    augmentor (or a content retriever) is composed;
//! 2. record the system and user messages in the conversation memory;
//! 3. run the moderation model over the conversation;
//! 4. call the chat model, executing requested tools and feeding their
//!    results back until the model answers in plain text.
//!
//! Without a blocking chat model, turns are served by the streaming chat
//! model instead.

use crate::capability::CapabilityKind;
use crate::descriptor::ServiceDescriptor;
use crate::error::ServiceError;
use crate::tools::{BoundTool, toolbox};
use conflux_models::chat::{ChatModel, StreamingChatModel, TokenStream};
use conflux_models::memory::{ChatMemory, ChatMemoryProvider};
use conflux_models::moderation::ModerationModel;
use conflux_models::rag::{
    ContentRetriever, DefaultRetrievalAugmentor, Query, RetrievalAugmentor,
};
use conflux_models::{ChatRequest, Message, ToolCall, ToolResult};
use conflux_tools::ToolBox;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// The providers resolved for a service. Empty slots are `None`.
#[derive(Clone, Default)]
pub struct Capabilities {
    /// Blocking chat model.
    pub chat_model: Option<Arc<dyn ChatModel>>,
    /// Streaming chat model.
    pub streaming_chat_model: Option<Arc<dyn StreamingChatModel>>,
    /// Shared conversation memory.
    pub memory: Option<Arc<dyn ChatMemory>>,
    /// Per-conversation memory.
    pub memory_provider: Option<Arc<dyn ChatMemoryProvider>>,
    /// Input moderation.
    pub moderation_model: Option<Arc<dyn ModerationModel>>,
    /// Content retrieval.
    pub content_retriever: Option<Arc<dyn ContentRetriever>>,
    /// Query augmentation.
    pub retrieval_augmentor: Option<Arc<dyn RetrievalAugmentor>>,
    /// Tools the chat model may call.
    pub tools: Vec<BoundTool>,
}

impl Capabilities {
    /// Returns true if the slot of `kind` is filled.
    #[must_use]
    pub fn has(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::ChatModel => self.chat_model.is_some(),
            CapabilityKind::StreamingChatModel => self.streaming_chat_model.is_some(),
            CapabilityKind::Memory => self.memory.is_some(),
            CapabilityKind::MemoryProvider => self.memory_provider.is_some(),
            CapabilityKind::ModerationModel => self.moderation_model.is_some(),
            CapabilityKind::ContentRetriever => self.content_retriever.is_some(),
            CapabilityKind::RetrievalAugmentor => self.retrieval_augmentor.is_some(),
        }
    }

    /// Returns the filled kinds, in slot order.
    #[must_use]
    pub fn filled(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }
}

impl core::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Capabilities")
            .field("filled", &self.filled())
            .field("tools", &self.tools)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript
// ─────────────────────────────────────────────────────────────────────────────

/// The conversation of one turn: the composed memory, or a scratch list when
/// no memory is composed.
struct Transcript {
    memory: Option<Arc<dyn ChatMemory>>,
    scratch: Vec<Message>,
}

impl Transcript {
    fn push(&mut self, message: Message) {
        match &self.memory {
            Some(memory) => memory.add(message),
            None => self.scratch.push(message),
        }
    }

    fn messages(&self) -> Vec<Message> {
        match &self.memory {
            Some(memory) => memory.messages(),
            None => self.scratch.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assistant
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    service: &'static str,
    capabilities: Capabilities,
    augmentor: Option<Arc<dyn RetrievalAugmentor>>,
    toolbox: ToolBox,
    system_message: Option<String>,
    max_tool_rounds: usize,
}

/// A composed service implementation. Cloning is cheap.
#[derive(Clone)]
pub struct Assistant {
    inner: Arc<Inner>,
}

impl Assistant {
    /// Assembles an assistant from a descriptor and its resolved capabilities.
    ///
    /// An explicit retrieval augmentor wins; otherwise a lone content
    /// retriever is wrapped in a [`DefaultRetrievalAugmentor`].
    #[must_use]
    pub fn new(descriptor: &ServiceDescriptor, capabilities: Capabilities) -> Self {
        let augmentor = capabilities.retrieval_augmentor.clone().or_else(|| {
            capabilities.content_retriever.clone().map(|retriever| {
                Arc::new(DefaultRetrievalAugmentor::new(retriever)) as Arc<dyn RetrievalAugmentor>
            })
        });
        Self {
            inner: Arc::new(Inner {
                service: descriptor.service(),
                toolbox: toolbox(&capabilities.tools),
                capabilities,
                augmentor,
                system_message: descriptor.system_message_text().map(str::to_string),
                max_tool_rounds: descriptor.tool_round_limit(),
            }),
        }
    }

    /// Returns the name of the service this assistant implements.
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.inner.service
    }

    /// Returns the resolved capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    /// Returns the tools the chat model may call.
    #[must_use]
    pub fn tools(&self) -> &[BoundTool] {
        &self.inner.capabilities.tools
    }

    /// Returns the memory used for `memory_id`, if any memory is composed.
    ///
    /// A memory provider takes precedence over a shared memory.
    #[must_use]
    pub fn memory(&self, memory_id: &str) -> Option<Arc<dyn ChatMemory>> {
        let capabilities = &self.inner.capabilities;
        match &capabilities.memory_provider {
            Some(provider) => Some(provider.get(memory_id)),
            None => capabilities.memory.clone(),
        }
    }

    /// Runs one conversation turn and returns the model's final answer.
    ///
    /// # Errors
    ///
    /// Fails if moderation flags the input, if any model call fails, or if
    /// the model keeps requesting tools past the configured round limit.
    /// Tool failures are not errors: they are reported back to the model.
    pub async fn chat(
        &self,
        memory_id: &str,
        message: impl Into<String>,
    ) -> Result<String, ServiceError> {
        let mut transcript = self.open(memory_id, message.into()).await?;

        let Some(model) = self.inner.capabilities.chat_model.clone() else {
            let mut tokens = self.stream_transcript(transcript).await?;
            let mut answer = String::new();
            while let Some(token) = tokens.next().await {
                answer.push_str(&token?);
            }
            return Ok(answer);
        };

        let definitions = self.inner.toolbox.definitions();
        let mut round = 0;
        loop {
            let request = ChatRequest::new(transcript.messages()).tools(definitions.clone());
            let response = model.chat(request).await?;
            let calls = response.tool_calls.clone();

            if calls.is_empty() {
                let answer = response.content.clone().unwrap_or_default();
                transcript.push(response.into_message());
                return Ok(answer);
            }
            // Rejected requests are not recorded: their calls would stay unanswered.
            if round == self.inner.max_tool_rounds {
                tracing::warn!(
                    service = self.inner.service,
                    limit = self.inner.max_tool_rounds,
                    "tool round limit reached"
                );
                return Err(ServiceError::TooManyToolRounds {
                    limit: self.inner.max_tool_rounds,
                });
            }
            transcript.push(response.into_message());

            tracing::debug!(
                service = self.inner.service,
                round,
                calls = calls.len(),
                "executing tool calls"
            );
            for call in calls {
                let result = self.invoke(call).await;
                transcript.push(Message::Tool(result));
            }
            round += 1;
        }
    }

    /// Runs one conversation turn on the streaming chat model.
    ///
    /// The complete answer is added to memory once the stream ends.
    ///
    /// # Errors
    ///
    /// Fails if no streaming chat model is composed, if moderation flags the
    /// input, or if starting the stream fails.
    pub async fn chat_stream(
        &self,
        memory_id: &str,
        message: impl Into<String>,
    ) -> Result<TokenStream, ServiceError> {
        if self.inner.capabilities.streaming_chat_model.is_none() {
            return Err(ServiceError::NoStreamingModel {
                service: self.inner.service,
            });
        }
        let transcript = self.open(memory_id, message.into()).await?;
        self.stream_transcript(transcript).await
    }

    /// Augments, records and moderates the incoming message.
    async fn open(&self, memory_id: &str, message: String) -> Result<Transcript, ServiceError> {
        let text = match &self.inner.augmentor {
            Some(augmentor) => {
                let augmented = augmentor
                    .augment(Query::new(message).with_memory_id(memory_id))
                    .await?;
                tracing::trace!(contents = augmented.contents.len(), "message augmented");
                augmented.message
            }
            None => message,
        };

        let mut transcript = Transcript {
            memory: self.memory(memory_id),
            scratch: Vec::new(),
        };
        if let Some(system) = &self.inner.system_message {
            transcript.push(Message::system(system.clone()));
        }
        transcript.push(Message::user(text));

        if let Some(moderation) = &self.inner.capabilities.moderation_model {
            let verdict = moderation.moderate(&transcript.messages()).await?;
            if let Some(text) = verdict.flagged_text() {
                tracing::warn!(service = self.inner.service, "message flagged by moderation");
                return Err(ServiceError::Moderated {
                    text: text.to_string(),
                });
            }
        }
        Ok(transcript)
    }

    async fn stream_transcript(&self, transcript: Transcript) -> Result<TokenStream, ServiceError> {
        let Some(model) = &self.inner.capabilities.streaming_chat_model else {
            return Err(ServiceError::NoStreamingModel {
                service: self.inner.service,
            });
        };
        let tokens = model.stream(ChatRequest::new(transcript.messages())).await?;
        let memory = transcript.memory;

        let stream = futures::stream::unfold(
            Some((tokens, String::new(), memory)),
            |state| async move {
                let Some((mut tokens, mut answer, memory)) = state else {
                    return None;
                };
                match tokens.next().await {
                    Some(Ok(token)) => {
                        answer.push_str(&token);
                        Some((Ok(token), Some((tokens, answer, memory))))
                    }
                    Some(Err(err)) => Some((Err(err), None)),
                    None => {
                        if let Some(memory) = memory {
                            memory.add(Message::assistant(answer));
                        }
                        None
                    }
                }
            },
        );
        Ok(stream.boxed())
    }

    async fn invoke(&self, call: ToolCall) -> ToolResult {
        let outcome = self.inner.toolbox.execute(&call.name, call.arguments).await;
        let (content, is_error) = match outcome {
            Ok(Value::String(text)) => (text, false),
            Ok(value) => (value.to_string(), false),
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool call failed");
                (err.to_string(), true)
            }
        };
        ToolResult {
            call_id: call.id,
            name: call.name,
            content,
            is_error,
        }
    }
}

impl core::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Assistant")
            .field("service", &self.inner.service)
            .field("capabilities", &self.inner.capabilities)
            .field("system_message", &self.inner.system_message)
            .field("max_tool_rounds", &self.inner.max_tool_rounds)
            .finish()
    }
}
