//! Chat memory contracts and window-based implementations.

use crate::message::Message;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Conversation memory for a single conversation.
///
/// Implementations use interior mutability: a memory is shared by every call
/// a composed service makes for the same conversation.
pub trait ChatMemory: Send + Sync + 'static {
    /// Identifier of the conversation this memory belongs to.
    fn id(&self) -> &str;

    /// Appends a message.
    fn add(&self, message: Message);

    /// Returns the retained messages, oldest first.
    fn messages(&self) -> Vec<Message>;

    /// Forgets every message.
    fn clear(&self);
}

/// Hands out one [`ChatMemory`] per conversation identifier.
pub trait ChatMemoryProvider: Send + Sync + 'static {
    /// Returns the memory for `memory_id`, creating it on first use.
    fn get(&self, memory_id: &str) -> Arc<dyn ChatMemory>;
}

// ─────────────────────────────────────────────────────────────────────────────
// MessageWindowChatMemory
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps the most recent `max_messages` messages.
///
/// The system message, if any, is never evicted and a newer one replaces it.
/// Evicting an assistant message that requested tool calls also evicts the
/// tool results that directly follow it, so the window never starts with an
/// orphaned tool result.
#[derive(Debug)]
pub struct MessageWindowChatMemory {
    id: String,
    max_messages: usize,
    messages: Mutex<VecDeque<Message>>,
}

impl MessageWindowChatMemory {
    /// Creates an empty window.
    ///
    /// A `max_messages` of zero is treated as one.
    #[must_use]
    pub fn new(id: impl Into<String>, max_messages: usize) -> Self {
        Self {
            id: id.into(),
            max_messages: max_messages.max(1),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the window size.
    #[must_use]
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

impl ChatMemory for MessageWindowChatMemory {
    fn id(&self) -> &str {
        &self.id
    }

    fn add(&self, message: Message) {
        let mut messages = self.messages.lock();

        if message.is_system() {
            if messages.iter().any(|existing| existing == &message) {
                return;
            }
            messages.retain(|existing| !existing.is_system());
            messages.push_front(message);
        } else {
            messages.push_back(message);
        }

        while messages.len() > self.max_messages {
            let Some(position) = messages.iter().position(|m| !m.is_system()) else {
                break;
            };
            let evicted = messages.remove(position);
            if evicted.as_ref().is_some_and(Message::has_tool_calls) {
                while matches!(messages.get(position), Some(Message::Tool(_))) {
                    messages.remove(position);
                }
            }
        }
    }

    fn messages(&self) -> Vec<Message> {
        self.messages.lock().iter().cloned().collect()
    }

    fn clear(&self) {
        self.messages.lock().clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WindowChatMemoryProvider
// ─────────────────────────────────────────────────────────────────────────────

/// A [`ChatMemoryProvider`] that keeps a [`MessageWindowChatMemory`] per
/// conversation identifier.
///
/// Each memory is bounded by the window, but the provider keeps one memory
/// for every identifier it has handed out until [`evict`](Self::evict) drops it.
#[derive(Debug)]
pub struct WindowChatMemoryProvider {
    max_messages: usize,
    memories: Mutex<HashMap<String, Arc<MessageWindowChatMemory>>>,
}

impl WindowChatMemoryProvider {
    /// Creates a provider whose memories hold `max_messages` messages each.
    #[must_use]
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            memories: Mutex::new(HashMap::new()),
        }
    }

    /// Number of conversations seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.lock().len()
    }

    /// Returns true if no conversation has been started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memories.lock().is_empty()
    }

    /// Forgets the conversation stored under `memory_id`.
    ///
    /// Handles obtained earlier keep working but are no longer shared with
    /// later [`get`](ChatMemoryProvider::get) calls. Returns false if the
    /// identifier was unknown.
    pub fn evict(&self, memory_id: &str) -> bool {
        self.memories.lock().remove(memory_id).is_some()
    }
}

impl ChatMemoryProvider for WindowChatMemoryProvider {
    fn get(&self, memory_id: &str) -> Arc<dyn ChatMemory> {
        let memory = self
            .memories
            .lock()
            .entry(memory_id.to_string())
            .or_insert_with(|| {
                Arc::new(MessageWindowChatMemory::new(memory_id, self.max_messages))
            })
            .clone();
        memory
    }
}
