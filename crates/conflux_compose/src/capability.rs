//! Capability kinds and the provider union.
//!
//! Every provider registered with the engine fills exactly one slot of an
//! assembled service. [`CapabilityKind`] names the slot, [`Provider`] carries
//! the instance, and the [`Capability`] trait ties a trait object type such as
//! `dyn ChatModel` to its kind so lookups can be typed.

use conflux_models::chat::{ChatModel, StreamingChatModel};
use conflux_models::memory::{ChatMemory, ChatMemoryProvider};
use conflux_models::moderation::ModerationModel;
use conflux_models::rag::{ContentRetriever, RetrievalAugmentor};
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// CapabilityKind
// ─────────────────────────────────────────────────────────────────────────────

/// The slot a provider fills in an assembled service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    /// Blocking chat model.
    ChatModel,
    /// Token-streaming chat model.
    StreamingChatModel,
    /// A single shared conversation memory.
    Memory,
    /// Per-conversation memory keyed by memory id.
    MemoryProvider,
    /// Input moderation.
    ModerationModel,
    /// Retrieval of supporting content for a query.
    ContentRetriever,
    /// Query augmentation with retrieved content.
    RetrievalAugmentor,
}

impl CapabilityKind {
    /// Every kind, in slot resolution order.
    pub const ALL: [CapabilityKind; 7] = [
        CapabilityKind::ChatModel,
        CapabilityKind::StreamingChatModel,
        CapabilityKind::Memory,
        CapabilityKind::MemoryProvider,
        CapabilityKind::ModerationModel,
        CapabilityKind::ContentRetriever,
        CapabilityKind::RetrievalAugmentor,
    ];

    /// Returns the kind's display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::ChatModel => "ChatModel",
            CapabilityKind::StreamingChatModel => "StreamingChatModel",
            CapabilityKind::Memory => "Memory",
            CapabilityKind::MemoryProvider => "MemoryProvider",
            CapabilityKind::ModerationModel => "ModerationModel",
            CapabilityKind::ContentRetriever => "ContentRetriever",
            CapabilityKind::RetrievalAugmentor => "RetrievalAugmentor",
        }
    }
}

impl core::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// A provider instance tagged with its capability kind.
#[derive(Clone)]
pub enum Provider {
    /// See [`CapabilityKind::ChatModel`].
    ChatModel(Arc<dyn ChatModel>),
    /// See [`CapabilityKind::StreamingChatModel`].
    StreamingChatModel(Arc<dyn StreamingChatModel>),
    /// See [`CapabilityKind::Memory`].
    Memory(Arc<dyn ChatMemory>),
    /// See [`CapabilityKind::MemoryProvider`].
    MemoryProvider(Arc<dyn ChatMemoryProvider>),
    /// See [`CapabilityKind::ModerationModel`].
    ModerationModel(Arc<dyn ModerationModel>),
    /// See [`CapabilityKind::ContentRetriever`].
    ContentRetriever(Arc<dyn ContentRetriever>),
    /// See [`CapabilityKind::RetrievalAugmentor`].
    RetrievalAugmentor(Arc<dyn RetrievalAugmentor>),
}

impl Provider {
    /// Wraps a typed provider instance.
    #[must_use]
    pub fn new<T: Capability + ?Sized>(instance: Arc<T>) -> Self {
        T::wrap(instance)
    }

    /// Returns the kind this provider belongs to.
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Provider::ChatModel(_) => CapabilityKind::ChatModel,
            Provider::StreamingChatModel(_) => CapabilityKind::StreamingChatModel,
            Provider::Memory(_) => CapabilityKind::Memory,
            Provider::MemoryProvider(_) => CapabilityKind::MemoryProvider,
            Provider::ModerationModel(_) => CapabilityKind::ModerationModel,
            Provider::ContentRetriever(_) => CapabilityKind::ContentRetriever,
            Provider::RetrievalAugmentor(_) => CapabilityKind::RetrievalAugmentor,
        }
    }

    /// Returns the typed instance if this provider is of kind `T::KIND`.
    #[must_use]
    pub fn get<T: Capability + ?Sized>(&self) -> Option<Arc<T>> {
        T::unwrap(self)
    }
}

impl core::fmt::Debug for Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Provider").field(&self.kind()).finish()
    }
}

/// A provider together with its optional registration name.
#[derive(Debug, Clone)]
pub struct ProviderHandle {
    name: Option<String>,
    provider: Provider,
}

impl ProviderHandle {
    /// Creates a handle. An empty name is treated as no name.
    #[must_use]
    pub fn new(name: Option<String>, provider: Provider) -> Self {
        Self {
            name: name.filter(|name| !name.is_empty()),
            provider,
        }
    }

    /// Creates an unnamed handle.
    #[must_use]
    pub fn unnamed(provider: Provider) -> Self {
        Self::new(None, provider)
    }

    /// Creates a named handle.
    #[must_use]
    pub fn named(name: impl Into<String>, provider: Provider) -> Self {
        Self::new(Some(name.into()), provider)
    }

    /// Returns the registration name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the provider's kind.
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.provider.kind()
    }

    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a provider trait object type to its [`CapabilityKind`].
///
/// Implemented for the seven contract traits (`dyn ChatModel`,
/// `dyn ChatMemory`, ...). It lets producers and lookups stay typed while the
/// registry stores the erased [`Provider`].
pub trait Capability: Send + Sync + 'static {
    /// The kind this type provides.
    const KIND: CapabilityKind;

    /// Wraps an instance into the matching [`Provider`] variant.
    fn wrap(instance: Arc<Self>) -> Provider;

    /// Extracts an instance from a provider of the matching variant.
    fn unwrap(provider: &Provider) -> Option<Arc<Self>>;
}

macro_rules! impl_capability {
    ($($variant:ident => $contract:ident),* $(,)?) => {
        $(
            impl Capability for dyn $contract {
                const KIND: CapabilityKind = CapabilityKind::$variant;

                fn wrap(instance: Arc<Self>) -> Provider {
                    Provider::$variant(instance)
                }

                fn unwrap(provider: &Provider) -> Option<Arc<Self>> {
                    match provider {
                        Provider::$variant(instance) => Some(Arc::clone(instance)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_capability! {
    ChatModel => ChatModel,
    StreamingChatModel => StreamingChatModel,
    Memory => ChatMemory,
    MemoryProvider => ChatMemoryProvider,
    ModerationModel => ModerationModel,
    ContentRetriever => ContentRetriever,
    RetrievalAugmentor => RetrievalAugmentor,
}
