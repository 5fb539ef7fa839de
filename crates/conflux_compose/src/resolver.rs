//! Filling a service descriptor's slots from the registry.

use crate::assistant::{Assistant, Capabilities};
use crate::capability::{Capability, CapabilityKind};
use crate::container::Container;
use crate::descriptor::{ServiceDescriptor, SlotSpec};
use crate::error::{ComposeError, LookupError};
use crate::registry::CapabilityRegistry;
use crate::service::AiService;
use crate::tools::{ToolAggregator, toolbox};
use conflux_models::chat::{ChatModel, StreamingChatModel};
use conflux_models::memory::{ChatMemory, ChatMemoryProvider};
use conflux_models::moderation::ModerationModel;
use conflux_models::rag::{ContentRetriever, RetrievalAugmentor};
use std::sync::Arc;

/// A non-fatal finding recorded while composing a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionWarning {
    /// An auto slot matched several providers and was left empty.
    Ambiguous {
        /// The slot's kind.
        kind: CapabilityKind,
        /// Number of candidate providers.
        count: usize,
    },
    /// The service ended up with no tools.
    NoTools,
    /// Several tools share a name; the model cannot tell them apart.
    DuplicateToolNames(Vec<String>),
}

impl core::fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CompositionWarning::Ambiguous { kind, count } => {
                write!(f, "{count} providers of kind {kind}; slot left empty")
            }
            CompositionWarning::NoTools => f.write_str("no tools available"),
            CompositionWarning::DuplicateToolNames(names) => {
                write!(f, "duplicate tool names: {}", names.join(", "))
            }
        }
    }
}

/// A composed service implementation and the warnings raised building it.
#[derive(Debug, Clone)]
pub struct Composition {
    /// The assembled implementation.
    pub assistant: Assistant,
    /// Non-fatal findings.
    pub warnings: Vec<CompositionWarning>,
}

/// Resolves service descriptors against a frozen registry.
///
/// Per slot, an explicit name wins, a disabled slot stays empty, and an
/// automatic slot takes the unique registered provider when auto-discovery
/// is on. A service must end up with a chat model or a streaming chat model.
#[derive(Debug, Clone, Copy)]
pub struct ServiceComposer<'a> {
    registry: &'a CapabilityRegistry,
    container: &'a Container,
}

impl<'a> ServiceComposer<'a> {
    /// Creates a composer over a registry and the container holding tool
    /// components.
    #[must_use]
    pub fn new(registry: &'a CapabilityRegistry, container: &'a Container) -> Self {
        Self {
            registry,
            container,
        }
    }

    /// Composes the service described by `descriptor`.
    ///
    /// # Errors
    ///
    /// See [`ComposeError`].
    pub fn compose(&self, descriptor: &ServiceDescriptor) -> Result<Composition, ComposeError> {
        let service = descriptor.service();
        let mut warnings = Vec::new();

        let mut capabilities = Capabilities {
            chat_model: self.slot::<dyn ChatModel>(descriptor, &mut warnings)?,
            streaming_chat_model: self.slot::<dyn StreamingChatModel>(descriptor, &mut warnings)?,
            memory: self.slot::<dyn ChatMemory>(descriptor, &mut warnings)?,
            memory_provider: self.slot::<dyn ChatMemoryProvider>(descriptor, &mut warnings)?,
            moderation_model: self.slot::<dyn ModerationModel>(descriptor, &mut warnings)?,
            content_retriever: self.slot::<dyn ContentRetriever>(descriptor, &mut warnings)?,
            retrieval_augmentor: self.slot::<dyn RetrievalAugmentor>(descriptor, &mut warnings)?,
            tools: Vec::new(),
        };

        capabilities.tools = ToolAggregator::new(self.container)
            .aggregate(descriptor.tool_spec())
            .map_err(|source| ComposeError::ToolComponent { service, source })?;

        if capabilities.tools.is_empty() {
            tracing::warn!(service, "service has no tools");
            warnings.push(CompositionWarning::NoTools);
        } else {
            let duplicates = toolbox(&capabilities.tools).duplicate_names();
            if !duplicates.is_empty() {
                tracing::warn!(service, ?duplicates, "several tools share a name");
                warnings.push(CompositionWarning::DuplicateToolNames(duplicates));
            }
        }

        if capabilities.chat_model.is_none() && capabilities.streaming_chat_model.is_none() {
            let ambiguous = warnings
                .iter()
                .filter_map(|warning| match warning {
                    CompositionWarning::Ambiguous { kind, .. }
                        if matches!(
                            kind,
                            CapabilityKind::ChatModel | CapabilityKind::StreamingChatModel
                        ) =>
                    {
                        Some(*kind)
                    }
                    _ => None,
                })
                .collect();
            return Err(ComposeError::IncompleteService { service, ambiguous });
        }

        tracing::info!(
            service,
            filled = ?capabilities.filled(),
            tools = capabilities.tools.len(),
            "service composed"
        );

        Ok(Composition {
            assistant: Assistant::new(descriptor, capabilities),
            warnings,
        })
    }

    /// Composes `S` from its own descriptor.
    ///
    /// # Errors
    ///
    /// See [`ComposeError`].
    pub fn compose_service<S: AiService>(
        &self,
    ) -> Result<(S, Vec<CompositionWarning>), ComposeError> {
        let Composition {
            assistant,
            warnings,
        } = self.compose(&S::descriptor())?;
        Ok((S::assemble(assistant), warnings))
    }

    fn slot<T: Capability + ?Sized>(
        &self,
        descriptor: &ServiceDescriptor,
        warnings: &mut Vec<CompositionWarning>,
    ) -> Result<Option<Arc<T>>, ComposeError> {
        match descriptor.slot(T::KIND) {
            SlotSpec::Named(name) => self
                .registry
                .lookup::<T>(Some(name))
                .map(Some)
                .map_err(|_| ComposeError::MissingNamedProvider {
                    service: descriptor.service(),
                    kind: T::KIND,
                    name: name.clone(),
                }),
            SlotSpec::Disabled => Ok(None),
            SlotSpec::Auto if !descriptor.is_auto_discovery() => Ok(None),
            SlotSpec::Auto => match self.registry.lookup::<T>(None) {
                Ok(provider) => Ok(Some(provider)),
                Err(LookupError::Ambiguous { kind, count }) => {
                    tracing::warn!(
                        service = descriptor.service(),
                        kind = %kind,
                        count,
                        "several providers match; name one explicitly"
                    );
                    warnings.push(CompositionWarning::Ambiguous { kind, count });
                    Ok(None)
                }
                Err(_) => Ok(None),
            },
        }
    }
}
