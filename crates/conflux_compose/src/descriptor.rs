//! Declarative service descriptions.

use crate::capability::CapabilityKind;
use crate::component::{Component, ComponentId};
use std::collections::HashMap;

/// Default limit on consecutive tool-calling rounds per service call.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// How a single capability slot is filled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotSpec {
    /// The unique registered provider, when auto-discovery is on.
    #[default]
    Auto,
    /// The provider registered under this name. Absence is fatal.
    Named(String),
    /// Never filled.
    Disabled,
}

/// Where a service's tools come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolsSpec {
    /// Every registered component that binds tools.
    #[default]
    Auto,
    /// Exactly these components, in order.
    Explicit(Vec<ComponentId>),
}

/// Describes how a service type is assembled from registered capabilities.
///
/// ```
/// use conflux_compose::capability::CapabilityKind;
/// use conflux_compose::descriptor::{ServiceDescriptor, SlotSpec};
///
/// struct SupportDesk;
///
/// let descriptor = ServiceDescriptor::new::<SupportDesk>()
///     .chat_model("fast")
///     .without(CapabilityKind::ModerationModel)
///     .system_message("You are a helpful support agent.");
///
/// assert_eq!(descriptor.slot(CapabilityKind::ChatModel), &SlotSpec::Named("fast".into()));
/// assert_eq!(descriptor.slot(CapabilityKind::Memory), &SlotSpec::Auto);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    service: &'static str,
    auto_discovery: bool,
    slots: HashMap<CapabilityKind, SlotSpec>,
    tools: ToolsSpec,
    system_message: Option<String>,
    max_tool_rounds: usize,
}

impl ServiceDescriptor {
    /// Starts a descriptor for service type `S` with auto-discovery on and
    /// every slot on [`SlotSpec::Auto`].
    #[must_use]
    pub fn new<S: 'static>() -> Self {
        Self {
            service: core::any::type_name::<S>(),
            auto_discovery: true,
            slots: HashMap::new(),
            tools: ToolsSpec::Auto,
            system_message: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Turns auto-discovery of unnamed slots on or off.
    #[must_use]
    pub fn auto_discovery(mut self, enabled: bool) -> Self {
        self.auto_discovery = enabled;
        self
    }

    /// Sets the slot of `kind`.
    #[must_use]
    pub fn slot_spec(mut self, kind: CapabilityKind, spec: SlotSpec) -> Self {
        self.slots.insert(kind, spec);
        self
    }

    /// Fills `kind` with the provider registered under `name`.
    ///
    /// An empty name leaves the slot on [`SlotSpec::Auto`].
    #[must_use]
    pub fn named(self, kind: CapabilityKind, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return self.slot_spec(kind, SlotSpec::Auto);
        }
        self.slot_spec(kind, SlotSpec::Named(name))
    }

    /// Leaves `kind` empty regardless of what is registered.
    #[must_use]
    pub fn without(self, kind: CapabilityKind) -> Self {
        self.slot_spec(kind, SlotSpec::Disabled)
    }

    /// Names the chat model.
    #[must_use]
    pub fn chat_model(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::ChatModel, name)
    }

    /// Names the streaming chat model.
    #[must_use]
    pub fn streaming_chat_model(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::StreamingChatModel, name)
    }

    /// Names the chat memory.
    #[must_use]
    pub fn memory(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::Memory, name)
    }

    /// Names the chat memory provider.
    #[must_use]
    pub fn memory_provider(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::MemoryProvider, name)
    }

    /// Names the moderation model.
    #[must_use]
    pub fn moderation_model(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::ModerationModel, name)
    }

    /// Names the content retriever.
    #[must_use]
    pub fn content_retriever(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::ContentRetriever, name)
    }

    /// Names the retrieval augmentor.
    #[must_use]
    pub fn retrieval_augmentor(self, name: impl Into<String>) -> Self {
        self.named(CapabilityKind::RetrievalAugmentor, name)
    }

    /// Adds component `C` to the explicit tool list.
    ///
    /// The first call switches the descriptor from [`ToolsSpec::Auto`] to
    /// [`ToolsSpec::Explicit`].
    #[must_use]
    pub fn tools<C: Component>(mut self) -> Self {
        let id = ComponentId::of::<C>();
        match &mut self.tools {
            ToolsSpec::Explicit(ids) => ids.push(id),
            ToolsSpec::Auto => self.tools = ToolsSpec::Explicit(vec![id]),
        }
        self
    }

    /// Gives the service no tools at all.
    #[must_use]
    pub fn no_tools(mut self) -> Self {
        self.tools = ToolsSpec::Explicit(Vec::new());
        self
    }

    /// Sets the system message sent at the start of every conversation.
    #[must_use]
    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Sets how many tool-calling rounds a single call may take.
    #[must_use]
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Returns the service type name.
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Returns whether unnamed slots are auto-discovered.
    #[must_use]
    pub fn is_auto_discovery(&self) -> bool {
        self.auto_discovery
    }

    /// Returns how `kind`'s slot is filled.
    #[must_use]
    pub fn slot(&self, kind: CapabilityKind) -> &SlotSpec {
        const AUTO: &SlotSpec = &SlotSpec::Auto;
        self.slots.get(&kind).unwrap_or(AUTO)
    }

    /// Returns the tool source.
    #[must_use]
    pub fn tool_spec(&self) -> &ToolsSpec {
        &self.tools
    }

    /// Returns the system message.
    #[must_use]
    pub fn system_message_text(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    /// Returns the tool round limit.
    #[must_use]
    pub fn tool_round_limit(&self) -> usize {
        self.max_tool_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Service;
    struct Calculator;
    struct Clock;
    impl Component for Calculator {}
    impl Component for Clock {}

    #[test]
    fn tools_accumulate_in_order() {
        let descriptor = ServiceDescriptor::new::<Service>()
            .tools::<Calculator>()
            .tools::<Clock>();

        assert_eq!(
            descriptor.tool_spec(),
            &ToolsSpec::Explicit(vec![ComponentId::of::<Calculator>(), ComponentId::of::<Clock>()])
        );
    }

    #[test]
    fn empty_name_stays_auto() {
        let descriptor = ServiceDescriptor::new::<Service>().memory("");
        assert_eq!(descriptor.slot(CapabilityKind::Memory), &SlotSpec::Auto);
    }

    #[test]
    fn later_settings_override_earlier_ones() {
        let descriptor = ServiceDescriptor::new::<Service>()
            .chat_model("a")
            .without(CapabilityKind::ChatModel);

        assert_eq!(descriptor.slot(CapabilityKind::ChatModel), &SlotSpec::Disabled);
        assert!(descriptor.is_auto_discovery());
        assert!(descriptor.service().ends_with("Service"));
    }
}
