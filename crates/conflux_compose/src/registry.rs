//! The capability registry.

use crate::capability::{Capability, CapabilityKind, Provider, ProviderHandle};
use crate::error::{LookupError, RegistryError};
use std::collections::HashMap;
use std::sync::Arc;

/// Active providers, grouped by capability kind.
///
/// The registry is filled by value while the application starts (direct
/// registrations first, then the guarded producers whose guards hold). It is
/// then moved behind an [`Arc`] and only read, so lookups never lock.
///
/// ```
/// # use conflux_compose::capability::{Provider, ProviderHandle};
/// # use conflux_compose::registry::CapabilityRegistry;
/// # use conflux_models::memory::{ChatMemory, MessageWindowChatMemory};
/// # use std::sync::Arc;
/// let memory: Arc<dyn ChatMemory> = Arc::new(MessageWindowChatMemory::new("default", 10));
///
/// let mut registry = CapabilityRegistry::new();
/// registry
///     .register(ProviderHandle::named("window", Provider::new(memory)))
///     .unwrap();
///
/// assert!(registry.lookup::<dyn ChatMemory>(Some("window")).is_ok());
/// assert!(registry.lookup::<dyn ChatMemory>(None).is_ok());
/// ```
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    // Registration order is preserved within a kind.
    providers: HashMap<CapabilityKind, Vec<ProviderHandle>>,
}

impl core::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for kind in CapabilityKind::ALL {
            if let Some(handles) = self.providers.get(&kind) {
                let names: Vec<_> = handles.iter().map(ProviderHandle::name).collect();
                map.entry(&kind, &names);
            }
        }
        map.finish()
    }
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if a provider of the same kind is
    /// already registered under the same non-empty name. Unnamed providers
    /// never conflict.
    pub fn register(&mut self, handle: ProviderHandle) -> Result<(), RegistryError> {
        let kind = handle.kind();
        let handles = self.providers.entry(kind).or_default();

        if let Some(name) = handle.name()
            && handles.iter().any(|existing| existing.name() == Some(name))
        {
            return Err(RegistryError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }

        tracing::debug!(kind = %kind, name = ?handle.name(), "provider registered");
        handles.push(handle);
        Ok(())
    }

    /// Returns the provider of `kind` registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if there is none.
    pub fn lookup_by_name(&self, kind: CapabilityKind, name: &str) -> Result<&Provider, LookupError> {
        self.handles(kind)
            .iter()
            .find(|handle| handle.name() == Some(name))
            .map(ProviderHandle::provider)
            .ok_or_else(|| LookupError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Returns the only provider of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Unsatisfied`] if none is registered and
    /// [`LookupError::Ambiguous`] if several are.
    pub fn lookup_unique(&self, kind: CapabilityKind) -> Result<&Provider, LookupError> {
        match self.handles(kind) {
            [] => Err(LookupError::Unsatisfied { kind }),
            [handle] => Ok(handle.provider()),
            handles => Err(LookupError::Ambiguous {
                kind,
                count: handles.len(),
            }),
        }
    }

    /// Returns every provider of `kind`, in registration order.
    #[must_use]
    pub fn lookup_all(&self, kind: CapabilityKind) -> Vec<&Provider> {
        self.handles(kind)
            .iter()
            .map(ProviderHandle::provider)
            .collect()
    }

    /// Typed lookup: by name when `name` is given, otherwise the unique
    /// provider of `T`'s kind.
    ///
    /// # Errors
    ///
    /// See [`lookup_by_name`](Self::lookup_by_name) and
    /// [`lookup_unique`](Self::lookup_unique).
    pub fn lookup<T: Capability + ?Sized>(&self, name: Option<&str>) -> Result<Arc<T>, LookupError> {
        let provider = match name {
            Some(name) => self.lookup_by_name(T::KIND, name)?,
            None => self.lookup_unique(T::KIND)?,
        };
        // The registry groups providers by their own kind, so the variant matches.
        T::unwrap(provider).ok_or(LookupError::Unsatisfied { kind: T::KIND })
    }

    /// Returns the names registered for `kind`, with `None` for unnamed providers.
    #[must_use]
    pub fn names(&self, kind: CapabilityKind) -> Vec<Option<&str>> {
        self.handles(kind).iter().map(ProviderHandle::name).collect()
    }

    /// Returns the total number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    /// Returns true if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handles(&self, kind: CapabilityKind) -> &[ProviderHandle] {
        self.providers.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conflux_models::moderation::{Moderation, ModerationModel};
    use conflux_models::{GenerationError, Message};

    struct Allow;

    #[async_trait]
    impl ModerationModel for Allow {
        async fn moderate(&self, _messages: &[Message]) -> Result<Moderation, GenerationError> {
            Ok(Moderation::not_flagged())
        }
    }

    fn moderation(name: Option<&str>) -> ProviderHandle {
        let model: Arc<dyn ModerationModel> = Arc::new(Allow);
        ProviderHandle::new(name.map(str::to_string), Provider::new(model))
    }

    #[test]
    fn unique_lookup_reports_absence_and_ambiguity() {
        let mut registry = CapabilityRegistry::new();
        assert_eq!(
            registry.lookup_unique(CapabilityKind::ModerationModel).err(),
            Some(LookupError::Unsatisfied {
                kind: CapabilityKind::ModerationModel
            })
        );

        registry.register(moderation(None)).unwrap();
        assert!(registry.lookup_unique(CapabilityKind::ModerationModel).is_ok());

        registry.register(moderation(Some("strict"))).unwrap();
        assert_eq!(
            registry.lookup_unique(CapabilityKind::ModerationModel).err(),
            Some(LookupError::Ambiguous {
                kind: CapabilityKind::ModerationModel,
                count: 2
            })
        );
    }

    #[test]
    fn named_lookup_ignores_other_kinds() {
        let mut registry = CapabilityRegistry::new();
        registry.register(moderation(Some("strict"))).unwrap();

        assert!(registry
            .lookup_by_name(CapabilityKind::ModerationModel, "strict")
            .is_ok());
        assert_eq!(
            registry.lookup_by_name(CapabilityKind::ChatModel, "strict").err(),
            Some(LookupError::NotFound {
                kind: CapabilityKind::ChatModel,
                name: "strict".into()
            })
        );
    }

    #[test]
    fn duplicate_names_are_rejected_but_unnamed_never_conflict() {
        let mut registry = CapabilityRegistry::new();
        registry.register(moderation(Some("strict"))).unwrap();
        registry.register(moderation(None)).unwrap();
        registry.register(moderation(None)).unwrap();

        assert_eq!(
            registry.register(moderation(Some("strict"))),
            Err(RegistryError::Duplicate {
                kind: CapabilityKind::ModerationModel,
                name: "strict".into()
            })
        );
        assert_eq!(registry.lookup_all(CapabilityKind::ModerationModel).len(), 3);
        assert_eq!(
            registry.names(CapabilityKind::ModerationModel),
            vec![Some("strict"), None, None]
        );
    }
}
