//! Guarded producers and the conditional registration pass.
//!
//! A [`GuardedProducer`] is a provider-producing operation declared by a
//! component and gated on one configuration entry. During startup every
//! declared producer is collected (discovery), then
//! [`ConditionalRegistrar::run`] evaluates each guard exactly once. Producers
//! whose guard holds get their declaring component resolved from the
//! container, are invoked, and have their result registered.
//!
//! Failures stay isolated to the producer that caused them and are reported
//! in the returned [`RegistrationReport`].

use crate::capability::{Capability, CapabilityKind, Provider, ProviderHandle};
use crate::component::{Component, ComponentId};
use crate::container::Container;
use crate::error::{BoxError, ProducerFailure, RegistrationError};
use crate::registry::CapabilityRegistry;
use conflux_config::ConfigSource;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Guard
// ─────────────────────────────────────────────────────────────────────────────

/// A configuration predicate: `key` is present and equals `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    key: String,
    expected: String,
}

impl Guard {
    /// Creates a guard on `key == expected`.
    #[must_use]
    pub fn new(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Returns the configuration key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value the key must have.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Returns true if `config` holds exactly the expected value.
    ///
    /// The comparison is exact: no trimming, no case folding.
    #[must_use]
    pub fn holds(&self, config: &dyn ConfigSource) -> bool {
        config
            .get_string(&self.key)
            .is_some_and(|value| value == self.expected)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GuardedProducer
// ─────────────────────────────────────────────────────────────────────────────

type Operation = Box<dyn Fn(&Container) -> Result<Provider, ProducerFailure> + Send + Sync>;

/// A provider-producing operation gated on configuration.
///
/// # Example
///
/// ```
/// use conflux_compose::component::Component;
/// use conflux_compose::producer::GuardedProducer;
/// use conflux_models::memory::{ChatMemory, MessageWindowChatMemory};
/// use std::sync::Arc;
///
/// struct MemoryFactory;
///
/// impl MemoryFactory {
///     fn window(&self) -> Result<Arc<dyn ChatMemory>, conflux_compose::error::BoxError> {
///         Ok(Arc::new(MessageWindowChatMemory::new("default", 20)))
///     }
/// }
///
/// impl Component for MemoryFactory {
///     fn guarded_producers() -> Vec<GuardedProducer> {
///         vec![
///             GuardedProducer::new::<Self, dyn ChatMemory>(
///                 "window",
///                 "memory.window.enabled",
///                 "true",
///                 Self::window,
///             )
///             .named("window"),
///         ]
///     }
/// }
/// ```
pub struct GuardedProducer {
    id: String,
    declaring: ComponentId,
    guard: Guard,
    kind: CapabilityKind,
    name: Option<String>,
    operation: Operation,
}

impl GuardedProducer {
    /// Declares `operation` on component `C`, producing a `T` when
    /// `key == expected`.
    ///
    /// `operation_name` identifies the producer in logs and reports as
    /// `{component}::{operation_name}`.
    #[must_use]
    pub fn new<C, T>(
        operation_name: &str,
        key: impl Into<String>,
        expected: impl Into<String>,
        operation: impl Fn(&C) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    ) -> Self
    where
        C: Component,
        T: Capability + ?Sized,
    {
        let declaring = ComponentId::of::<C>();
        Self {
            id: format!("{}::{operation_name}", declaring.type_name()),
            declaring,
            guard: Guard::new(key, expected),
            kind: T::KIND,
            name: None,
            operation: Box::new(move |container: &Container| {
                let owner = container
                    .resolve::<C>()
                    .map_err(ProducerFailure::Construction)?;
                operation(&*owner)
                    .map(T::wrap)
                    .map_err(ProducerFailure::Invocation)
            }),
        }
    }

    /// Registers the produced provider under `name`. An empty name is ignored.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Returns the producer's identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the declaring component.
    #[must_use]
    pub fn declaring(&self) -> ComponentId {
        self.declaring
    }

    /// Returns the configuration guard.
    #[must_use]
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Returns the kind of provider produced.
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Returns the name the provider will be registered under.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl core::fmt::Debug for GuardedProducer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GuardedProducer")
            .field("id", &self.id)
            .field("guard", &self.guard)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration pass
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one registration pass.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Producers whose provider was registered, with kind and name.
    pub registered: Vec<(String, CapabilityKind, Option<String>)>,
    /// Producers whose guard did not hold.
    pub skipped: Vec<String>,
    /// Producers that failed.
    pub failed: Vec<RegistrationError>,
}

impl RegistrationReport {
    /// Returns true if no producer failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs guarded producers against a configuration and fills a registry.
pub struct ConditionalRegistrar<'a> {
    config: &'a dyn ConfigSource,
    container: &'a Container,
}

impl<'a> ConditionalRegistrar<'a> {
    /// Creates a registrar reading guards from `config` and resolving
    /// declaring components from `container`.
    #[must_use]
    pub fn new(config: &'a dyn ConfigSource, container: &'a Container) -> Self {
        Self { config, container }
    }

    /// Consumes the worklist, registering each producer whose guard holds.
    ///
    /// Every entry is processed even if earlier ones fail.
    pub fn run(
        &self,
        worklist: Vec<GuardedProducer>,
        registry: &mut CapabilityRegistry,
    ) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for producer in worklist {
            if !producer.guard.holds(self.config) {
                tracing::debug!(
                    producer = %producer.id,
                    key = %producer.guard.key,
                    expected = %producer.guard.expected,
                    "guard not satisfied, skipping producer"
                );
                report.skipped.push(producer.id);
                continue;
            }

            let GuardedProducer {
                id,
                kind,
                name,
                operation,
                ..
            } = producer;

            let provider = match operation(self.container) {
                Ok(provider) => provider,
                Err(cause) => {
                    tracing::error!(producer = %id, error = %cause, "producer failed");
                    report.failed.push(RegistrationError::ProducerInvocation {
                        producer_id: id,
                        cause,
                    });
                    continue;
                }
            };

            match registry.register(ProviderHandle::new(name.clone(), provider)) {
                Ok(()) => report.registered.push((id, kind, name)),
                Err(source) => {
                    tracing::error!(producer = %id, error = %source, "producer result rejected");
                    report.failed.push(RegistrationError::Duplicate {
                        producer_id: id,
                        source,
                    });
                }
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "conditional registration complete"
        );
        report
    }
}
