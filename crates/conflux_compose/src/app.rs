//! Application lifecycle: from declarations to a frozen runtime.
//!
//! [`Conflux`] collects everything an application declares: components,
//! directly registered providers, services and plugins. [`Conflux::finish`]
//! then runs startup in a fixed order:
//!
//! 1. **Build** - every plugin's `build()` runs, in insertion order.
//! 2. **Direct registration** - providers added with
//!    [`add_provider`](Conflux::add_provider) enter the registry.
//! 3. **Discovery** - guarded producers are collected from every component.
//! 4. **Conditional registration** - guards are evaluated and passing
//!    producers register their providers.
//! 5. **Composition** - every declared service is composed against the now
//!    frozen registry.
//! 6. **Ready** - every plugin's `ready()` runs against the [`Runtime`].
//!
//! Composition failures are collected across all services; if any occurred,
//! `finish` returns them together and no runtime is produced.
//!
//! ```
//! use conflux_compose::app::Conflux;
//! use conflux_config::MapConfig;
//!
//! let runtime = Conflux::new(MapConfig::new()).finish().unwrap();
//! assert!(runtime.registry().is_empty());
//! ```

use crate::assistant::Assistant;
use crate::capability::ProviderHandle;
use crate::component::{Component, ComponentDef};
use crate::container::Container;
use crate::descriptor::ServiceDescriptor;
use crate::error::{StartupError, StartupFailure};
use crate::plugin::Plugin;
use crate::producer::{ConditionalRegistrar, RegistrationReport};
use crate::registry::CapabilityRegistry;
use crate::resolver::{Composition, CompositionWarning, ServiceComposer};
use crate::service::AiService;
use conflux_config::{ConfigSource, MapConfig};
use core::any::{Any, TypeId};
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

type BoxedService = Arc<dyn Any + Send + Sync>;

/// A declared service awaiting composition.
struct ServiceEntry {
    id: TypeId,
    descriptor: ServiceDescriptor,
    assemble: fn(Assistant) -> BoxedService,
}

fn assemble_erased<S: AiService>(assistant: Assistant) -> BoxedService {
    Arc::new(S::assemble(assistant))
}

/// Exposes the application configuration to component factories.
struct SharedConfig(Arc<dyn ConfigSource>);

impl Component for SharedConfig {}

// ─────────────────────────────────────────────────────────────────────────────
// Conflux
// ─────────────────────────────────────────────────────────────────────────────

/// Application builder.
///
/// The configuration source passed to [`new`](Self::new) is registered as a
/// component exposing `dyn ConfigSource`, so factories can resolve it.
pub struct Conflux {
    config: Arc<dyn ConfigSource>,
    container: Container,
    providers: Vec<ProviderHandle>,
    services: Vec<ServiceEntry>,
    pending_plugins: Vec<Box<dyn Plugin>>,
    plugin_ids: HashSet<TypeId>,
    failures: Vec<StartupFailure>,
}

impl Default for Conflux {
    fn default() -> Self {
        Self::new(MapConfig::new())
    }
}

impl Conflux {
    /// Creates an application reading configuration from `config`.
    #[must_use]
    pub fn new(config: impl ConfigSource) -> Self {
        let config: Arc<dyn ConfigSource> = Arc::new(config);
        let mut app = Self {
            config: Arc::clone(&config),
            container: Container::new(),
            providers: Vec::new(),
            services: Vec::new(),
            pending_plugins: Vec::new(),
            plugin_ids: HashSet::new(),
            failures: Vec::new(),
        };
        app.add_component(
            ComponentDef::instance(SharedConfig(config))
                .exposes::<dyn ConfigSource>(|shared| Arc::clone(&shared.0)),
        );
        app
    }

    /// Returns the configuration source.
    #[must_use]
    pub fn config(&self) -> &Arc<dyn ConfigSource> {
        &self.config
    }

    /// Returns the component container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Registers a component. A rejected registration is reported by
    /// [`finish`](Self::finish).
    pub fn add_component<C: Component>(&mut self, def: ComponentDef<C>) -> &mut Self {
        if let Err(err) = self.container.register(def) {
            tracing::error!(error = %err, "component registration rejected");
            self.failures.push(err.into());
        }
        self
    }

    /// Registers a provider directly, without a guard.
    ///
    /// Direct providers enter the registry before any guarded producer runs.
    /// A name clash among them is fatal.
    pub fn add_provider(&mut self, handle: ProviderHandle) -> &mut Self {
        self.providers.push(handle);
        self
    }

    /// Declares service `S`. Declaring the same type twice has no effect.
    pub fn add_service<S: AiService>(&mut self) -> &mut Self {
        let id = TypeId::of::<S>();
        if self.services.iter().any(|entry| entry.id == id) {
            tracing::debug!(service = core::any::type_name::<S>(), "service already declared");
            return self;
        }
        self.services.push(ServiceEntry {
            id,
            descriptor: S::descriptor(),
            assemble: assemble_erased::<S>,
        });
        self
    }

    /// Adds a plugin. Unique plugins added twice are ignored.
    pub fn add_plugins<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        if plugin.is_unique() && !self.plugin_ids.insert(TypeId::of::<P>()) {
            tracing::warn!(plugin = plugin.name(), "unique plugin added twice; ignoring");
            return self;
        }
        self.pending_plugins.push(Box::new(plugin));
        self
    }

    /// Runs startup and freezes the application.
    ///
    /// # Errors
    ///
    /// Returns every failure that prevents a consistent runtime: rejected
    /// component registrations, clashing direct providers, and services that
    /// could not be composed.
    pub fn finish(mut self) -> Result<Runtime, StartupError> {
        // Plugins may add further plugins while building.
        let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
        while !self.pending_plugins.is_empty() {
            for plugin in core::mem::take(&mut self.pending_plugins) {
                tracing::debug!(plugin = plugin.name(), "building plugin");
                plugin.build(&mut self);
                plugins.push(plugin);
            }
        }

        let Conflux {
            config,
            container,
            providers,
            services,
            mut failures,
            ..
        } = self;

        let mut registry = CapabilityRegistry::new();
        for handle in providers {
            if let Err(err) = registry.register(handle) {
                tracing::error!(error = %err, "direct provider rejected");
                failures.push(err.into());
            }
        }

        let worklist = container.discover_producers();
        tracing::debug!(producers = worklist.len(), "discovery complete");
        let registration =
            ConditionalRegistrar::new(config.as_ref(), &container).run(worklist, &mut registry);

        let registry = Arc::new(registry);
        let composer = ServiceComposer::new(&registry, &container);
        let mut composed = HashMap::new();
        let mut warnings = Vec::new();
        for entry in services {
            match composer.compose(&entry.descriptor) {
                Ok(Composition {
                    assistant,
                    warnings: found,
                }) => {
                    let service = entry.descriptor.service();
                    warnings.extend(found.into_iter().map(|warning| (service, warning)));
                    composed.insert(entry.id, (entry.assemble)(assistant));
                }
                Err(err) => {
                    tracing::error!(error = %err, "service composition failed");
                    failures.push(err.into());
                }
            }
        }

        if !failures.is_empty() {
            return Err(StartupError {
                failures,
                registration,
            });
        }

        let runtime = Runtime {
            config,
            container: Arc::new(container),
            registry,
            services: composed,
            registration: Arc::new(registration),
            warnings,
        };
        for plugin in &plugins {
            plugin.ready(&runtime);
        }
        tracing::info!(
            providers = runtime.registry.len(),
            services = runtime.services.len(),
            "conflux runtime ready"
        );
        Ok(runtime)
    }
}

impl core::fmt::Debug for Conflux {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let services: Vec<&str> = self
            .services
            .iter()
            .map(|entry| entry.descriptor.service())
            .collect();
        let plugins: Vec<&str> = self.pending_plugins.iter().map(|plugin| plugin.name()).collect();
        f.debug_struct("Conflux")
            .field("container", &self.container)
            .field("providers", &self.providers.len())
            .field("services", &services)
            .field("plugins", &plugins)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime
// ─────────────────────────────────────────────────────────────────────────────

/// The frozen application: registry, container and composed services.
///
/// Everything is shared read-only and can be cloned cheaply.
#[derive(Clone)]
pub struct Runtime {
    config: Arc<dyn ConfigSource>,
    container: Arc<Container>,
    registry: Arc<CapabilityRegistry>,
    services: HashMap<TypeId, BoxedService>,
    registration: Arc<RegistrationReport>,
    warnings: Vec<(&'static str, CompositionWarning)>,
}

impl Runtime {
    /// Returns the composed service `S`, if it was declared.
    #[must_use]
    pub fn service<S: AiService>(&self) -> Option<Arc<S>> {
        self.services
            .get(&TypeId::of::<S>())
            .cloned()
            .and_then(|service| service.downcast::<S>().ok())
    }

    /// Returns the capability registry.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Returns the component container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns the configuration source.
    #[must_use]
    pub fn config(&self) -> &dyn ConfigSource {
        self.config.as_ref()
    }

    /// Returns the outcome of the conditional registration pass.
    #[must_use]
    pub fn registration_report(&self) -> &RegistrationReport {
        &self.registration
    }

    /// Returns composition warnings, tagged with the service they concern.
    #[must_use]
    pub fn warnings(&self) -> &[(&'static str, CompositionWarning)] {
        &self.warnings
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("registry", &self.registry)
            .field("container", &self.container)
            .field("services", &self.services.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}
