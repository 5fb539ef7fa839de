//! Components: the injectable building blocks of an application.
//!
//! A component is any `Send + Sync + 'static` type implementing
//! [`Component`]. It is registered with the [`Container`] through a
//! [`ComponentDef`], which carries its factory, an optional name, and the
//! interface types it exposes. Components may additionally declare
//! [tools](Component::tools) and
//! [guarded producers](Component::guarded_producers).
//!
//! # Example
//!
//! ```
//! use conflux_compose::component::{Component, ComponentDef};
//! use conflux_compose::container::Container;
//!
//! trait Greeting: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeting for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! impl Component for English {}
//!
//! let mut container = Container::new();
//! container
//!     .register(
//!         ComponentDef::new(|_| Ok(English))
//!             .named("en")
//!             .exposes::<dyn Greeting>(|english| english),
//!     )
//!     .unwrap();
//!
//! let greeting = container.resolve_named::<dyn Greeting>("en").unwrap();
//! assert_eq!(greeting.greet(), "hello");
//! ```

use crate::container::Container;
use crate::error::BoxError;
use crate::producer::GuardedProducer;
use conflux_tools::{Tool, ToolError, ToolMethod};
use core::any::{Any, TypeId};
use downcast_rs::{DowncastSync, impl_downcast};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Component Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A type the [`Container`] can construct and hand out as a singleton.
pub trait Component: DowncastSync {
    /// Declares the tools every instance of this component binds.
    ///
    /// Collected once at registration, without constructing the component.
    /// Explicit and automatic tool aggregation both bind exactly what is
    /// declared here.
    fn tools(_tools: &mut ToolSet<Self>)
    where
        Self: Sized,
    {
    }

    /// Declares provider-producing operations gated on configuration.
    ///
    /// Collected once during discovery. The component is only constructed if
    /// at least one of its guards holds.
    fn guarded_producers() -> Vec<GuardedProducer>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

impl_downcast!(sync Component);

// ─────────────────────────────────────────────────────────────────────────────
// ComponentId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ComponentId {
    /// Creates the identifier of component type `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: core::any::type_name::<C>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl core::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ToolSet
// ─────────────────────────────────────────────────────────────────────────────

type ToolBinder<C> = Box<dyn Fn(Arc<C>) -> Arc<dyn Tool> + Send + Sync>;

/// The tools a component type binds, filled by [`Component::tools`].
///
/// ```
/// use conflux_compose::component::{Component, ToolSet};
/// use conflux_tools::{NoArgs, ToolError};
///
/// struct Clock;
///
/// impl Clock {
///     fn now(&self, _: NoArgs) -> Result<String, ToolError> {
///         Ok("12:00".into())
///     }
/// }
///
/// impl Component for Clock {
///     fn tools(tools: &mut ToolSet<Self>) {
///         tools.method("now", "Returns the current time.", Clock::now);
///     }
/// }
/// ```
pub struct ToolSet<C: Component> {
    binders: Vec<ToolBinder<C>>,
}

impl<C: Component> ToolSet<C> {
    pub(crate) fn new() -> Self {
        Self {
            binders: Vec::new(),
        }
    }

    /// Binds `method` as a tool whose arguments are deserialized into `P`.
    pub fn method<P, R>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        method: impl Fn(&C, P) -> Result<R, ToolError> + Send + Sync + 'static,
    ) -> &mut Self
    where
        P: JsonSchema + DeserializeOwned + 'static,
        R: Serialize + 'static,
    {
        let name = name.into();
        let description = description.into();
        let method = Arc::new(method);
        self.bind(move |owner: Arc<C>| {
            let method = Arc::clone(&method);
            ToolMethod::new(
                owner,
                name.clone(),
                description.clone(),
                move |this: &C, params: P| (*method)(this, params),
            )
            .into_shared()
        })
    }

    /// Binds a tool built from the instance by `bind`.
    pub fn bind(
        &mut self,
        bind: impl Fn(Arc<C>) -> Arc<dyn Tool> + Send + Sync + 'static,
    ) -> &mut Self {
        self.binders.push(Box::new(bind));
        self
    }

    /// Number of declared tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.binders.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    pub(crate) fn bind_all(&self, owner: &Arc<C>) -> Vec<Arc<dyn Tool>> {
        self.binders
            .iter()
            .map(|bind| bind(Arc::clone(owner)))
            .collect()
    }
}

impl<C: Component> core::fmt::Debug for ToolSet<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolSet")
            .field("component", &core::any::type_name::<C>())
            .field("tools", &self.binders.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentDef
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) type Factory<C> = Box<dyn Fn(&Container) -> Result<Arc<C>, BoxError> + Send + Sync>;

pub(crate) type Exposure<C> = Box<dyn Fn(Arc<C>) -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// How to build a component of type `C` and what it exposes.
///
/// The component is always resolvable as `C` itself. Each
/// [`exposes`](Self::exposes) call makes it resolvable as one more
/// interface type, typically a trait object.
pub struct ComponentDef<C: Component> {
    pub(crate) name: Option<String>,
    pub(crate) factory: Factory<C>,
    pub(crate) exposures: Vec<(TypeId, &'static str, Exposure<C>)>,
}

impl<C: Component> ComponentDef<C> {
    /// Defines a component built lazily by `factory`.
    ///
    /// The factory receives the container so it can resolve its own
    /// dependencies. It runs at most once.
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Container) -> Result<C, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            factory: Box::new(move |container: &Container| factory(container).map(Arc::new)),
            exposures: Vec::new(),
        }
    }

    /// Defines a component from an already built instance.
    #[must_use]
    pub fn instance(instance: C) -> Self {
        let shared = Arc::new(instance);
        Self {
            name: None,
            factory: Box::new(move |_: &Container| Ok(Arc::clone(&shared))),
            exposures: Vec::new(),
        }
    }

    /// Qualifies the component with a name. An empty name is ignored.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Makes the component resolvable as `I`.
    ///
    /// `expose` converts the shared instance, usually by unsizing it:
    /// `.exposes::<dyn EmbeddingModel>(|model| model)`.
    #[must_use]
    pub fn exposes<I>(mut self, expose: fn(Arc<C>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.exposures.push((
            TypeId::of::<I>(),
            core::any::type_name::<I>(),
            Box::new(move |instance: Arc<C>| -> Box<dyn Any + Send + Sync> {
                Box::new(expose(instance))
            }),
        ));
        self
    }

    /// Returns the component's identifier.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        ComponentId::of::<C>()
    }
}

impl<C: Component> core::fmt::Debug for ComponentDef<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let exposes: Vec<&str> = self.exposures.iter().map(|(_, name, _)| *name).collect();
        f.debug_struct("ComponentDef")
            .field("component", &core::any::type_name::<C>())
            .field("name", &self.name)
            .field("exposes", &exposes)
            .finish()
    }
}
