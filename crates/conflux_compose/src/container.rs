//! The component container.
//!
//! [`Container`] owns every registered component definition and resolves
//! "one instance of type `T`, optionally qualified by name" on demand.
//! Instances are singletons: each definition's factory runs at most once and
//! its result is shared by every later lookup.
//!
//! Lookups match on exposed type first, then on name. An unqualified lookup
//! considers every definition exposing the type, named or not, and fails
//! with [`ContainerError::Ambiguous`] when more than one matches.

use crate::component::{Component, ComponentDef, ComponentId, ToolSet};
use crate::error::ContainerError;
use crate::producer::GuardedProducer;
use conflux_tools::Tool;
use core::any::{Any, TypeId};
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;

type ErasedFactory =
    Box<dyn Fn(&Container) -> Result<Arc<dyn Component>, crate::error::BoxError> + Send + Sync>;

type ErasedTools = Box<dyn Fn(Arc<dyn Component>) -> Option<Vec<Arc<dyn Tool>>> + Send + Sync>;

type ErasedExposure =
    Box<dyn Fn(Arc<dyn Component>) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// A registered definition with its lazily built instance.
struct Entry {
    id: ComponentId,
    name: Option<String>,
    factory: ErasedFactory,
    exposures: HashMap<TypeId, ErasedExposure>,
    /// Binds the declared tools; absent when the type declares none.
    tools: Option<ErasedTools>,
    producers: fn() -> Vec<GuardedProducer>,
    instance: OnceLock<Arc<dyn Component>>,
}

/// Summary of a registered component, as returned by [`Container::components`].
#[derive(Debug, Clone, Copy)]
pub struct ComponentInfo<'a> {
    pub(crate) index: usize,
    /// The component type.
    pub id: ComponentId,
    /// The registration name, if any.
    pub name: Option<&'a str>,
    /// Whether the component type declares tools.
    pub has_tools: bool,
}

/// Registry of component definitions and their singleton instances.
#[derive(Default)]
pub struct Container {
    entries: Vec<Entry>,
    /// Definitions currently being constructed, per thread.
    building: Mutex<Vec<(ThreadId, usize)>>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a component definition.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Duplicate`] if the same component type is
    /// already registered under the same name.
    pub fn register<C: Component>(&mut self, def: ComponentDef<C>) -> Result<(), ContainerError> {
        let id = ComponentId::of::<C>();
        if self
            .entries
            .iter()
            .any(|entry| entry.id == id && entry.name == def.name)
        {
            return Err(ContainerError::Duplicate {
                type_name: id.type_name(),
                name: def.name,
            });
        }

        let ComponentDef {
            name,
            factory,
            exposures: typed_exposures,
        } = def;

        let mut exposures: HashMap<TypeId, ErasedExposure> = HashMap::new();
        exposures.insert(
            TypeId::of::<C>(),
            Box::new(|instance: Arc<dyn Component>| {
                let typed = instance.downcast_arc::<C>().ok()?;
                Some(Box::new(typed) as Box<dyn Any + Send + Sync>)
            }),
        );
        for (type_id, _, expose) in typed_exposures {
            exposures.insert(
                type_id,
                Box::new(move |instance: Arc<dyn Component>| {
                    instance.downcast_arc::<C>().ok().map(&expose)
                }),
            );
        }

        let mut declared = ToolSet::<C>::new();
        C::tools(&mut declared);
        let tools = (!declared.is_empty()).then(|| -> ErasedTools {
            Box::new(move |instance: Arc<dyn Component>| {
                let owner = instance.downcast_arc::<C>().ok()?;
                Some(declared.bind_all(&owner))
            })
        });

        tracing::trace!(component = id.type_name(), name = ?name, "component registered");

        self.entries.push(Entry {
            id,
            name,
            factory: Box::new(move |container: &Container| {
                factory(container).map(|instance| instance as Arc<dyn Component>)
            }),
            exposures,
            tools,
            producers: C::guarded_producers,
            instance: OnceLock::new(),
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves the single component exposing `T`.
    ///
    /// # Errors
    ///
    /// Fails if no component or more than one component exposes `T`, or if
    /// construction fails.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup::<T>(None)
    }

    /// Resolves the component exposing `T` registered under `name`.
    ///
    /// # Errors
    ///
    /// Fails if no such component exists or its construction fails.
    pub fn resolve_named<T>(&self, name: &str) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup::<T>(Some(name))
    }

    /// Resolves the single registration of component type `id`.
    ///
    /// # Errors
    ///
    /// Fails if the type is not registered, is registered more than once, or
    /// cannot be constructed.
    pub fn resolve_component(&self, id: ComponentId) -> Result<Arc<dyn Component>, ContainerError> {
        self.instantiate(self.unique_entry(id)?)
    }

    /// Resolves the single registration of `id` and binds its declared tools.
    ///
    /// # Errors
    ///
    /// Fails like [`resolve_component`](Self::resolve_component).
    pub fn component_tools(&self, id: ComponentId) -> Result<Vec<Arc<dyn Tool>>, ContainerError> {
        let index = self.unique_entry(id)?;
        self.instantiate(index)?;
        self.bind_tools(index)
    }

    /// Returns true if at least one component exposes `T`.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.entries
            .iter()
            .any(|entry| entry.exposures.contains_key(&type_id))
    }

    /// Enumerates registered components in registration order.
    pub fn components(&self) -> impl Iterator<Item = ComponentInfo<'_>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ComponentInfo {
                index,
                id: entry.id,
                name: entry.name.as_deref(),
                has_tools: entry.tools.is_some(),
            })
    }

    /// Binds the declared tools of the component behind a [`ComponentInfo`].
    ///
    /// Components declaring no tools are not constructed.
    ///
    /// # Errors
    ///
    /// Fails if construction fails.
    pub fn tools_of(&self, info: &ComponentInfo<'_>) -> Result<Vec<Arc<dyn Tool>>, ContainerError> {
        self.bind_tools(info.index)
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects the guarded producers declared by every registered component
    /// type. Types registered under several names contribute once.
    pub(crate) fn discover_producers(&self) -> Vec<GuardedProducer> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.id))
            .flat_map(|entry| (entry.producers)())
            .collect()
    }

    fn unique_entry(&self, id: ComponentId) -> Result<usize, ContainerError> {
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.id == id)
            .map(|(index, _)| index)
            .collect();
        match candidates.as_slice() {
            [] => Err(ContainerError::NotRegistered {
                type_name: id.type_name(),
                name: None,
            }),
            [index] => Ok(*index),
            _ => Err(ContainerError::Ambiguous {
                type_name: id.type_name(),
                count: candidates.len(),
            }),
        }
    }

    fn bind_tools(&self, index: usize) -> Result<Vec<Arc<dyn Tool>>, ContainerError> {
        let entry = &self.entries[index];
        let Some(bind) = &entry.tools else {
            return Ok(Vec::new());
        };
        let instance = self.instantiate(index)?;
        bind(instance).ok_or(ContainerError::TypeMismatch {
            type_name: entry.id.type_name(),
        })
    }

    fn lookup<T>(&self, name: Option<&str>) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let type_name = core::any::type_name::<T>();
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry.exposures.contains_key(&type_id)
                    && name.is_none_or(|name| entry.name.as_deref() == Some(name))
            })
            .map(|(index, _)| index)
            .collect();

        let index = match candidates.as_slice() {
            [] => {
                return Err(ContainerError::NotRegistered {
                    type_name,
                    name: name.map(str::to_string),
                });
            }
            [index] => *index,
            _ => {
                return Err(ContainerError::Ambiguous {
                    type_name,
                    count: candidates.len(),
                });
            }
        };

        let instance = self.instantiate(index)?;
        self.entries[index]
            .exposures
            .get(&type_id)
            .and_then(|expose| expose(instance))
            .and_then(|boxed| boxed.downcast::<Arc<T>>().ok())
            .map(|typed| *typed)
            .ok_or(ContainerError::TypeMismatch { type_name })
    }

    fn instantiate(&self, index: usize) -> Result<Arc<dyn Component>, ContainerError> {
        let entry = &self.entries[index];
        if let Some(instance) = entry.instance.get() {
            return Ok(Arc::clone(instance));
        }

        let thread = std::thread::current().id();
        {
            let mut building = self.building.lock();
            if building.contains(&(thread, index)) {
                let mut path: Vec<&'static str> = building
                    .iter()
                    .filter(|(owner, _)| *owner == thread)
                    .map(|(_, building)| self.entries[*building].id.type_name())
                    .collect();
                path.push(entry.id.type_name());
                return Err(ContainerError::Cycle { path });
            }
            building.push((thread, index));
        }

        let built = (entry.factory)(self);
        self.building
            .lock()
            .retain(|pending| *pending != (thread, index));

        let instance = built.map_err(|source| match source.downcast::<ContainerError>() {
            Ok(inner) if matches!(*inner, ContainerError::Cycle { .. }) => *inner,
            Ok(inner) => ContainerError::Construction {
                component: entry.id.type_name(),
                source: inner,
            },
            Err(source) => ContainerError::Construction {
                component: entry.id.type_name(),
                source,
            },
        })?;

        tracing::debug!(component = entry.id.type_name(), name = ?entry.name, "component constructed");
        Ok(Arc::clone(entry.instance.get_or_init(|| instance)))
    }
}

impl core::fmt::Debug for Container {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let components: Vec<String> = self
            .entries
            .iter()
            .map(|entry| match &entry.name {
                Some(name) => format!("{} ({name})", entry.id.type_name()),
                None => entry.id.type_name().to_string(),
            })
            .collect();
        f.debug_struct("Container")
            .field("components", &components)
            .finish()
    }
}
