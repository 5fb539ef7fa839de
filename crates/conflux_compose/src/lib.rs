//! Conditional provider registration and declarative service composition.
//!
//! This crate turns a set of declarations into running AI services:
//!
//! - [`component`] / [`container`]: injectable components, resolved as
//!   lazily built singletons by type and optional name.
//! - [`producer`]: provider-producing operations gated on configuration,
//!   evaluated once at startup.
//! - [`registry`]: the active providers per [`CapabilityKind`].
//! - [`descriptor`] / [`resolver`]: how each service's capability slots are
//!   filled, by name or by auto-discovery.
//! - [`tools`]: collecting bound tools from components.
//! - [`assistant`]: the composed implementation that runs conversations.
//! - [`app`]: the [`Conflux`] builder and the frozen [`Runtime`].
//!
//! # Example
//!
//! ```
//! use conflux_compose::prelude::*;
//! use conflux_config::MapConfig;
//! use conflux_models::memory::{ChatMemory, MessageWindowChatMemory};
//! use std::sync::Arc;
//!
//! struct Memories;
//!
//! impl Memories {
//!     fn window(&self) -> Result<Arc<dyn ChatMemory>, BoxError> {
//!         Ok(Arc::new(MessageWindowChatMemory::new("default", 20)))
//!     }
//! }
//!
//! impl Component for Memories {
//!     fn guarded_producers() -> Vec<GuardedProducer> {
//!         vec![GuardedProducer::new::<Self, dyn ChatMemory>(
//!             "window",
//!             "memory.enabled",
//!             "true",
//!             Self::window,
//!         )]
//!     }
//! }
//!
//! let mut app = Conflux::new(MapConfig::new().with("memory.enabled", "true"));
//! app.add_component(ComponentDef::new(|_| Ok(Memories)));
//!
//! let runtime = app.finish().unwrap();
//! assert!(runtime.registry().lookup::<dyn ChatMemory>(None).is_ok());
//! ```

pub mod app;
pub mod assistant;
pub mod capability;
pub mod component;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod plugin;
pub mod producer;
pub mod rag;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod tools;

pub use app::{Conflux, Runtime};
pub use capability::{Capability, CapabilityKind, Provider, ProviderHandle};

/// Commonly used items.
pub mod prelude {
    pub use crate::app::{Conflux, Runtime};
    pub use crate::assistant::{Assistant, Capabilities};
    pub use crate::capability::{Capability, CapabilityKind, Provider, ProviderHandle};
    pub use crate::component::{Component, ComponentDef, ComponentId, ToolSet};
    pub use crate::container::Container;
    pub use crate::descriptor::{ServiceDescriptor, SlotSpec, ToolsSpec};
    pub use crate::error::{
        BoxError, ComposeError, ContainerError, ServiceError, StartupError, StartupFailure,
    };
    pub use crate::plugin::Plugin;
    pub use crate::producer::{Guard, GuardedProducer, RegistrationReport};
    pub use crate::registry::CapabilityRegistry;
    pub use crate::resolver::{CompositionWarning, ServiceComposer};
    pub use crate::service::AiService;
    pub use crate::tools::BoundTool;
}
