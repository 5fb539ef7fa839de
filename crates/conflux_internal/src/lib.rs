//! # Conflux Internal Library
//!
//! Re-exports the Conflux crates for convenience.

/// Configuration sources.
pub use conflux_config;

/// Capability contracts: chat, memory, moderation, retrieval.
pub use conflux_models;

/// Tool abstraction and dispatch.
pub use conflux_tools;

/// Components, conditional registration and service composition.
pub use conflux_compose;

/// Infrastructure plugins.
pub use conflux_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use conflux_compose::prelude::*;
    pub use conflux_config::{ConfigSource, EnvConfig, MapConfig};
    pub use conflux_core::{TracingFormat, TracingPlugin};
    pub use conflux_tools::{NoArgs, Tool, ToolError, ToolMethod};
}
