//! Infrastructure plugins for Conflux applications.
//!
//! - [`TracingPlugin`] installs a `tracing` subscriber, configured in code or
//!   from `conflux.tracing.*` keys.

mod tracing_plugin;

pub use tracing_plugin::{
    FILTER_KEY, FORMAT_KEY, LEVEL_KEY, SPAN_EVENTS_KEY, TracingConfig, TracingFormat,
    TracingPlugin, TracingSettingsError,
};
