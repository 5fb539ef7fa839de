//! Plugins bundle components, providers and services.
//!
//! A plugin is built once while [`Conflux::finish`] runs, before discovery,
//! and is told when the frozen [`Runtime`] is ready.

use crate::app::{Conflux, Runtime};

/// A unit of application setup.
///
/// # Example
///
/// ```
/// use conflux_compose::app::Conflux;
/// use conflux_compose::component::{Component, ComponentDef};
/// use conflux_compose::plugin::Plugin;
///
/// struct Audit;
/// impl Component for Audit {}
///
/// struct AuditPlugin;
///
/// impl Plugin for AuditPlugin {
///     fn build(&self, app: &mut Conflux) {
///         app.add_component(ComponentDef::new(|_| Ok(Audit)));
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Adds components, providers, services or further plugins.
    fn build(&self, app: &mut Conflux);

    /// Called once the runtime is frozen, in build order.
    fn ready(&self, _runtime: &Runtime) {}

    /// Returns the plugin's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Returns true if adding this plugin type a second time is ignored.
    fn is_unique(&self) -> bool {
        true
    }
}
