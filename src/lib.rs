//! Declarative composition of AI services from configuration-gated
//! capability providers.
//!

pub use conflux_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use conflux_internal::prelude::*;
}
