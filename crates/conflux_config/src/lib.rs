//! Configuration sources for Conflux.
//!
//! The composition engine treats configuration as an opaque key → typed value
//! lookup. Everything it needs is expressed through the [`ConfigSource`] trait:
//! implementors provide [`get_string`](ConfigSource::get_string) and inherit
//! typed accessors, comma-separated lists and `k=v` maps.
//!
//! Two sources ship with the crate:
//!
//! - [`MapConfig`] - an in-memory map, usually built from a literal list of pairs
//! - [`EnvConfig`] - process environment variables layered over another source
//!
//! # Example
//!
//! ```
//! use conflux_config::{ConfigSource, MapConfig};
//!
//! let config = MapConfig::from_iter([
//!     ("conflux.rag.max-results", "5"),
//!     ("conflux.rag.weights", "title=3, body=1"),
//! ]);
//!
//! assert_eq!(config.get_i32("conflux.rag.max-results").unwrap(), Some(5));
//! assert_eq!(config.get_map_integer("conflux.rag.weights").unwrap()["title"], 3);
//! ```

mod env;
mod error;
mod map;
mod source;

pub use env::EnvConfig;
pub use error::ConfigError;
pub use map::MapConfig;
pub use source::ConfigSource;
