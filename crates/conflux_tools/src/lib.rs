//! Tools for Conflux services.
//!
//! A tool is a callable the model may invoke during a conversation. Tools are
//! contributed by components: each tool is bound to the component instance
//! that owns it, so invoking the tool runs a method on that instance.
//!
//! # Architecture
//!
//! - [`Tool`] - trait for executable tools with a JSON schema
//! - [`ToolMethod`] - a tool backed by a method on a shared instance
//! - [`ToolBox`] - name-based dispatch over a set of tools
//! - [`ToolError`] - execution failures
//!
//! # Example
//!
//! ```
//! use conflux_tools::{NoArgs, Tool, ToolError, ToolMethod};
//! use std::sync::Arc;
//!
//! struct Menu { items: Vec<String> }
//!
//! impl Menu {
//!     fn list(&self, _: NoArgs) -> Result<Vec<String>, ToolError> {
//!         Ok(self.items.clone())
//!     }
//! }
//!
//! let menu = Arc::new(Menu { items: vec!["espresso".into()] });
//! let tool = ToolMethod::new(menu, "list_menu", "Lists the menu.", Menu::list);
//! assert_eq!(tool.definition().name, "list_menu");
//! ```

pub mod error;
pub mod method;
pub mod tool;
pub mod toolbox;

pub use error::ToolError;
pub use method::{NoArgs, ToolMethod};
pub use tool::Tool;
pub use toolbox::ToolBox;
