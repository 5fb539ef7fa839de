//! Name-based dispatch over a set of tools.

use crate::error::ToolError;
use crate::tool::Tool;
use conflux_models::ToolDefinition;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The tools available to one composed service.
///
/// Unlike a registry, a tool box keeps tools sharing a name: two components
/// may both expose a `lookup` tool. Every definition is offered to the model
/// and a call by name runs the first tool registered under that name.
#[derive(Default, Clone)]
pub struct ToolBox {
    tools: Vec<Arc<dyn Tool>>,
}

impl core::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolBox {
    /// Creates an empty tool box.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Adds a tool.
    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Executes a tool by name with JSON arguments.
    pub fn execute<'a>(
        &'a self,
        name: &'a str,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + 'a>> {
        let tool = self.get(name);
        Box::pin(async move {
            let tool =
                tool.ok_or_else(|| ToolError::execution_error(format!("Unknown tool: {name}")))?;
            tool.execute(args).await
        })
    }

    /// Returns tool definitions for all tools, in insertion order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Returns the first tool registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.definition().name == name)
            .map(AsRef::as_ref)
    }

    /// Returns the names of all tools, duplicates included.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.definition().name).collect()
    }

    /// Returns the names that more than one tool shares.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<String> {
        let names = self.names();
        let mut duplicates: Vec<String> = names
            .iter()
            .filter(|name| names.iter().filter(|other| other == name).count() > 1)
            .cloned()
            .collect();
        duplicates.sort();
        duplicates.dedup();
        duplicates
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if there are no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolBox {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        Self {
            tools: iter.into_iter().collect(),
        }
    }
}
