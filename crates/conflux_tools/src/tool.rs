//! The core [`Tool`] trait for executable tools.

use crate::error::ToolError;
use conflux_models::ToolDefinition;
use std::future::Future;
use std::pin::Pin;

/// A tool that can be invoked by a model.
///
/// Tools expose a [`ToolDefinition`] (name, description, JSON schema) for the
/// model, and an async [`execute`](Tool::execute) method that runs against
/// the instance the tool is bound to.
pub trait Tool: Send + Sync + 'static {
    /// Returns the model-facing tool definition with JSON schema.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with JSON arguments.
    fn execute(
        &self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>;
}
