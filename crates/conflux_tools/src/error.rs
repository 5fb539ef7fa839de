//! Error types for tool execution.

use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Error during parameter deserialization or parsing.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Error during tool function execution.
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ToolError {
    /// Creates a [`ParameterError`](Self::ParameterError).
    pub fn parameter_error(msg: impl Into<String>) -> Self {
        Self::ParameterError(msg.into())
    }

    /// Creates an [`ExecutionError`](Self::ExecutionError).
    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }
}
