//! Error type shared by every capability contract.

/// Errors returned by model, memory and retrieval providers.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Error returned by the provider.
    #[error("provider error: {message}")]
    Provider {
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GenerationError {
    /// Creates a [`Provider`](Self::Provider) error without a source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`Provider`](Self::Provider) error caused by `source`.
    pub fn provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
