//! Moderation model contract.

use crate::error::GenerationError;
use crate::message::Message;
use async_trait::async_trait;

/// Outcome of a moderation check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Moderation {
    flagged_text: Option<String>,
}

impl Moderation {
    /// A verdict that lets the conversation through.
    #[must_use]
    pub fn not_flagged() -> Self {
        Self { flagged_text: None }
    }

    /// A verdict blocking the conversation because of `text`.
    #[must_use]
    pub fn flagged(text: impl Into<String>) -> Self {
        Self {
            flagged_text: Some(text.into()),
        }
    }

    /// Returns true if the content violated the policy.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flagged_text.is_some()
    }

    /// The offending text, if flagged.
    #[must_use]
    pub fn flagged_text(&self) -> Option<&str> {
        self.flagged_text.as_deref()
    }
}

/// A model that checks conversation content against a usage policy.
#[async_trait]
pub trait ModerationModel: Send + Sync + 'static {
    /// Checks the given messages.
    async fn moderate(&self, messages: &[Message]) -> Result<Moderation, GenerationError>;
}
