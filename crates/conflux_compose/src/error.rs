//! Error types for container resolution, registration and composition.

use crate::capability::CapabilityKind;
use crate::producer::RegistrationReport;
use conflux_models::GenerationError;
use thiserror::Error;

/// Boxed error returned by component factories and producer operations.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// Container
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while registering or resolving components.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No component exposes the requested type (under the requested name).
    #[error("no component provides `{type_name}`{}", describe_name(.name.as_deref()))]
    NotRegistered {
        /// The requested type.
        type_name: &'static str,
        /// The requested name, if the lookup was qualified.
        name: Option<String>,
    },
    /// More than one component matches an unqualified lookup.
    #[error("{count} components provide `{type_name}`; qualify the lookup with a name")]
    Ambiguous {
        /// The requested type.
        type_name: &'static str,
        /// Number of matching components.
        count: usize,
    },
    /// The same component type was registered twice under the same name.
    #[error("component `{type_name}`{} is already registered", describe_name(.name.as_deref()))]
    Duplicate {
        /// The component type.
        type_name: &'static str,
        /// The registration name, if any.
        name: Option<String>,
    },
    /// A component factory failed.
    #[error("failed to construct component `{component}`: {source}")]
    Construction {
        /// The component type.
        component: &'static str,
        /// The factory's error.
        #[source]
        source: BoxError,
    },
    /// A factory (transitively) requested the component it is building.
    #[error("construction cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Component types from the outermost construction to the repeated one.
        path: Vec<&'static str>,
    },
    /// An exposure produced a value of an unexpected type.
    #[error("component exposure for `{type_name}` produced a different type")]
    TypeMismatch {
        /// The requested type.
        type_name: &'static str,
    },
}

fn describe_name(name: Option<&str>) -> String {
    name.map(|name| format!(" named `{name}`")).unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised when inserting a provider into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A provider of this kind is already registered under this name.
    #[error("a {kind} named `{name}` is already registered")]
    Duplicate {
        /// The provider's kind.
        kind: CapabilityKind,
        /// The conflicting name.
        name: String,
    },
}

/// Outcomes of a registry lookup that found no single provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No provider of the kind carries the requested name.
    #[error("no {kind} named `{name}` is registered")]
    NotFound {
        /// The requested kind.
        kind: CapabilityKind,
        /// The requested name.
        name: String,
    },
    /// No provider of the kind is registered at all.
    #[error("no {kind} is registered")]
    Unsatisfied {
        /// The requested kind.
        kind: CapabilityKind,
    },
    /// Several providers of the kind are registered.
    #[error("{count} providers of kind {kind} are registered")]
    Ambiguous {
        /// The requested kind.
        kind: CapabilityKind,
        /// Number of registered providers.
        count: usize,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Why a guarded producer could not yield a provider.
#[derive(Debug, Error)]
pub enum ProducerFailure {
    /// The declaring component could not be resolved.
    #[error("declaring component could not be constructed: {0}")]
    Construction(#[source] ContainerError),
    /// The producing operation itself failed.
    #[error("producer operation failed: {0}")]
    Invocation(#[source] BoxError),
}

/// A failure isolated to one guarded producer during the registration pass.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The producer's component or operation failed.
    #[error("producer `{producer_id}` failed: {cause}")]
    ProducerInvocation {
        /// The producer that failed.
        producer_id: String,
        /// What went wrong.
        #[source]
        cause: ProducerFailure,
    },
    /// The produced provider's name was already taken.
    #[error("producer `{producer_id}` could not register: {source}")]
    Duplicate {
        /// The producer whose result was rejected.
        producer_id: String,
        /// The registry's rejection.
        #[source]
        source: RegistryError,
    },
}

impl RegistrationError {
    /// Returns the identifier of the producer that failed.
    #[must_use]
    pub fn producer_id(&self) -> &str {
        match self {
            RegistrationError::ProducerInvocation { producer_id, .. }
            | RegistrationError::Duplicate { producer_id, .. } => producer_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Composition
// ─────────────────────────────────────────────────────────────────────────────

/// A tool-bearing component could not be resolved.
#[derive(Debug, Error)]
#[error("tool component `{component}` could not be resolved: {source}")]
pub struct ToolAggregationError {
    /// The component type.
    pub component: &'static str,
    /// The container's error.
    #[source]
    pub source: ContainerError,
}

/// A service could not be composed. Fatal for that service only.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A slot named a provider that is not registered.
    #[error("service `{service}` requires a {kind} named `{name}`, but none is registered")]
    MissingNamedProvider {
        /// The service being composed.
        service: &'static str,
        /// The slot's kind.
        kind: CapabilityKind,
        /// The missing name.
        name: String,
    },
    /// A tool component could not be resolved.
    #[error("service `{service}`: {source}")]
    ToolComponent {
        /// The service being composed.
        service: &'static str,
        /// The aggregation failure.
        #[source]
        source: ToolAggregationError,
    },
    /// Neither a chat model nor a streaming chat model was resolved.
    #[error(
        "service `{service}` has no chat model or streaming chat model{}",
        describe_ambiguous(.ambiguous)
    )]
    IncompleteService {
        /// The service being composed.
        service: &'static str,
        /// Model kinds that were left empty because of ambiguity.
        ambiguous: Vec<CapabilityKind>,
    },
}

fn describe_ambiguous(kinds: &[CapabilityKind]) -> String {
    if kinds.is_empty() {
        return String::new();
    }
    let kinds: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
    format!(" (ambiguous: {}; name one explicitly)", kinds.join(", "))
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

/// A single reason startup was aborted.
#[derive(Debug, Error)]
pub enum StartupFailure {
    /// A component registration was rejected.
    #[error(transparent)]
    Component(#[from] ContainerError),
    /// A directly registered provider clashed with another.
    #[error(transparent)]
    Provider(#[from] RegistryError),
    /// A declared service could not be composed.
    #[error(transparent)]
    Service(#[from] ComposeError),
}

/// Every failure that prevented [`Conflux::finish`](crate::app::Conflux::finish)
/// from producing a runtime.
#[derive(Debug, Error)]
#[error("startup failed with {} error(s): {}", .failures.len(), join_failures(.failures))]
pub struct StartupError {
    /// The collected failures, in the order they were found.
    pub failures: Vec<StartupFailure>,
    /// The conditional registration outcome, which often explains a
    /// missing named provider.
    pub registration: RegistrationReport,
}

fn join_failures(failures: &[StartupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Service calls
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by calls on an assembled service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A model, retriever or augmentor failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The moderation model flagged the input.
    #[error("message was flagged by moderation: {text}")]
    Moderated {
        /// The flagged text.
        text: String,
    },
    /// Streaming was requested but no streaming chat model is composed.
    #[error("service `{service}` has no streaming chat model")]
    NoStreamingModel {
        /// The service that was called.
        service: &'static str,
    },
    /// The model kept requesting tools past the configured limit.
    #[error("model requested tools for more than {limit} rounds")]
    TooManyToolRounds {
        /// The configured limit.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_service_names_ambiguous_kinds() {
        let err = ComposeError::IncompleteService {
            service: "Support",
            ambiguous: vec![CapabilityKind::ChatModel],
        };
        assert_eq!(
            err.to_string(),
            "service `Support` has no chat model or streaming chat model \
             (ambiguous: ChatModel; name one explicitly)"
        );
    }

    #[test]
    fn startup_error_lists_every_failure() {
        let err = StartupError {
            failures: vec![
                RegistryError::Duplicate {
                    kind: CapabilityKind::ChatModel,
                    name: "m".into(),
                }
                .into(),
                ContainerError::Cycle {
                    path: vec!["A", "B", "A"],
                }
                .into(),
            ],
            registration: RegistrationReport::default(),
        };
        let text = err.to_string();
        assert!(text.starts_with("startup failed with 2 error(s)"));
        assert!(text.contains("a ChatModel named `m` is already registered"));
        assert!(text.contains("construction cycle: A -> B -> A"));
    }
}
