//! Declared services.

use crate::assistant::Assistant;
use crate::descriptor::ServiceDescriptor;

/// A service interface whose implementation is composed at startup.
///
/// The descriptor says which capabilities fill the service. The composed
/// [`Assistant`] is handed to [`assemble`](Self::assemble), which wraps it in
/// the service's own type.
///
/// ```
/// use conflux_compose::assistant::Assistant;
/// use conflux_compose::descriptor::ServiceDescriptor;
/// use conflux_compose::error::ServiceError;
/// use conflux_compose::service::AiService;
///
/// struct SupportDesk(Assistant);
///
/// impl SupportDesk {
///     async fn ask(&self, customer: &str, question: &str) -> Result<String, ServiceError> {
///         self.0.chat(customer, question).await
///     }
/// }
///
/// impl AiService for SupportDesk {
///     fn descriptor() -> ServiceDescriptor {
///         ServiceDescriptor::new::<Self>().chat_model("support")
///     }
///
///     fn assemble(assistant: Assistant) -> Self {
///         SupportDesk(assistant)
///     }
/// }
/// ```
pub trait AiService: Send + Sync + Sized + 'static {
    /// Describes how the service is composed.
    fn descriptor() -> ServiceDescriptor;

    /// Wraps the composed implementation.
    fn assemble(assistant: Assistant) -> Self;
}
