//! Tools backed by a method on a shared instance.

use crate::error::ToolError;
use crate::tool::Tool;
use conflux_models::ToolDefinition;
use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Parameters of a tool that takes no arguments.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize, JsonSchema)]
pub struct NoArgs {}

type Method<C, P, R> = Box<dyn Fn(&C, P) -> Result<R, ToolError> + Send + Sync>;

/// A [`Tool`] that calls a method on the instance it is bound to.
///
/// The argument schema is derived from `P` with `schemars`; arguments are
/// deserialized into `P` and the method's output is serialized back to JSON.
/// A `null` argument payload is treated as an empty object, so tools taking
/// [`NoArgs`] accept both.
pub struct ToolMethod<C: ?Sized, P, R> {
    owner: Arc<C>,
    name: String,
    description: String,
    method: Method<C, P, R>,
    _marker: PhantomData<fn(P) -> R>,
}

impl<C, P, R> ToolMethod<C, P, R>
where
    C: ?Sized + Send + Sync + 'static,
    P: JsonSchema + DeserializeOwned + 'static,
    R: Serialize + 'static,
{
    /// Binds `method` to `owner`.
    pub fn new(
        owner: Arc<C>,
        name: impl Into<String>,
        description: impl Into<String>,
        method: impl Fn(&C, P) -> Result<R, ToolError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            description: description.into(),
            method: Box::new(method),
            _marker: PhantomData,
        }
    }

    /// Boxes the tool behind an `Arc<dyn Tool>`.
    #[must_use]
    pub fn into_shared(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }

    /// Returns the instance the tool is bound to.
    #[must_use]
    pub fn owner(&self) -> &Arc<C> {
        &self.owner
    }

    fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args = if args.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            args
        };
        let params: P = serde_json::from_value(args)
            .map_err(|err| ToolError::parameter_error(format!("{}: {err}", self.name)))?;
        let output = (self.method)(&self.owner, params)?;
        Ok(serde_json::to_value(output)?)
    }
}

impl<C, P, R> Tool for ToolMethod<C, P, R>
where
    C: ?Sized + Send + Sync + 'static,
    P: JsonSchema + DeserializeOwned + 'static,
    R: Serialize + 'static,
{
    fn definition(&self) -> ToolDefinition {
        let mut parameters = schema_for!(P).to_value();
        if let Some(object) = parameters.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters,
        }
    }

    fn execute(
        &self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        let result = self.call(args);
        Box::pin(async move { result })
    }
}

impl<C: ?Sized, P, R> core::fmt::Debug for ToolMethod<C, P, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolMethod")
            .field("name", &self.name)
            .field("owner", &core::any::type_name::<C>())
            .finish_non_exhaustive()
    }
}
