//! Collecting bound tools from components.

use crate::component::ComponentId;
use crate::container::Container;
use crate::descriptor::ToolsSpec;
use crate::error::ToolAggregationError;
use conflux_tools::{Tool, ToolBox};
use std::sync::Arc;

/// A tool together with the component instance it is bound to.
#[derive(Clone)]
pub struct BoundTool {
    owner: ComponentId,
    tool: Arc<dyn Tool>,
}

impl BoundTool {
    /// Pairs a tool with its owning component.
    #[must_use]
    pub fn new(owner: ComponentId, tool: Arc<dyn Tool>) -> Self {
        Self { owner, tool }
    }

    /// Returns the owning component.
    #[must_use]
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Returns the tool.
    #[must_use]
    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    /// Returns the tool's advertised name.
    #[must_use]
    pub fn name(&self) -> String {
        self.tool.definition().name
    }
}

impl core::fmt::Debug for BoundTool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundTool")
            .field("owner", &self.owner.type_name())
            .field("name", &self.name())
            .finish()
    }
}

/// Gathers the tools a service may call.
#[derive(Debug, Clone, Copy)]
pub struct ToolAggregator<'a> {
    container: &'a Container,
}

impl<'a> ToolAggregator<'a> {
    /// Creates an aggregator resolving components from `container`.
    #[must_use]
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Collects tools according to `spec`.
    ///
    /// Explicit mode resolves each listed component. Auto mode walks every
    /// registered component, in registration order, and constructs those that
    /// declare tools. Both bind the tools declared by
    /// [`Component::tools`](crate::component::Component::tools), so a
    /// component contributes the same tools either way. Tools from different
    /// instances are all kept, even when names collide.
    ///
    /// # Errors
    ///
    /// Returns [`ToolAggregationError`] if a component cannot be resolved.
    pub fn aggregate(&self, spec: &ToolsSpec) -> Result<Vec<BoundTool>, ToolAggregationError> {
        let mut tools = Vec::new();
        match spec {
            ToolsSpec::Explicit(ids) => {
                for id in ids {
                    let bound = self.container.component_tools(*id).map_err(|source| {
                        ToolAggregationError {
                            component: id.type_name(),
                            source,
                        }
                    })?;
                    tools.extend(bound.into_iter().map(|tool| BoundTool::new(*id, tool)));
                }
            }
            ToolsSpec::Auto => {
                for info in self.container.components().filter(|info| info.has_tools) {
                    let bound =
                        self.container
                            .tools_of(&info)
                            .map_err(|source| ToolAggregationError {
                                component: info.id.type_name(),
                                source,
                            })?;
                    tools.extend(bound.into_iter().map(|tool| BoundTool::new(info.id, tool)));
                }
            }
        }
        Ok(tools)
    }
}

/// Builds the dispatch table for a set of bound tools.
#[must_use]
pub fn toolbox(tools: &[BoundTool]) -> ToolBox {
    tools.iter().map(|bound| Arc::clone(&bound.tool)).collect()
}
