mod common;

use conflux_compose::prelude::*;
use conflux_compose::tools::ToolAggregator;
use conflux_tools::{NoArgs, Tool, ToolError, ToolMethod};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Deserialize, JsonSchema)]
struct AddArgs {
    a: i64,
    b: i64,
}

struct Calculator;

impl Calculator {
    fn add(&self, args: AddArgs) -> Result<i64, ToolError> {
        Ok(args.a + args.b)
    }

    fn pi(&self, _: NoArgs) -> Result<f64, ToolError> {
        Ok(core::f64::consts::PI)
    }
}

impl Component for Calculator {
    fn tools(tools: &mut ToolSet<Self>) {
        tools
            .method("add", "Adds two integers.", Calculator::add)
            .method("pi", "Returns pi.", Calculator::pi);
    }
}

struct Clock;

impl Clock {
    fn now(&self, _: NoArgs) -> Result<String, ToolError> {
        Ok("12:00".into())
    }
}

impl Component for Clock {
    fn tools(tools: &mut ToolSet<Self>) {
        tools.bind(|clock| ToolMethod::new(clock, "now", "Current time.", Clock::now).into_shared());
    }
}

fn container() -> Container {
    let mut container = Container::new();
    container.register(ComponentDef::new(|_| Ok(Calculator))).unwrap();
    container.register(ComponentDef::new(|_| Ok(Clock))).unwrap();
    container
}

fn names(tools: &[BoundTool]) -> BTreeSet<String> {
    tools.iter().map(BoundTool::name).collect()
}

#[test]
fn explicit_mode_returns_only_listed_components() {
    let container = container();
    let spec = ToolsSpec::Explicit(vec![ComponentId::of::<Clock>()]);

    let tools = ToolAggregator::new(&container).aggregate(&spec).unwrap();

    assert_eq!(names(&tools), BTreeSet::from(["now".to_string()]));
    assert!(tools.iter().all(|tool| tool.owner() == ComponentId::of::<Clock>()));
}

#[test]
fn auto_mode_is_the_union_and_stable() {
    let container = container();
    let aggregator = ToolAggregator::new(&container);

    let first = aggregator.aggregate(&ToolsSpec::Auto).unwrap();
    let second = aggregator.aggregate(&ToolsSpec::Auto).unwrap();

    assert_eq!(
        names(&first),
        BTreeSet::from(["add".to_string(), "pi".to_string(), "now".to_string()])
    );
    assert_eq!(names(&first), names(&second));
}

#[tokio::test]
async fn bound_tools_execute_on_their_instance() {
    let container = container();
    let spec = ToolsSpec::Explicit(vec![ComponentId::of::<Calculator>()]);

    let tools = ToolAggregator::new(&container).aggregate(&spec).unwrap();
    let add = tools.iter().find(|tool| tool.name() == "add").unwrap();

    let result = add
        .tool()
        .execute(serde_json::json!({"a": 2, "b": 40}))
        .await
        .unwrap();
    assert_eq!(result, serde_json::json!(42));
}

#[test]
fn descriptor_tool_list_flows_into_the_service() {
    struct Helper(Assistant);

    impl AiService for Helper {
        fn descriptor() -> ServiceDescriptor {
            ServiceDescriptor::new::<Self>().tools::<Calculator>()
        }

        fn assemble(assistant: Assistant) -> Self {
            Helper(assistant)
        }
    }

    let mut app = Conflux::default();
    app.add_component(ComponentDef::new(|_| Ok(Calculator)))
        .add_component(ComponentDef::new(|_| Ok(Clock)))
        .add_provider(common::chat_handle(None, common::echo("m")))
        .add_service::<Helper>();

    let runtime = app.finish().unwrap();
    let helper = runtime.service::<Helper>().unwrap();

    assert_eq!(
        names(helper.0.tools()),
        BTreeSet::from(["add".to_string(), "pi".to_string()])
    );
    assert!(runtime.warnings().is_empty());
}

#[test]
fn unregistered_explicit_tool_component_fails_composition() {
    struct Lonely(Assistant);

    impl AiService for Lonely {
        fn descriptor() -> ServiceDescriptor {
            ServiceDescriptor::new::<Self>().tools::<Clock>()
        }

        fn assemble(assistant: Assistant) -> Self {
            Lonely(assistant)
        }
    }

    let mut app = Conflux::default();
    app.add_provider(common::chat_handle(None, common::echo("m")))
        .add_service::<Lonely>();

    let err = app.finish().unwrap_err();
    assert!(matches!(
        err.failures[..],
        [StartupFailure::Service(ComposeError::ToolComponent { .. })]
    ));
}
