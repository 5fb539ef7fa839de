mod common;

use common::{FeatureModels, WordFilter, echo};
use conflux_compose::error::{ProducerFailure, RegistrationError};
use conflux_compose::prelude::*;
use conflux_compose::producer::ConditionalRegistrar;
use conflux_config::MapConfig;
use conflux_models::chat::ChatModel;
use conflux_models::moderation::ModerationModel;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Declares nothing itself; tests build producers on it directly.
struct Pool;

impl Component for Pool {}

fn pool() -> Container {
    let mut container = Container::new();
    container.register(ComponentDef::new(|_| Ok(Pool))).unwrap();
    container
}

fn chat_producer(operation: &str, key: &str, expected: &str, name: &str) -> GuardedProducer {
    GuardedProducer::new::<Pool, dyn ChatModel>(operation, key, expected, |_| Ok(echo("p")))
        .named(name)
}

fn moderation_producer(operation: &str, key: &str, name: &str) -> GuardedProducer {
    GuardedProducer::new::<Pool, dyn ModerationModel>(operation, key, "true", |_| {
        Ok(Arc::new(WordFilter { word: "x" }) as Arc<dyn ModerationModel>)
    })
    .named(name)
}

fn registered(report: &RegistrationReport) -> BTreeSet<(CapabilityKind, Option<String>)> {
    report
        .registered
        .iter()
        .map(|(_, kind, name)| (*kind, name.clone()))
        .collect()
}

#[test]
fn matching_guard_registers_and_mismatching_guard_skips() {
    let config = MapConfig::new().with("feature.x.enabled", "true");
    let mut app = Conflux::new(config);
    app.add_component(ComponentDef::new(|_| Ok(FeatureModels)));

    let runtime = app.finish().unwrap();
    let registry = runtime.registry();

    assert!(registry.lookup_by_name(CapabilityKind::ChatModel, "m1").is_ok());
    assert!(registry.lookup_unique(CapabilityKind::ChatModel).is_ok());
    assert!(registry.lookup_by_name(CapabilityKind::ChatModel, "m2").is_err());

    let report = runtime.registration_report();
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with("FeatureModels::disabled"));
}

#[test]
fn absent_or_different_values_register_nothing_on_every_run() {
    for config in [
        MapConfig::new(),
        MapConfig::new().with("feature.x.enabled", "yes"),
        MapConfig::new().with("feature.x.enabled", "True"),
    ] {
        let container = pool();
        for _ in 0..2 {
            let mut registry = CapabilityRegistry::new();
            let report = ConditionalRegistrar::new(&config, &container).run(
                vec![chat_producer("a", "feature.x.enabled", "true", "a")],
                &mut registry,
            );

            assert!(registry.is_empty());
            assert_eq!(report.skipped.len(), 1);
        }
    }
}

#[test]
fn failures_are_isolated_to_their_producer() {
    struct Broken;
    impl Component for Broken {}

    let mut container = pool();
    container
        .register(ComponentDef::<Broken>::new(|_| Err("no credentials".into())))
        .unwrap();
    let config = MapConfig::new().with("on", "true");

    let worklist = vec![
        GuardedProducer::new::<Broken, dyn ChatModel>("build", "on", "true", |_| Ok(echo("b"))),
        GuardedProducer::new::<Pool, dyn ChatModel>("explode", "on", "true", |_| {
            Err("quota exceeded".into())
        }),
        chat_producer("healthy", "on", "true", "healthy"),
    ];

    let mut registry = CapabilityRegistry::new();
    let report = ConditionalRegistrar::new(&config, &container).run(worklist, &mut registry);

    assert_eq!(report.failed.len(), 2);
    assert!(matches!(
        &report.failed[0],
        RegistrationError::ProducerInvocation { cause: ProducerFailure::Construction(_), .. }
    ));
    assert!(matches!(
        &report.failed[1],
        RegistrationError::ProducerInvocation { cause: ProducerFailure::Invocation(_), .. }
    ));
    assert!(report.failed[1].producer_id().ends_with("Pool::explode"));
    assert!(registry.lookup_by_name(CapabilityKind::ChatModel, "healthy").is_ok());
}

#[test]
fn second_producer_with_a_taken_name_is_rejected() {
    let container = pool();
    let config = MapConfig::new().with("on", "true");

    let mut registry = CapabilityRegistry::new();
    let report = ConditionalRegistrar::new(&config, &container).run(
        vec![
            chat_producer("first", "on", "true", "shared"),
            chat_producer("second", "on", "true", "shared"),
            moderation_producer("moderation", "on", "shared"),
        ],
        &mut registry,
    );

    assert_eq!(report.registered.len(), 2);
    assert!(matches!(
        &report.failed[..],
        [RegistrationError::Duplicate { producer_id, .. }] if producer_id.ends_with("Pool::second")
    ));
}

#[test]
fn failed_producer_explains_missing_named_provider() {
    struct Needy(Assistant);

    impl AiService for Needy {
        fn descriptor() -> ServiceDescriptor {
            ServiceDescriptor::new::<Self>().chat_model("m1")
        }

        fn assemble(assistant: Assistant) -> Self {
            Needy(assistant)
        }
    }

    struct Flaky;

    impl Flaky {
        fn model(&self) -> Result<Arc<dyn ChatModel>, BoxError> {
            Err("endpoint unreachable".into())
        }
    }

    impl Component for Flaky {
        fn guarded_producers() -> Vec<GuardedProducer> {
            vec![
                GuardedProducer::new::<Self, dyn ChatModel>("model", "on", "true", Self::model)
                    .named("m1"),
            ]
        }
    }

    let mut app = Conflux::new(MapConfig::new().with("on", "true"));
    app.add_component(ComponentDef::new(|_| Ok(Flaky)))
        .add_service::<Needy>();

    let err = app.finish().unwrap_err();

    assert!(matches!(
        err.failures[..],
        [StartupFailure::Service(ComposeError::MissingNamedProvider { .. })]
    ));
    assert_eq!(err.registration.failed.len(), 1);
}

fn flags_and_order() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
    proptest::collection::vec(any::<bool>(), 1..8).prop_flat_map(|flags| {
        let order: Vec<usize> = (0..flags.len()).collect();
        (Just(flags), Just(order).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn registration_outcome_ignores_processing_order((flags, order) in flags_and_order()) {
        let container = pool();
        let mut config = MapConfig::new();
        for (index, enabled) in flags.iter().enumerate() {
            config.insert(format!("p{index}.enabled"), enabled.to_string());
        }

        let producer = |index: usize| {
            let key = format!("p{index}.enabled");
            let name = format!("p{index}");
            if index % 2 == 0 {
                chat_producer(&name, &key, "true", &name)
            } else {
                moderation_producer(&name, &key, &name)
            }
        };

        let mut in_order = CapabilityRegistry::new();
        let baseline = ConditionalRegistrar::new(&config, &container)
            .run((0..flags.len()).map(producer).collect(), &mut in_order);

        let mut shuffled = CapabilityRegistry::new();
        let permuted = ConditionalRegistrar::new(&config, &container)
            .run(order.iter().copied().map(producer).collect(), &mut shuffled);

        prop_assert_eq!(registered(&baseline), registered(&permuted));
        prop_assert_eq!(in_order.len(), flags.iter().filter(|enabled| **enabled).count());
        prop_assert_eq!(in_order.len(), shuffled.len());
        prop_assert!(permuted.is_clean());
    }
}
