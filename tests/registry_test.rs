mod common;

use common::{new_calls, RecorderNode};
use pretty_assertions::assert_eq;
use rule_chain::components::PassThroughNode;
use rule_chain::engine::{NodeHandler, NodeRegistry};
use rule_chain::NodeCategory;

#[tokio::test]
async fn builtin_components_are_registered() {
    let registry = NodeRegistry::with_builtins().await;

    assert_eq!(
        registry.get_registered_types().await,
        vec![
            "copy_keys",
            "delay",
            "log",
            "msg_type_filter",
            "msg_type_switch",
            "passthrough",
            "threshold_filter",
            "transform",
        ]
    );

    let filter = registry.get_descriptor("threshold_filter").await.unwrap();
    assert_eq!(filter.category, NodeCategory::Filter);
    let enrich = registry.get_descriptor("copy_keys").await.unwrap();
    assert_eq!(enrich.category, NodeCategory::Enrichment);
}

#[tokio::test]
async fn last_registration_wins() {
    let registry = NodeRegistry::new();
    registry
        .register_fn("sink", || Box::new(PassThroughNode) as Box<dyn NodeHandler>)
        .await;
    let calls = new_calls();
    let recorder_calls = calls.clone();
    registry
        .register_fn("sink", move || {
            Box::new(RecorderNode::new(recorder_calls.clone())) as Box<dyn NodeHandler>
        })
        .await;

    assert!(registry.is_registered("sink").await);
    assert_eq!(registry.get_registered_types().await, vec!["sink"]);

    let node = registry.get("sink").await.unwrap()();
    assert_eq!(node.get_descriptor().type_name, "recorder");

    let descriptors = registry.get_descriptors().await;
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].type_name, "sink");
    assert_eq!(descriptors[0].description, "records invocations");
}

#[tokio::test]
async fn lookups_for_unknown_types_return_none() {
    let registry = NodeRegistry::new();
    assert!(!registry.is_registered("org.example.DoesNotExist").await);
    assert!(registry.get("org.example.DoesNotExist").await.is_none());
    assert!(registry.get_descriptor("org.example.DoesNotExist").await.is_none());
}

#[test]
fn registry_can_be_built_outside_a_runtime() {
    let registry = tokio_test::block_on(NodeRegistry::with_builtins());
    assert!(tokio_test::block_on(registry.is_registered("passthrough")));
}
