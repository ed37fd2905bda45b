mod common;

use async_trait::async_trait;
use common::{
    chain, count_calls, new_calls, node, telemetry, test_registry, BrokenInitNode, Lifecycle,
};
use pretty_assertions::assert_eq;
use rule_chain::aop::{InterceptorManager, NodeInterceptor};
use rule_chain::config::DEFAULT_MAX_NODE_EXECUTIONS;
use rule_chain::engine::{ExecutorStatus, NodeHandler, NodeOutput};
use rule_chain::types::relation::{FAILURE, FALSE, SUCCESS, TRUE};
use rule_chain::{Connection, Msg, NodeContext, RuleChainExecutor, RuleError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn ready(executor: RuleChainExecutor) -> Arc<RuleChainExecutor> {
    executor.init().await.unwrap();
    Arc::new(executor)
}

#[test_log::test(tokio::test)]
async fn temperature_threshold_routes_true_and_false() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node(
                "threshold_filter",
                "TempFilter",
                json!({ "key": "temperature", "threshold": 20 }),
            ),
            node("recorder", "LogHigh", json!({})),
            node("recorder", "LogLow", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(1, 2, TRUE),
            Connection::new(1, 3, FALSE),
        ],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();
    assert_eq!(count_calls(&calls, "LogHigh"), 1);
    assert_eq!(count_calls(&calls, "LogLow"), 0);

    executor
        .process_message(telemetry(json!({ "temperature": 10 })))
        .await
        .unwrap();
    assert_eq!(count_calls(&calls, "LogHigh"), 1);
    assert_eq!(count_calls(&calls, "LogLow"), 1);
}

#[tokio::test]
async fn messages_are_stamped_with_chain_and_node() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("recorder", "Sink", json!({})),
        ],
        vec![Connection::new(0, 1, SUCCESS)],
    );
    let chain_id = metadata.rule_chain_id;
    let sink_id = metadata.nodes[1].id;
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let msg = telemetry(json!({ "temperature": 25 }));
    executor.process_message(msg.clone()).await.unwrap();

    let recorded = calls.lock().unwrap();
    let (_, seen) = &recorded[0];
    assert_eq!(seen.id, msg.id);
    assert_eq!(seen.rule_chain_id, Some(chain_id));
    assert_eq!(seen.rule_node_id, Some(sink_id));
}

#[test_log::test(tokio::test)]
async fn unknown_node_type_passes_messages_through() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("org.example.DoesNotExist", "Mystery", json!({ "any": "thing" })),
            node("recorder", "After", json!({})),
        ],
        vec![Connection::new(0, 1, SUCCESS)],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let msg = telemetry(json!({ "temperature": 25 }));
    executor.process_message(msg.clone()).await.unwrap();

    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1.data, msg.data);
}

#[tokio::test]
async fn fan_out_completes_every_branch_before_returning() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("delay", "Slow", json!({ "delay_ms": 60 })),
            node("recorder", "AfterDelay", json!({})),
            node("recorder", "Fast", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(0, 3, SUCCESS),
            Connection::new(1, 2, SUCCESS),
        ],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let started = Instant::now();
    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(count_calls(&calls, "AfterDelay"), 1);
    assert_eq!(count_calls(&calls, "Fast"), 1);
}

#[tokio::test]
async fn parallel_edges_with_the_same_label_each_get_a_copy() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("recorder", "A", json!({})),
            node("recorder", "B", json!({})),
            node("recorder", "C", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(0, 2, SUCCESS),
            Connection::new(0, 3, FAILURE),
        ],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let msg = telemetry(json!({ "temperature": 25 }));
    executor.process_message(msg.clone()).await.unwrap();

    assert_eq!(count_calls(&calls, "A"), 1);
    assert_eq!(count_calls(&calls, "B"), 1);
    assert_eq!(count_calls(&calls, "C"), 0);
    let recorded = calls.lock().unwrap();
    assert!(recorded.iter().all(|(_, seen)| seen.data == msg.data));
}

#[test_log::test(tokio::test)]
async fn node_error_follows_failure_edge_with_original_message() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("failing", "Broken", json!({})),
            node("recorder", "ErrorHandler", json!({})),
            node("recorder", "Unreached", json!({})),
        ],
        vec![
            Connection::new(0, 1, FAILURE),
            Connection::new(0, 2, SUCCESS),
        ],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let msg = telemetry(json!({ "temperature": 25 }));
    executor.process_message(msg.clone()).await.unwrap();

    assert_eq!(count_calls(&calls, "Unreached"), 0);
    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "ErrorHandler");
    assert_eq!(recorded[0].1.id, msg.id);
    assert_eq!(recorded[0].1.data, msg.data);
}

#[test_log::test(tokio::test)]
async fn node_error_without_failure_edge_drops_the_branch() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("failing", "Broken", json!({})),
            node("recorder", "Unreached", json!({})),
            node("recorder", "Sibling", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(0, 3, SUCCESS),
            Connection::new(1, 2, SUCCESS),
        ],
    );
    let metrics = rule_chain::metrics::EngineMetrics::new().unwrap();
    let executor = ready(
        RuleChainExecutor::new(metadata, registry).with_metrics(metrics.clone()),
    )
    .await;

    let result = executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await;

    assert!(result.is_ok());
    assert_eq!(count_calls(&calls, "Unreached"), 0);
    assert_eq!(count_calls(&calls, "Sibling"), 1);

    #[cfg(feature = "metrics")]
    {
        use rule_chain::metrics::DropReason;
        let chain_id = executor.chain_id();
        assert_eq!(metrics.messages_total(chain_id), 1);
        assert_eq!(metrics.node_failures_total(chain_id), 1);
        assert_eq!(metrics.dropped_total(chain_id, DropReason::NoFailureRoute), 1);
    }
}

#[tokio::test]
async fn filter_failure_output_is_routed_like_any_label() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node(
                "threshold_filter",
                "TempFilter",
                json!({ "key": "temperature", "threshold": 20 }),
            ),
            node("recorder", "Invalid", json!({})),
        ],
        vec![Connection::new(0, 1, FAILURE)],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    executor
        .process_message(telemetry(json!({ "humidity": 40 })))
        .await
        .unwrap();
    assert_eq!(count_calls(&calls, "Invalid"), 1);
}

#[tokio::test]
async fn init_failure_is_fatal_and_destroys_earlier_nodes() {
    let calls = new_calls();
    let lifecycle = Lifecycle::default();
    let registry = test_registry(&calls, &lifecycle).await;
    let broken_destroyed = Arc::new(AtomicUsize::new(0));
    let counter = broken_destroyed.clone();
    registry
        .register_fn("broken", move || {
            Box::new(BrokenInitNode {
                destroyed: counter.clone(),
            }) as Box<dyn NodeHandler>
        })
        .await;

    let metadata = chain(
        vec![
            node("tracked", "First", json!({})),
            node("broken", "Second", json!({})),
            node("tracked", "Third", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(1, 2, SUCCESS),
        ],
    );
    let executor = RuleChainExecutor::new(metadata, registry);

    let result = executor.init().await;
    match result {
        Err(RuleError::NodeInit { node, .. }) => assert!(node.contains("Second")),
        other => panic!("expected NodeInit error, got {:?}", other),
    }
    assert_eq!(lifecycle.inits.load(Ordering::SeqCst), 1);
    assert_eq!(lifecycle.destroys.load(Ordering::SeqCst), 1);
    assert_eq!(broken_destroyed.load(Ordering::SeqCst), 1);

    let result = executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await;
    assert!(matches!(result, Err(RuleError::ExecutorUnavailable(_))));
}

#[tokio::test]
async fn init_rejects_invalid_configuration() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![node("threshold_filter", "NoKey", json!({ "threshold": "high" }))],
        vec![],
    );
    let executor = RuleChainExecutor::new(metadata, registry);
    assert!(matches!(
        executor.init().await,
        Err(RuleError::NodeInit { .. })
    ));
    assert_eq!(executor.status().await, ExecutorStatus::Uninitialized);
}

#[tokio::test]
async fn init_runs_only_once() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(vec![node("passthrough", "Input", json!({}))], vec![]);
    let executor = RuleChainExecutor::new(metadata, registry);

    executor.init().await.unwrap();
    assert!(executor.init().await.is_err());
    assert_eq!(executor.status().await, ExecutorStatus::Initialized);
}

#[tokio::test]
async fn chain_without_first_node_ignores_messages() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let mut metadata = chain(vec![node("recorder", "Never", json!({}))], vec![]);
    metadata.first_node_index = None;
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stale_connection_index_drops_only_that_branch() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("recorder", "Valid", json!({})),
        ],
        vec![
            Connection::new(0, 7, SUCCESS),
            Connection::new(0, 1, SUCCESS),
        ],
    );
    let metrics = rule_chain::metrics::EngineMetrics::new().unwrap();
    let executor = ready(
        RuleChainExecutor::new(metadata, registry).with_metrics(metrics.clone()),
    )
    .await;

    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();
    assert_eq!(count_calls(&calls, "Valid"), 1);

    #[cfg(feature = "metrics")]
    assert_eq!(
        metrics.dropped_total(
            executor.chain_id(),
            rule_chain::metrics::DropReason::UnknownNode
        ),
        1
    );
}

#[test_log::test(tokio::test)]
async fn self_loop_stops_at_execution_limit() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![node("recorder", "Loop", json!({}))],
        vec![Connection::new(0, 0, SUCCESS)],
    );
    let metrics = rule_chain::metrics::EngineMetrics::new().unwrap();
    let executor = ready(
        RuleChainExecutor::new(metadata, registry)
            .with_max_node_executions(10)
            .with_metrics(metrics.clone()),
    )
    .await;

    let result = executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await;

    assert!(result.is_ok());
    assert_eq!(count_calls(&calls, "Loop"), 10);

    #[cfg(feature = "metrics")]
    assert_eq!(
        metrics.dropped_total(
            executor.chain_id(),
            rule_chain::metrics::DropReason::ExecutionLimit
        ),
        1
    );
}

#[tokio::test]
async fn branching_cycle_shares_one_budget_per_message() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("recorder", "Spin", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(1, 0, SUCCESS),
            Connection::new(1, 1, SUCCESS),
        ],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();
    let first = calls.lock().unwrap().len();
    assert!(first > 0);
    assert!(first < DEFAULT_MAX_NODE_EXECUTIONS);

    // 每条消息有独立的计数
    executor
        .process_message(telemetry(json!({ "temperature": 26 })))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), first * 2);
}

#[tokio::test]
async fn node_timeout_is_routed_as_failure() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("delay", "Stuck", json!({ "delay_ms": 5_000 })),
            node("recorder", "TimedOut", json!({})),
            node("recorder", "Completed", json!({})),
        ],
        vec![
            Connection::new(0, 1, FAILURE),
            Connection::new(0, 2, SUCCESS),
        ],
    );
    let executor = ready(
        RuleChainExecutor::new(metadata, registry)
            .with_node_timeout(Some(Duration::from_millis(20))),
    )
    .await;

    let started = Instant::now();
    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(count_calls(&calls, "TimedOut"), 1);
    assert_eq!(count_calls(&calls, "Completed"), 0);
}

#[tokio::test]
async fn destroyed_executor_rejects_messages() {
    let calls = new_calls();
    let lifecycle = Lifecycle::default();
    let registry = test_registry(&calls, &lifecycle).await;
    let metadata = chain(
        vec![
            node("tracked", "One", json!({})),
            node("tracked", "Two", json!({})),
        ],
        vec![Connection::new(0, 1, SUCCESS)],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    executor.destroy().await;
    executor.destroy().await;

    assert_eq!(lifecycle.destroys.load(Ordering::SeqCst), 2);
    assert_eq!(executor.status().await, ExecutorStatus::Destroyed);
    let result = executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await;
    assert!(matches!(result, Err(RuleError::ExecutorUnavailable(_))));
    assert!(executor.init().await.is_err());
}

#[tokio::test]
async fn destroy_waits_for_in_flight_walk() {
    let calls = new_calls();
    let lifecycle = Lifecycle::default();
    let registry = test_registry(&calls, &lifecycle).await;
    let metadata = chain(
        vec![
            node("delay", "Wait", json!({ "delay_ms": 50 })),
            node("tracked", "Tail", json!({ "tag": "tail" })),
        ],
        vec![Connection::new(0, 1, SUCCESS)],
    );
    let executor = ready(RuleChainExecutor::new(metadata, registry)).await;

    let walking = executor.clone();
    let walk = tokio::spawn(async move {
        walking
            .process_message(telemetry(json!({ "temperature": 25 })))
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    executor.destroy().await;

    assert_eq!(lifecycle.stamps.lock().unwrap().len(), 1);
    assert_eq!(lifecycle.calls_after_destroy.load(Ordering::SeqCst), 0);
    assert!(walk.await.unwrap().is_ok());
}

/// 统计拦截器调用次数
#[derive(Debug, Default)]
struct CountingInterceptor {
    before: AtomicUsize,
    after: AtomicUsize,
    errors: AtomicUsize,
}

#[async_trait]
impl NodeInterceptor for CountingInterceptor {
    async fn before<'a>(&self, _ctx: &NodeContext<'a>, _msg: &Msg) -> Result<(), RuleError> {
        self.before.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn after<'a>(
        &self,
        _ctx: &NodeContext<'a>,
        _outputs: &[NodeOutput],
    ) -> Result<(), RuleError> {
        self.after.fetch_add(1, Ordering::SeqCst);
        // 拦截器失败不影响路由
        Err(RuleError::NodeExecution("interceptor failure".to_string()))
    }

    async fn error<'a>(&self, _ctx: &NodeContext<'a>, _error: &RuleError) -> Result<(), RuleError> {
        self.errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn interceptors_observe_each_node_invocation() {
    let calls = new_calls();
    let registry = test_registry(&calls, &Lifecycle::default()).await;
    let metadata = chain(
        vec![
            node("passthrough", "Input", json!({})),
            node("failing", "Broken", json!({})),
            node("recorder", "Handler", json!({})),
        ],
        vec![
            Connection::new(0, 1, SUCCESS),
            Connection::new(1, 2, FAILURE),
        ],
    );
    let counting = Arc::new(CountingInterceptor::default());
    let mut interceptors = InterceptorManager::new();
    interceptors.register_node_interceptor(counting.clone());
    let executor = ready(
        RuleChainExecutor::new(metadata, registry).with_interceptors(Arc::new(interceptors)),
    )
    .await;

    executor
        .process_message(telemetry(json!({ "temperature": 25 })))
        .await
        .unwrap();

    assert_eq!(counting.before.load(Ordering::SeqCst), 3);
    assert_eq!(counting.after.load(Ordering::SeqCst), 2);
    assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    assert_eq!(count_calls(&calls, "Handler"), 1);
}
