#![allow(dead_code)]

use async_trait::async_trait;
use rule_chain::engine::{NodeComponent, NodeHandler, NodeOutput, NodeRegistry};
use rule_chain::types::relation::SUCCESS;
use rule_chain::{
    ChainMetadata, Connection, EntityId, Msg, MsgMetadata, MsgType, NodeCategory, NodeDescriptor,
    RuleContext, RuleError, RuleNode,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 记录每次节点调用: (节点名称, 消息)
pub type Calls = Arc<Mutex<Vec<(String, Msg)>>>;

pub fn new_calls() -> Calls {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count_calls(calls: &Calls, name: &str) -> usize {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(node, _)| node == name)
        .count()
}

pub fn telemetry(data: Value) -> Msg {
    let mut metadata = MsgMetadata::new();
    metadata.insert("deviceName".to_string(), "sensor-1".to_string());
    Msg::new(
        MsgType::PostTelemetryRequest,
        EntityId::device(Uuid::new_v4()),
        metadata,
        data,
    )
}

pub fn rule_context() -> RuleContext {
    RuleContext::new(EntityId::tenant(Uuid::new_v4()), None, Uuid::new_v4())
}

pub fn node(type_name: &str, name: &str, configuration: Value) -> RuleNode {
    RuleNode::new(type_name, name, configuration)
}

pub fn chain(nodes: Vec<RuleNode>, connections: Vec<Connection>) -> ChainMetadata {
    ChainMetadata {
        rule_chain_id: Uuid::new_v4(),
        name: "test chain".to_string(),
        tenant_id: Uuid::new_v4(),
        first_node_index: Some(0),
        nodes,
        connections,
    }
}

/// 记录调用并转发到 `Success` 的节点
#[derive(Debug)]
pub struct RecorderNode {
    name: String,
    calls: Calls,
}

impl RecorderNode {
    pub fn new(calls: Calls) -> Self {
        Self {
            name: String::new(),
            calls,
        }
    }
}

#[async_trait]
impl NodeComponent for RecorderNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.name = definition.name.clone();
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "recorder".to_string(),
            name: "recorder".to_string(),
            description: "records invocations".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for RecorderNode {
    async fn on_msg(&self, _ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        self.calls
            .lock()
            .unwrap()
            .push((self.name.clone(), msg.clone()));
        Ok(vec![NodeOutput::labelled(msg, SUCCESS)])
    }
}

/// 直接实现节点契约并总是返回错误的节点
#[derive(Debug, Default)]
pub struct FailingNode;

#[async_trait]
impl NodeComponent for FailingNode {
    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "failing".to_string(),
            name: "failing".to_string(),
            description: "always fails".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for FailingNode {
    async fn on_msg(&self, _ctx: &RuleContext, _msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        Err(RuleError::NodeExecution("boom".to_string()))
    }
}

/// 初始化总是失败的节点
#[derive(Debug)]
pub struct BrokenInitNode {
    pub destroyed: Arc<AtomicUsize>,
}

#[async_trait]
impl NodeComponent for BrokenInitNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        Err(RuleError::node_init(definition.label(), "unreachable dependency"))
    }

    async fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "broken".to_string(),
            name: "broken".to_string(),
            description: "fails to initialize".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for BrokenInitNode {
    async fn on_msg(&self, _ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        Ok(vec![NodeOutput::success(msg)])
    }
}

/// 生命周期记录:统计 init/destroy 次数,并记录销毁后仍被调用的情况
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    pub inits: Arc<AtomicUsize>,
    pub destroys: Arc<AtomicUsize>,
    pub calls_after_destroy: Arc<AtomicUsize>,
    /// (消息 id, 节点配置中的 tag)
    pub stamps: Arc<Mutex<Vec<(Uuid, String)>>>,
}

#[derive(Debug)]
pub struct LifecycleNode {
    lifecycle: Lifecycle,
    tag: String,
    destroyed: AtomicBool,
}

impl LifecycleNode {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            tag: String::new(),
            destroyed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl NodeComponent for LifecycleNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.tag = definition
            .configuration
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.lifecycle.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.lifecycle.destroys.fetch_add(1, Ordering::SeqCst);
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "tracked".to_string(),
            name: "tracked".to_string(),
            description: "tracks lifecycle calls".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for LifecycleNode {
    async fn on_msg(&self, _ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        if self.destroyed.load(Ordering::SeqCst) {
            self.lifecycle.calls_after_destroy.fetch_add(1, Ordering::SeqCst);
        }
        self.lifecycle
            .stamps
            .lock()
            .unwrap()
            .push((msg.id, self.tag.clone()));
        tokio::task::yield_now().await;
        Ok(vec![NodeOutput::success(msg)])
    }
}

/// 注册内置组件以及测试节点的注册表
pub async fn test_registry(calls: &Calls, lifecycle: &Lifecycle) -> Arc<NodeRegistry> {
    let registry = NodeRegistry::with_builtins().await;

    let recorder_calls = calls.clone();
    registry
        .register_fn("recorder", move || {
            Box::new(RecorderNode::new(recorder_calls.clone())) as Box<dyn NodeHandler>
        })
        .await;
    registry
        .register_fn("failing", || Box::new(FailingNode) as Box<dyn NodeHandler>)
        .await;
    let lifecycle = lifecycle.clone();
    registry
        .register_fn("tracked", move || {
            Box::new(LifecycleNode::new(lifecycle.clone())) as Box<dyn NodeHandler>
        })
        .await;

    Arc::new(registry)
}

pub fn sample_payload() -> Value {
    json!({ "temperature": 25, "humidity": 40 })
}
