use crate::aop::InterceptorManager;
use crate::config::DEFAULT_MAX_NODE_EXECUTIONS;
use crate::components::PassThroughNode;
use crate::engine::{NodeHandler, NodeOutput, NodeRegistry, Version};
use crate::metrics::{DropReason, EngineMetrics};
use crate::types::relation::FAILURE;
use crate::types::{ChainMetadata, Msg, NodeContext, RuleContext, RuleError, RuleNode};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 执行器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStatus {
    Uninitialized,
    Initialized,
    Destroyed,
}

#[derive(Debug)]
enum ExecutorState {
    Uninitialized,
    Initialized(ChainGraph),
    Destroyed,
}

/// 已初始化的节点实例
#[derive(Debug)]
struct LiveNode {
    definition: RuleNode,
    handler: Box<dyn NodeHandler>,
}

/// 规则链的运行时图结构,初始化后只读
#[derive(Debug)]
struct ChainGraph {
    nodes: Vec<LiveNode>,
    /// from_index -> [(to_index, 标签)]
    connections: HashMap<usize, Vec<(usize, String)>>,
}

impl ChainGraph {
    fn targets(&self, from_index: usize, label: &str) -> Vec<usize> {
        self.connections
            .get(&from_index)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(_, type_name)| type_name == label)
                    .map(|(to_index, _)| *to_index)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_route(&self, from_index: usize, label: &str) -> bool {
        self.connections
            .get(&from_index)
            .is_some_and(|edges| edges.iter().any(|(_, type_name)| type_name == label))
    }
}

/// 单条规则链的执行器
///
/// 持有规则链的全部节点实例和连接关系,负责一条消息在图中的完整遍历。
/// 遍历期间持有状态读锁,`destroy` 需要写锁,因此节点不会在遍历中途被销毁。
#[derive(Debug)]
pub struct RuleChainExecutor {
    metadata: ChainMetadata,
    registry: Arc<NodeRegistry>,
    interceptors: Arc<InterceptorManager>,
    metrics: Option<EngineMetrics>,
    node_timeout: Option<Duration>,
    max_node_executions: usize,
    version: Option<Version>,
    state: RwLock<ExecutorState>,
}

impl RuleChainExecutor {
    /// 创建未初始化的执行器
    ///
    /// # Arguments
    /// * `metadata` - 规则链定义
    /// * `registry` - 节点注册表
    pub fn new(metadata: ChainMetadata, registry: Arc<NodeRegistry>) -> Self {
        Self {
            metadata,
            registry,
            interceptors: Arc::new(InterceptorManager::new()),
            metrics: None,
            node_timeout: None,
            max_node_executions: DEFAULT_MAX_NODE_EXECUTIONS,
            version: None,
            state: RwLock::new(ExecutorState::Uninitialized),
        }
    }

    pub fn with_interceptors(mut self, interceptors: Arc<InterceptorManager>) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 设置单个节点处理消息的超时时间
    pub fn with_node_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.node_timeout = timeout;
        self
    }

    /// 设置单条消息一次遍历最多调用的节点数
    pub fn with_max_node_executions(mut self, limit: usize) -> Self {
        self.max_node_executions = limit;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn chain_id(&self) -> Uuid {
        self.metadata.rule_chain_id
    }

    pub fn metadata(&self) -> &ChainMetadata {
        &self.metadata
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub async fn status(&self) -> ExecutorStatus {
        match &*self.state.read().await {
            ExecutorState::Uninitialized => ExecutorStatus::Uninitialized,
            ExecutorState::Initialized(_) => ExecutorStatus::Initialized,
            ExecutorState::Destroyed => ExecutorStatus::Destroyed,
        }
    }

    /// 初始化规则链:按节点数组顺序创建并初始化节点实例,然后构建连接表
    ///
    /// 未注册的节点类型以直通节点代替;任一节点 `init` 失败则整条规则链初始化失败,
    /// 已初始化的节点会被销毁。
    pub async fn init(&self) -> Result<(), RuleError> {
        let mut state = self.state.write().await;
        if !matches!(*state, ExecutorState::Uninitialized) {
            return Err(RuleError::Config(format!(
                "规则链 {} 执行器已初始化或已销毁",
                self.chain_id()
            )));
        }

        let mut nodes: Vec<LiveNode> = Vec::with_capacity(self.metadata.nodes.len());
        for definition in &self.metadata.nodes {
            let handler = match self.registry.get(&definition.type_name).await {
                Some(factory) => {
                    let mut handler = factory();
                    if let Err(e) = handler.init(definition).await {
                        error!(
                            "规则链 {} 节点 [{}] 初始化失败: {}",
                            self.chain_id(),
                            definition.label(),
                            e
                        );
                        handler.destroy().await;
                        destroy_nodes(&nodes).await;
                        return Err(match e {
                            RuleError::NodeInit { .. } => e,
                            other => RuleError::node_init(definition.label(), other),
                        });
                    }
                    handler
                }
                None => {
                    warn!(
                        "规则链 {} 节点 [{}] 的类型 {} 未注册,使用直通节点代替",
                        self.chain_id(),
                        definition.label(),
                        definition.type_name
                    );
                    Box::new(PassThroughNode) as Box<dyn NodeHandler>
                }
            };
            nodes.push(LiveNode {
                definition: definition.clone(),
                handler,
            });
        }

        let mut connections: HashMap<usize, Vec<(usize, String)>> = HashMap::new();
        for conn in &self.metadata.connections {
            if conn.from_index >= nodes.len() || conn.to_index >= nodes.len() {
                warn!(
                    "规则链 {} 连接 {} -[{}]-> {} 引用了不存在的节点",
                    self.chain_id(),
                    conn.from_index,
                    conn.type_name,
                    conn.to_index
                );
            }
            connections
                .entry(conn.from_index)
                .or_default()
                .push((conn.to_index, conn.type_name.clone()));
        }

        info!(
            "规则链 {} ({}) 初始化完成, 节点数: {}",
            self.chain_id(),
            self.metadata.name,
            nodes.len()
        );
        *state = ExecutorState::Initialized(ChainGraph { nodes, connections });
        Ok(())
    }

    /// 处理一条消息,返回时整棵遍历树的所有分支都已完成
    ///
    /// 节点失败不会向调用方传播;只有执行器未初始化或已销毁时返回错误。
    pub async fn process_message(&self, mut msg: Msg) -> Result<(), RuleError> {
        let state = self.state.read().await;
        let graph = match &*state {
            ExecutorState::Initialized(graph) => graph,
            _ => return Err(RuleError::ExecutorUnavailable(self.chain_id())),
        };

        if let Some(metrics) = &self.metrics {
            metrics.message_submitted(self.chain_id());
        }

        let Some(first_index) = self.metadata.first_node_index else {
            debug!("规则链 {} 没有入口节点, 忽略消息 {}", self.chain_id(), msg.id);
            return Ok(());
        };

        let ctx = RuleContext::new(self.metadata.tenant(), msg.customer_id, self.chain_id());
        msg.rule_chain_id = Some(self.chain_id());
        debug!(
            execution_id = %ctx.execution_id,
            "规则链 {} 开始处理消息 {} ({})",
            self.chain_id(),
            msg.id,
            msg.msg_type
        );

        self.interceptors.before_process(&msg).await;
        self.process_node(graph, &ctx, msg.clone(), first_index).await;
        self.interceptors.after_process(&msg).await;
        Ok(())
    }

    fn process_node<'a>(
        &'a self,
        graph: &'a ChainGraph,
        ctx: &'a RuleContext,
        mut msg: Msg,
        index: usize,
    ) -> BoxFuture<'a, ()> {
        async move {
            let Some(node) = graph.nodes.get(index) else {
                warn!(
                    execution_id = %ctx.execution_id,
                    "规则链 {} 中不存在下标为 {} 的节点, 丢弃该分支",
                    self.chain_id(),
                    index
                );
                if let Some(metrics) = &self.metrics {
                    metrics.branch_dropped(self.chain_id(), DropReason::UnknownNode);
                }
                return;
            };

            if ctx.record_node_execution() > self.max_node_executions {
                warn!(
                    execution_id = %ctx.execution_id,
                    "规则链 {} 消息 {} 的节点调用次数达到上限 {}, 丢弃进入节点 [{}] 的分支",
                    self.chain_id(),
                    msg.id,
                    self.max_node_executions,
                    node.definition.label()
                );
                if let Some(metrics) = &self.metrics {
                    metrics.branch_dropped(self.chain_id(), DropReason::ExecutionLimit);
                }
                return;
            }

            msg.rule_node_id = Some(node.definition.id);
            let node_ctx = NodeContext::new(&node.definition, index, ctx);
            self.interceptors.before_node(&node_ctx, &msg).await;

            match self.invoke(node, ctx, msg.clone()).await {
                Ok(outputs) => {
                    self.interceptors.after_node(&node_ctx, &outputs).await;
                    join_all(outputs.into_iter().map(move |output| {
                        self.route_message(graph, ctx, output.msg, index, output.label)
                    }))
                    .await;
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.node_failed(self.chain_id());
                    }
                    self.interceptors.node_error(&node_ctx, &e).await;
                    if graph.has_route(index, FAILURE) {
                        warn!(
                            execution_id = %ctx.execution_id,
                            "节点 [{}] 处理失败, 转入 Failure 连接: {}",
                            node.definition.label(),
                            e
                        );
                        self.route_message(graph, ctx, msg, index, FAILURE.to_string())
                            .await;
                    } else {
                        error!(
                            execution_id = %ctx.execution_id,
                            "节点 [{}] 处理失败且没有 Failure 连接, 丢弃消息 {}: {}",
                            node.definition.label(),
                            msg.id,
                            e
                        );
                        if let Some(metrics) = &self.metrics {
                            metrics.branch_dropped(self.chain_id(), DropReason::NoFailureRoute);
                        }
                    }
                }
            }
        }
        .boxed()
    }

    async fn route_message(
        &self,
        graph: &ChainGraph,
        ctx: &RuleContext,
        msg: Msg,
        from_index: usize,
        label: String,
    ) {
        let targets = graph.targets(from_index, &label);
        if targets.is_empty() {
            debug!(
                execution_id = %ctx.execution_id,
                "节点 {} 没有 [{}] 连接, 分支结束",
                from_index,
                label
            );
            return;
        }

        debug!(
            execution_id = %ctx.execution_id,
            "消息 {} 经 [{}] 从节点 {} 转发到 {:?}",
            msg.id,
            label,
            from_index,
            targets
        );
        join_all(
            targets
                .into_iter()
                .map(|to_index| self.process_node(graph, ctx, msg.clone(), to_index)),
        )
        .await;
    }

    async fn invoke(
        &self,
        node: &LiveNode,
        ctx: &RuleContext,
        msg: Msg,
    ) -> Result<Vec<NodeOutput>, RuleError> {
        match self.node_timeout {
            Some(limit) => tokio::time::timeout(limit, node.handler.on_msg(ctx, msg))
                .await
                .map_err(|_| RuleError::Timeout {
                    node: node.definition.label(),
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => node.handler.on_msg(ctx, msg).await,
        }
    }

    /// 销毁所有节点实例,执行器进入终止状态
    ///
    /// 会等待正在进行的遍历结束;重复调用是安全的。
    pub async fn destroy(&self) {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut *state, ExecutorState::Destroyed);
        if let ExecutorState::Initialized(graph) = previous {
            destroy_nodes(&graph.nodes).await;
            info!("规则链 {} 执行器已销毁", self.chain_id());
        }
    }
}

async fn destroy_nodes(nodes: &[LiveNode]) {
    for node in nodes {
        debug!("销毁节点 [{}]", node.definition.label());
        node.handler.destroy().await;
    }
}
