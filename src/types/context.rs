use crate::types::{EntityId, RuleNode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 单条消息在一条规则链中的执行上下文
///
/// 每次 `process_message` 都会新建一个上下文,
/// `shared_data` 只在本次遍历的各个分支之间共享。
#[derive(Debug)]
pub struct RuleContext {
    /// 所属租户
    pub tenant_id: EntityId,
    /// 所属客户
    pub customer_id: Option<EntityId>,
    /// 当前规则链
    pub rule_chain_id: Uuid,
    /// 执行标识,用于日志关联
    pub execution_id: Uuid,
    shared_data: RwLock<HashMap<String, Value>>,
    /// 本次遍历中已调用的节点数,所有分支共用
    node_executions: AtomicUsize,
}

impl RuleContext {
    /// 创建新的执行上下文
    ///
    /// # Arguments
    /// * `tenant_id` - 租户标识
    /// * `customer_id` - 客户标识
    /// * `rule_chain_id` - 规则链标识
    pub fn new(tenant_id: EntityId, customer_id: Option<EntityId>, rule_chain_id: Uuid) -> Self {
        Self {
            tenant_id,
            customer_id,
            rule_chain_id,
            execution_id: Uuid::new_v4(),
            shared_data: RwLock::new(HashMap::new()),
            node_executions: AtomicUsize::new(0),
        }
    }

    /// 读取共享数据
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.shared_data.read().await.get(key).cloned()
    }

    /// 写入共享数据,返回旧值
    pub async fn put(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.shared_data.write().await.insert(key.into(), value)
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.shared_data.write().await.remove(key)
    }

    /// 记录一次节点调用,返回包括本次在内的调用总数
    pub fn record_node_execution(&self) -> usize {
        self.node_executions.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 共享数据快照
    pub async fn shared_data(&self) -> HashMap<String, Value> {
        self.shared_data.read().await.clone()
    }
}

/// 节点调用上下文,供拦截器使用
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// 当前执行的节点定义
    pub node: &'a RuleNode,
    /// 节点在规则链中的下标
    pub index: usize,
    /// 所属执行上下文
    pub rule: &'a RuleContext,
}

impl<'a> NodeContext<'a> {
    pub fn new(node: &'a RuleNode, index: usize, rule: &'a RuleContext) -> Self {
        Self { node, index, rule }
    }
}
