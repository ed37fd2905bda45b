use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("节点初始化失败 [{node}]: {reason}")]
    NodeInit { node: String, reason: String },

    #[error("节点执行失败: {0}")]
    NodeExecution(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("规则链未找到: {0}")]
    ChainNotFound(Uuid),

    #[error("规则链执行器不可用: {0}")]
    ExecutorUnavailable(Uuid),

    #[error("节点 [{node}] 执行超时 ({timeout_ms}ms)")]
    Timeout { node: String, timeout_ms: u64 },

    #[error("规则链存储错误: {0}")]
    Store(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("监控指标错误: {0}")]
    Metrics(String),
}

impl RuleError {
    pub fn node_init(node: impl Into<String>, reason: impl ToString) -> Self {
        RuleError::NodeInit {
            node: node.into(),
            reason: reason.to_string(),
        }
    }
}
