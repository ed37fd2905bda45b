use crate::types::RuleError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 规则引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 单个节点处理消息的超时时间(毫秒),为空时不限制
    pub node_timeout_ms: Option<u64>,
    /// 是否为所有执行器启用调试日志拦截器
    pub debug_interceptor: bool,
    /// 单条消息一次遍历最多调用的节点数,超过后丢弃分支,防止环形规则链无限递归
    pub max_node_executions: usize,
    /// 日志配置
    pub log: LogConfig,
}

/// 默认的单次遍历节点调用上限
pub const DEFAULT_MAX_NODE_EXECUTIONS: usize = 50;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: None,
            debug_interceptor: false,
            max_node_executions: DEFAULT_MAX_NODE_EXECUTIONS,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(content)?)
    }

    /// 从配置文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 默认日志级别,`RUST_LOG` 优先
    pub level: String,
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
