mod context;
mod descriptor;
mod entity;
mod error;
mod message;
pub mod relation;

pub use context::*;
pub use descriptor::*;
pub use entity::*;
pub use error::*;
pub use message::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

/// 规则链定义,由外部存储加载,执行器只读使用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainMetadata {
    /// 规则链唯一标识
    pub rule_chain_id: Uuid,
    /// 规则链名称
    #[serde(default)]
    pub name: String,
    /// 所属租户
    #[serde(default)]
    pub tenant_id: Uuid,
    /// 入口节点下标,为空时规则链不处理任何消息
    #[serde(default)]
    pub first_node_index: Option<usize>,
    /// 规则链中的所有节点,下标即节点序号
    pub nodes: Vec<RuleNode>,
    /// 节点之间的连接关系
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl ChainMetadata {
    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(content)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn tenant(&self) -> EntityId {
        EntityId::tenant(self.tenant_id)
    }
}

/// 节点定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleNode {
    pub id: Uuid,
    /// 节点类型,对应注册表中的键
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub debug_mode: bool,
    /// 节点配置
    #[serde(default)]
    pub configuration: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<Value>,
}

impl RuleNode {
    pub fn new(type_name: &str, name: &str, configuration: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            type_name: type_name.to_string(),
            name: name.to_string(),
            debug_mode: false,
            configuration,
            additional_info: None,
        }
    }

    /// 将节点配置解析为具体的配置结构
    pub fn parse_config<T: serde::de::DeserializeOwned>(&self) -> Result<T, RuleError> {
        let config = match &self.configuration {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(config).map_err(|e| RuleError::node_init(self.label(), e))
    }

    /// 日志中使用的节点标识
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("{}({})", self.type_name, self.id)
        } else {
            format!("{}({})", self.name, self.id)
        }
    }
}

/// 节点之间的有向连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// 起始节点下标
    pub from_index: usize,
    /// 目标节点下标
    pub to_index: usize,
    /// 连接标签,与节点输出标签精确匹配
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Connection {
    pub fn new(from_index: usize, to_index: usize, type_name: &str) -> Self {
        Self {
            from_index,
            to_index,
            type_name: type_name.to_string(),
        }
    }
}
