use crate::engine::{EnrichNode, NodeComponent};
use crate::types::{Msg, NodeCategory, NodeDescriptor, RuleContext, RuleError, RuleNode};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// 复制字段节点配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopyKeysConfig {
    /// 要复制的字段
    #[serde(default)]
    pub keys: Vec<String>,
    /// 为真时从元数据复制到负载,否则从负载复制到元数据
    #[serde(default)]
    pub from_metadata: bool,
}

/// 复制字段节点:在负载和元数据之间复制指定字段,缺失的字段跳过
#[derive(Debug, Default)]
pub struct CopyKeysNode {
    config: CopyKeysConfig,
}

impl CopyKeysNode {
    pub fn new(config: CopyKeysConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NodeComponent for CopyKeysNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = definition.parse_config()?;
        if self.config.keys.is_empty() {
            return Err(RuleError::node_init(definition.label(), "keys 不能为空"));
        }
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "copy_keys".to_string(),
            name: "复制字段".to_string(),
            description: "在消息负载和元数据之间复制字段".to_string(),
            category: NodeCategory::Enrichment,
        }
    }
}

#[async_trait]
impl EnrichNode for CopyKeysNode {
    async fn enrich(&self, _ctx: &RuleContext, msg: &Msg) -> Result<Msg, RuleError> {
        let mut data = msg.data.clone();
        let mut metadata = msg.metadata.clone();

        if self.config.from_metadata {
            let obj = data.as_object_mut().ok_or_else(|| {
                RuleError::NodeExecution("消息负载不是 JSON 对象".to_string())
            })?;
            for key in &self.config.keys {
                if let Some(value) = msg.metadata.get(key) {
                    obj.insert(key.clone(), Value::String(value.clone()));
                }
            }
        } else {
            for key in &self.config.keys {
                match msg.data_value(key) {
                    Some(Value::String(s)) => {
                        metadata.insert(key.clone(), s.clone());
                    }
                    Some(other) => {
                        metadata.insert(key.clone(), other.to_string());
                    }
                    None => {}
                }
            }
        }

        Ok(msg.copy_with(data, metadata))
    }
}
