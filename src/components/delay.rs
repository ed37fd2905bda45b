use crate::engine::{ActionNode, NodeComponent};
use crate::types::{Msg, NodeCategory, NodeDescriptor, RuleContext, RuleError, RuleNode};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

/// 延迟节点配置
#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    /// 延迟时间(毫秒)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

/// 延迟处理节点,挂起当前分支后原样转发
#[derive(Debug, Default)]
pub struct DelayNode {
    config: DelayConfig,
}

impl DelayNode {
    pub fn new(config: DelayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NodeComponent for DelayNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = definition.parse_config()?;
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "delay".to_string(),
            name: "延时节点".to_string(),
            description: "延迟一段时间后转发消息".to_string(),
            category: NodeCategory::Action,
        }
    }
}

#[async_trait]
impl ActionNode for DelayNode {
    async fn execute(&self, _ctx: &RuleContext, _msg: &Msg) -> Result<(), RuleError> {
        sleep(Duration::from_millis(self.config.delay_ms)).await;
        Ok(())
    }
}
