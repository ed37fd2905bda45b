use crate::components::template;
use crate::engine::{ActionNode, NodeComponent};
use crate::types::{Msg, NodeCategory, NodeDescriptor, RuleContext, RuleError, RuleNode};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    "${msg.type} from ${msg.originator}: ${data}".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

/// 日志节点:按模板输出消息
#[derive(Debug, Default)]
pub struct LogNode {
    config: LogConfig,
}

impl LogNode {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub fn format_message(&self, msg: &Msg) -> String {
        template::render(&self.config.template, msg).0
    }
}

#[async_trait]
impl NodeComponent for LogNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = definition.parse_config()?;
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "log".to_string(),
            name: "日志节点".to_string(),
            description: "输出格式化日志".to_string(),
            category: NodeCategory::Action,
        }
    }
}

#[async_trait]
impl ActionNode for LogNode {
    async fn execute(&self, ctx: &RuleContext, msg: &Msg) -> Result<(), RuleError> {
        info!(
            execution_id = %ctx.execution_id,
            "log组件输出: {}",
            self.format_message(msg)
        );
        Ok(())
    }
}
