use crate::components::template;
use crate::engine::{NodeComponent, TransformNode as Transform};
use crate::types::{
    Msg, MsgType, NodeCategory, NodeDescriptor, RuleContext, RuleError, RuleNode,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// 模板转换节点配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    /// 输出负载模板,字符串中的 `${...}` 会被替换
    #[serde(default)]
    pub template: Value,
    /// 输出消息类型,为空时沿用原类型
    #[serde(default)]
    pub output_type: Option<MsgType>,
    /// 为真时任何无法解析的变量都视为失败
    #[serde(default)]
    pub strict: bool,
}

/// 模板转换节点:按模板生成新负载
#[derive(Debug, Default)]
pub struct TransformNode {
    config: TransformConfig,
}

impl TransformNode {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NodeComponent for TransformNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = definition.parse_config()?;
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "transform".to_string(),
            name: "消息转换器".to_string(),
            description: "按模板转换消息格式".to_string(),
            category: NodeCategory::Transformation,
        }
    }
}

#[async_trait]
impl Transform for TransformNode {
    async fn transform(&self, _ctx: &RuleContext, msg: &Msg) -> Result<Msg, RuleError> {
        let mut missing = Vec::new();
        let data = template::apply(&self.config.template, msg, &mut missing);
        if self.config.strict && !missing.is_empty() {
            return Err(RuleError::NodeExecution(format!(
                "模板变量无法解析: {}",
                missing.join(", ")
            )));
        }

        let mut transformed = msg.transform(data);
        if let Some(output_type) = self.config.output_type {
            transformed.msg_type = output_type;
        }
        Ok(transformed)
    }
}
