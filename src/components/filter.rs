use crate::engine::{FilterNode, NodeComponent};
use crate::types::{
    Msg, MsgType, NodeCategory, NodeDescriptor, RuleContext, RuleError, RuleNode,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// 比较方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparison {
    fn matches(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gt => value > threshold,
            Comparison::Gte => value >= threshold,
            Comparison::Lt => value < threshold,
            Comparison::Lte => value <= threshold,
            Comparison::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

/// 阈值过滤节点配置
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdFilterConfig {
    /// 负载中的字段,支持点分路径
    pub key: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
}

/// 阈值过滤节点:比较负载中的数值字段与阈值
#[derive(Debug, Default)]
pub struct ThresholdFilterNode {
    config: Option<ThresholdFilterConfig>,
}

impl ThresholdFilterNode {
    pub fn new(config: ThresholdFilterConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    fn numeric(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl NodeComponent for ThresholdFilterNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = Some(definition.parse_config()?);
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "threshold_filter".to_string(),
            name: "阈值过滤器".to_string(),
            description: "比较负载中的数值字段与阈值".to_string(),
            category: NodeCategory::Filter,
        }
    }
}

#[async_trait]
impl FilterNode for ThresholdFilterNode {
    async fn filter(&self, _ctx: &RuleContext, msg: &Msg) -> Result<bool, RuleError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| RuleError::NodeExecution("阈值过滤器未初始化".to_string()))?;

        let value = msg.data_path(&config.key).ok_or_else(|| {
            RuleError::NodeExecution(format!("Missing {} field", config.key))
        })?;
        let number = Self::numeric(value).ok_or_else(|| {
            RuleError::NodeExecution(format!("{} must be a number, got {}", config.key, value))
        })?;

        Ok(config.comparison.matches(number, config.threshold))
    }
}

/// 消息类型过滤节点配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MsgTypeFilterConfig {
    #[serde(default)]
    pub message_types: Vec<MsgType>,
}

/// 消息类型过滤节点:消息类型在列表中时输出 `True`
#[derive(Debug, Default)]
pub struct MsgTypeFilterNode {
    config: MsgTypeFilterConfig,
}

impl MsgTypeFilterNode {
    pub fn new(config: MsgTypeFilterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NodeComponent for MsgTypeFilterNode {
    async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
        self.config = definition.parse_config()?;
        Ok(())
    }

    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "msg_type_filter".to_string(),
            name: "消息类型过滤器".to_string(),
            description: "根据消息类型过滤消息".to_string(),
            category: NodeCategory::Filter,
        }
    }
}

#[async_trait]
impl FilterNode for MsgTypeFilterNode {
    async fn filter(&self, _ctx: &RuleContext, msg: &Msg) -> Result<bool, RuleError> {
        Ok(self.config.message_types.contains(&msg.msg_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_defaults_to_greater_than() {
        let config: ThresholdFilterConfig =
            serde_json::from_value(serde_json::json!({ "key": "t", "threshold": 20 })).unwrap();
        assert_eq!(config.comparison, Comparison::Gt);
        assert!(config.comparison.matches(25.0, 20.0));
        assert!(!config.comparison.matches(20.0, 20.0));
    }

    #[test]
    fn numeric_accepts_numeric_strings() {
        assert_eq!(ThresholdFilterNode::numeric(&Value::from("12.5")), Some(12.5));
        assert_eq!(ThresholdFilterNode::numeric(&Value::from("hot")), None);
        assert_eq!(ThresholdFilterNode::numeric(&Value::Bool(true)), None);
    }
}
