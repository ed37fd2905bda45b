use crate::engine::{NodeComponent, NodeHandler, NodeOutput};
use crate::types::{Msg, NodeCategory, NodeDescriptor, RuleContext, RuleError};
use async_trait::async_trait;

/// 直通节点:原样转发到 `Success`
///
/// 也用于替代未注册的节点类型。
#[derive(Debug, Default)]
pub struct PassThroughNode;

#[async_trait]
impl NodeComponent for PassThroughNode {
    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "passthrough".to_string(),
            name: "直通节点".to_string(),
            description: "将消息原样转发到 Success 连接".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for PassThroughNode {
    async fn on_msg(&self, _ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        Ok(vec![NodeOutput::success(msg)])
    }
}
