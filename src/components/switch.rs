use crate::engine::{NodeComponent, NodeHandler, NodeOutput};
use crate::types::{Msg, NodeCategory, NodeDescriptor, RuleContext, RuleError};
use async_trait::async_trait;

/// 消息类型路由节点
///
/// 按消息类型输出对应的连接标签,例如 `Post telemetry`、`RPC Request from Device`,
/// 没有专用标签的类型输出 `Other`。
#[derive(Debug, Default)]
pub struct MsgTypeSwitchNode;

#[async_trait]
impl NodeComponent for MsgTypeSwitchNode {
    fn get_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            type_name: "msg_type_switch".to_string(),
            name: "消息类型路由".to_string(),
            description: "根据消息类型选择不同的处理分支".to_string(),
            category: NodeCategory::Flow,
        }
    }
}

#[async_trait]
impl NodeHandler for MsgTypeSwitchNode {
    async fn on_msg(&self, _ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        let label = msg.msg_type.connection_label();
        Ok(vec![NodeOutput::labelled(msg, label)])
    }
}
