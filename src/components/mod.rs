mod delay;
mod enrich;
mod filter;
mod log;
mod passthrough;
mod switch;
mod template;
mod transform;

pub use delay::{DelayConfig, DelayNode};
pub use enrich::{CopyKeysConfig, CopyKeysNode};
pub use filter::{
    Comparison, MsgTypeFilterConfig, MsgTypeFilterNode, ThresholdFilterConfig, ThresholdFilterNode,
};
pub use log::{LogConfig, LogNode};
pub use passthrough::PassThroughNode;
pub use switch::MsgTypeSwitchNode;
pub use transform::{TransformConfig, TransformNode};

use crate::engine::{Action, Enrichment, Filter, NodeFactory, NodeHandler, Transformation};
use std::sync::Arc;

fn factory<F>(constructor: F) -> NodeFactory
where
    F: Fn() -> Box<dyn NodeHandler> + Send + Sync + 'static,
{
    Arc::new(constructor)
}

/// 内置组件的类型名称与工厂函数
pub fn builtin_factories() -> Vec<(&'static str, NodeFactory)> {
    vec![
        (
            "passthrough",
            factory(|| Box::new(PassThroughNode) as Box<dyn NodeHandler>),
        ),
        (
            "msg_type_switch",
            factory(|| Box::new(MsgTypeSwitchNode) as Box<dyn NodeHandler>),
        ),
        (
            "threshold_filter",
            factory(|| Filter::boxed(ThresholdFilterNode::default())),
        ),
        (
            "msg_type_filter",
            factory(|| Filter::boxed(MsgTypeFilterNode::default())),
        ),
        (
            "transform",
            factory(|| Transformation::boxed(TransformNode::default())),
        ),
        (
            "copy_keys",
            factory(|| Enrichment::boxed(CopyKeysNode::default())),
        ),
        ("log", factory(|| Action::boxed(LogNode::default()))),
        ("delay", factory(|| Action::boxed(DelayNode::default()))),
    ]
}
