use serde::{Deserialize, Serialize};

/// 节点行为类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Filter,
    Transformation,
    Action,
    Enrichment,
    /// 直接实现节点契约,自定义输出标签
    Flow,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NodeDescriptor {
    pub type_name: String,
    pub name: String,
    pub description: String,
    pub category: NodeCategory,
}
