use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// 消息元数据,按键有序
pub type MsgMetadata = BTreeMap<String, String>;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsgType {
    PostTelemetryRequest,
    PostAttributesRequest,
    Activity,
    Inactivity,
    Connect,
    Disconnect,
    EntityCreated,
    EntityUpdated,
    EntityDeleted,
    EntityAssigned,
    EntityUnassigned,
    AttributesUpdated,
    AttributesDeleted,
    Alarm,
    AlarmAck,
    AlarmClear,
    ToServerRpcRequest,
    RpcCallFromServerToDevice,
    RpcResponse,
    RestApiRequest,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::PostTelemetryRequest => "POST_TELEMETRY_REQUEST",
            MsgType::PostAttributesRequest => "POST_ATTRIBUTES_REQUEST",
            MsgType::Activity => "ACTIVITY",
            MsgType::Inactivity => "INACTIVITY",
            MsgType::Connect => "CONNECT",
            MsgType::Disconnect => "DISCONNECT",
            MsgType::EntityCreated => "ENTITY_CREATED",
            MsgType::EntityUpdated => "ENTITY_UPDATED",
            MsgType::EntityDeleted => "ENTITY_DELETED",
            MsgType::EntityAssigned => "ENTITY_ASSIGNED",
            MsgType::EntityUnassigned => "ENTITY_UNASSIGNED",
            MsgType::AttributesUpdated => "ATTRIBUTES_UPDATED",
            MsgType::AttributesDeleted => "ATTRIBUTES_DELETED",
            MsgType::Alarm => "ALARM",
            MsgType::AlarmAck => "ALARM_ACK",
            MsgType::AlarmClear => "ALARM_CLEAR",
            MsgType::ToServerRpcRequest => "TO_SERVER_RPC_REQUEST",
            MsgType::RpcCallFromServerToDevice => "RPC_CALL_FROM_SERVER_TO_DEVICE",
            MsgType::RpcResponse => "RPC_RESPONSE",
            MsgType::RestApiRequest => "REST_API_REQUEST",
        }
    }

    /// 消息类型路由节点使用的连接标签
    pub fn connection_label(&self) -> &'static str {
        match self {
            MsgType::PostTelemetryRequest => "Post telemetry",
            MsgType::PostAttributesRequest => "Post attributes",
            MsgType::Activity => "Activity Event",
            MsgType::Inactivity => "Inactivity Event",
            MsgType::Connect => "Connect Event",
            MsgType::Disconnect => "Disconnect Event",
            MsgType::EntityCreated => "Entity Created",
            MsgType::EntityUpdated => "Entity Updated",
            MsgType::EntityDeleted => "Entity Deleted",
            MsgType::EntityAssigned => "Entity Assigned",
            MsgType::EntityUnassigned => "Entity Unassigned",
            MsgType::AttributesUpdated => "Attributes Updated",
            MsgType::AttributesDeleted => "Attributes Deleted",
            MsgType::Alarm => "Alarm",
            MsgType::AlarmAck => "Alarm Acknowledged",
            MsgType::AlarmClear => "Alarm Cleared",
            MsgType::ToServerRpcRequest => "RPC Request from Device",
            MsgType::RpcCallFromServerToDevice => "RPC Request to Device",
            MsgType::RestApiRequest => "REST API request",
            MsgType::RpcResponse => crate::types::relation::OTHER,
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 在规则链中流转的消息
///
/// 消息按约定不可变:节点"修改"消息时应产生新值,
/// 因为同一条消息可能被并发转发给多个下游节点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    /// 消息唯一标识,产生新的逻辑消息时重新生成
    pub id: Uuid,
    /// 消息类型
    #[serde(rename = "type")]
    pub msg_type: MsgType,
    /// 消息发起者
    pub originator: EntityId,
    /// 所属客户
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<EntityId>,
    /// 附加上下文,例如设备名称
    #[serde(default)]
    pub metadata: MsgMetadata,
    /// 消息负载,对执行器不透明
    pub data: Value,
    /// 当前所在规则链
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_chain_id: Option<Uuid>,
    /// 当前所在节点,用于追踪
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_node_id: Option<Uuid>,
    /// 事件时间戳(毫秒)
    pub ts: i64,
}

impl Msg {
    /// 创建新消息
    ///
    /// # Arguments
    /// * `msg_type` - 消息类型
    /// * `originator` - 消息发起者
    /// * `metadata` - 消息元数据
    /// * `data` - 消息负载
    pub fn new(msg_type: MsgType, originator: EntityId, metadata: MsgMetadata, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            msg_type,
            originator,
            customer_id: None,
            metadata,
            data,
            rule_chain_id: None,
            rule_node_id: None,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_customer(mut self, customer_id: EntityId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_ts(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }

    /// 生成新的逻辑消息,替换负载与元数据
    ///
    /// 新消息拥有新的 `id`,其余字段(包括 `rule_chain_id`)保持不变。
    pub fn copy_with(&self, data: Value, metadata: MsgMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            metadata,
            ..self.clone()
        }
    }

    /// 仅替换负载的新逻辑消息
    pub fn transform(&self, data: Value) -> Self {
        self.copy_with(data, self.metadata.clone())
    }

    /// 内容不变,重新生成 `id`
    pub fn with_new_id(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    /// 读取对象型负载中的字段
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.as_object().and_then(|obj| obj.get(key))
    }

    /// 按点分路径读取负载中的嵌套字段
    pub fn data_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.data, |current, part| current.get(part))
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
