use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Tenant,
    Customer,
    User,
    Dashboard,
    Asset,
    Device,
    Alarm,
    RuleChain,
    RuleNode,
    EntityView,
    Edge,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Tenant => "TENANT",
            EntityType::Customer => "CUSTOMER",
            EntityType::User => "USER",
            EntityType::Dashboard => "DASHBOARD",
            EntityType::Asset => "ASSET",
            EntityType::Device => "DEVICE",
            EntityType::Alarm => "ALARM",
            EntityType::RuleChain => "RULE_CHAIN",
            EntityType::RuleNode => "RULE_NODE",
            EntityType::EntityView => "ENTITY_VIEW",
            EntityType::Edge => "EDGE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 实体标识,用于描述消息的发起者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub id: Uuid,
    pub entity_type: EntityType,
}

impl EntityId {
    pub fn new(entity_type: EntityType, id: Uuid) -> Self {
        Self { id, entity_type }
    }

    pub fn tenant(id: Uuid) -> Self {
        Self::new(EntityType::Tenant, id)
    }

    pub fn customer(id: Uuid) -> Self {
        Self::new(EntityType::Customer, id)
    }

    pub fn device(id: Uuid) -> Self {
        Self::new(EntityType::Device, id)
    }

    pub fn asset(id: Uuid) -> Self {
        Self::new(EntityType::Asset, id)
    }

    pub fn rule_chain(id: Uuid) -> Self {
        Self::new(EntityType::RuleChain, id)
    }

    pub fn rule_node(id: Uuid) -> Self {
        Self::new(EntityType::RuleNode, id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.entity_type, self.id)
    }
}
