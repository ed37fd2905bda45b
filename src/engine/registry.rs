use crate::components;
use crate::engine::NodeHandler;
use crate::types::NodeDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 节点工厂函数类型,每次调用创建一个未初始化的节点实例
pub type NodeFactory = Arc<dyn Fn() -> Box<dyn NodeHandler> + Send + Sync>;

/// 节点注册表,管理所有已注册的节点类型
///
/// 注册表由调用方显式创建,并通过 `Arc` 在引擎和各执行器之间共享。
pub struct NodeRegistry {
    /// 存储节点工厂函数,key为节点类型名称
    factories: RwLock<HashMap<String, NodeFactory>>,
    /// 存储节点描述符,key为节点类型名称
    descriptors: RwLock<HashMap<String, NodeDescriptor>>,
}

impl NodeRegistry {
    /// 创建空的节点注册表
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// 创建注册了内置组件的注册表
    pub async fn with_builtins() -> Self {
        let registry = Self::new();
        for (type_name, factory) in components::builtin_factories() {
            registry.register(type_name, factory).await;
        }
        registry
    }

    /// 注册新的节点类型,同名类型以最后一次注册为准
    ///
    /// # Arguments
    /// * `type_name` - 节点类型名称
    /// * `factory` - 节点工厂函数
    pub async fn register(&self, type_name: &str, factory: NodeFactory) {
        let mut factories = self.factories.write().await;
        let mut descriptors = self.descriptors.write().await;

        // 创建一个临时实例来获取节点描述符
        let mut descriptor = factory().get_descriptor();
        descriptor.type_name = type_name.to_string();

        if factories
            .insert(type_name.to_string(), factory)
            .is_some()
        {
            tracing::debug!("Node type {} re-registered, previous factory replaced", type_name);
        }
        descriptors.insert(type_name.to_string(), descriptor);
    }

    /// 注册一个无状态构造函数
    pub async fn register_fn<F>(&self, type_name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn NodeHandler> + Send + Sync + 'static,
    {
        self.register(type_name, Arc::new(constructor)).await;
    }

    /// 获取指定节点类型的工厂函数
    pub async fn get(&self, type_name: &str) -> Option<NodeFactory> {
        self.factories.read().await.get(type_name).cloned()
    }

    pub async fn is_registered(&self, type_name: &str) -> bool {
        self.factories.read().await.contains_key(type_name)
    }

    /// 获取所有已注册节点的描述符
    pub async fn get_descriptors(&self) -> Vec<NodeDescriptor> {
        let descriptors = self.descriptors.read().await;
        let mut result: Vec<_> = descriptors.values().cloned().collect();
        result.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        result
    }

    pub async fn get_descriptor(&self, type_name: &str) -> Option<NodeDescriptor> {
        self.descriptors.read().await.get(type_name).cloned()
    }

    /// 获取所有已注册的节点类型名称
    pub async fn get_registered_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut types: Vec<_> = factories.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("factories", &"<node factories>")
            .field("descriptors", &"<node descriptors>")
            .finish()
    }
}
