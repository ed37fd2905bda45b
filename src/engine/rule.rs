use crate::aop::{InterceptorManager, MessageInterceptor, NodeInterceptor};
use crate::config::EngineConfig;
use crate::engine::{NodeFactory, NodeRegistry, RuleChainExecutor, RuleChainStore, VersionManager};
use crate::metrics::EngineMetrics;
use crate::types::{ChainMetadata, Msg, NodeDescriptor, RuleError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub type DynRuleEngine = Arc<dyn RuleEngineTrait + Send + Sync>;

/// 规则引擎对外接口:消息提交与规则链管理
#[async_trait]
pub trait RuleEngineTrait: Debug + Send + Sync {
    /// 提交消息到指定规则链
    async fn submit(&self, rule_chain_id: Uuid, msg: Msg) -> Result<(), RuleError>;
    /// 使用新的定义重载规则链
    async fn reload(&self, rule_chain_id: Uuid, metadata: ChainMetadata) -> Result<(), RuleError>;
    /// 销毁规则链执行器
    async fn destroy(&self, rule_chain_id: Uuid);
    /// 销毁所有执行器
    async fn shutdown(&self);
    /// 获取所有已加载的规则链
    async fn loaded_chains(&self) -> Vec<Uuid>;
    /// 获取所有已注册的组件类型
    async fn get_registered_components(&self) -> Vec<NodeDescriptor>;
    /// 注册自定义节点类型
    async fn register_node_type(&self, type_name: &str, factory: NodeFactory);
}

/// 规则引擎,按规则链标识缓存执行器
///
/// 执行器表的所有修改都在同一把锁下完成,每条规则链在缓存中最多只有一个执行器。
/// 消息分发和旧执行器的销毁都在锁外进行。
#[derive(Debug, Clone)]
pub struct RuleEngine {
    executors: Arc<Mutex<HashMap<Uuid, Arc<RuleChainExecutor>>>>,
    node_registry: Arc<NodeRegistry>,
    store: Option<Arc<dyn RuleChainStore>>,
    version_manager: Arc<VersionManager>,
    interceptor_manager: Arc<RwLock<InterceptorManager>>,
    metrics: Option<EngineMetrics>,
    config: Arc<EngineConfig>,
}

impl RuleEngine {
    /// 创建规则引擎
    ///
    /// # Arguments
    /// * `node_registry` - 节点注册表
    /// * `config` - 引擎配置
    pub fn new(node_registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
        let interceptors = if config.debug_interceptor {
            InterceptorManager::with_debug_logging()
        } else {
            InterceptorManager::new()
        };

        Self {
            executors: Arc::new(Mutex::new(HashMap::new())),
            node_registry,
            store: None,
            version_manager: Arc::new(VersionManager::new()),
            interceptor_manager: Arc::new(RwLock::new(interceptors)),
            metrics: None,
            config: Arc::new(config),
        }
    }

    /// 创建注册了内置组件的规则引擎
    pub async fn with_builtins(config: EngineConfig) -> Self {
        Self::new(Arc::new(NodeRegistry::with_builtins().await), config)
    }

    /// 设置规则链定义存储
    pub fn with_store(mut self, store: Arc<dyn RuleChainStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.node_registry
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_current_version(&self) -> u64 {
        self.version_manager.get_current_version()
    }

    /// 注册节点拦截器,对之后创建的执行器生效
    pub async fn add_node_interceptor(&self, interceptor: Arc<dyn NodeInterceptor>) {
        self.interceptor_manager
            .write()
            .await
            .register_node_interceptor(interceptor);
    }

    /// 注册消息拦截器,对之后创建的执行器生效
    pub async fn add_msg_interceptor(&self, interceptor: Arc<dyn MessageInterceptor>) {
        self.interceptor_manager
            .write()
            .await
            .register_msg_interceptor(interceptor);
    }

    /// 获取规则链执行器,不存在时创建
    ///
    /// 未提供规则链定义时从存储中加载;存储中也不存在则返回 `None`。
    /// 初始化失败的执行器不会被缓存。
    pub async fn get_executor(
        &self,
        rule_chain_id: Uuid,
        metadata: Option<ChainMetadata>,
    ) -> Result<Option<Arc<RuleChainExecutor>>, RuleError> {
        let mut executors = self.executors.lock().await;
        if let Some(executor) = executors.get(&rule_chain_id) {
            return Ok(Some(executor.clone()));
        }

        let metadata = match metadata {
            Some(metadata) => metadata,
            None => match self.load_metadata(rule_chain_id).await? {
                Some(metadata) => metadata,
                None => {
                    debug!("规则链 {} 不存在", rule_chain_id);
                    return Ok(None);
                }
            },
        };

        let executor = self.build_executor(rule_chain_id, metadata).await?;
        executors.insert(rule_chain_id, executor.clone());
        Ok(Some(executor))
    }

    /// 获取已缓存的执行器,不会触发创建
    pub async fn get_cached_executor(&self, rule_chain_id: Uuid) -> Option<Arc<RuleChainExecutor>> {
        self.executors.lock().await.get(&rule_chain_id).cloned()
    }

    /// 重载规则链执行器
    ///
    /// 在锁内把旧执行器移出缓存并放入初始化成功的新执行器,
    /// 释放锁之后再销毁旧执行器(等待其正在处理的消息完成),
    /// 因此其他规则链的提交不会被旧执行器的销毁阻塞。
    pub async fn reload_executor(
        &self,
        rule_chain_id: Uuid,
        metadata: ChainMetadata,
    ) -> Result<Arc<RuleChainExecutor>, RuleError> {
        let mut executors = self.executors.lock().await;
        let previous = executors.remove(&rule_chain_id);
        let result = self.build_executor(rule_chain_id, metadata).await;
        if let Ok(executor) = &result {
            executors.insert(rule_chain_id, executor.clone());
        }
        drop(executors);

        if let Some(previous) = previous {
            previous.destroy().await;
        }

        let executor = result?;
        info!(
            "规则链 {} 已重载, 版本: {:?}",
            rule_chain_id,
            executor.version().map(|v| v.version)
        );
        Ok(executor)
    }

    /// 销毁规则链执行器,不存在时什么也不做
    pub async fn destroy_executor(&self, rule_chain_id: Uuid) {
        let removed = self.executors.lock().await.remove(&rule_chain_id);
        if let Some(executor) = removed {
            executor.destroy().await;
        }
    }

    /// 销毁所有执行器
    pub async fn shutdown_executors(&self) {
        let drained: Vec<_> = self.executors.lock().await.drain().collect();
        for (rule_chain_id, executor) in drained {
            debug!("关闭规则链 {}", rule_chain_id);
            executor.destroy().await;
        }
        info!("规则引擎已关闭");
    }

    async fn load_metadata(&self, rule_chain_id: Uuid) -> Result<Option<ChainMetadata>, RuleError> {
        match &self.store {
            Some(store) => store.load_metadata(rule_chain_id).await,
            None => Ok(None),
        }
    }

    async fn build_executor(
        &self,
        rule_chain_id: Uuid,
        metadata: ChainMetadata,
    ) -> Result<Arc<RuleChainExecutor>, RuleError> {
        if metadata.rule_chain_id != rule_chain_id {
            return Err(RuleError::Config(format!(
                "规则链定义的标识 {} 与请求的 {} 不一致",
                metadata.rule_chain_id, rule_chain_id
            )));
        }

        let interceptors = Arc::new(self.interceptor_manager.read().await.clone());
        let mut executor = RuleChainExecutor::new(metadata, self.node_registry.clone())
            .with_interceptors(interceptors)
            .with_node_timeout(self.config.node_timeout())
            .with_max_node_executions(self.config.max_node_executions)
            .with_version(self.version_manager.create_version());
        if let Some(metrics) = &self.metrics {
            executor = executor.with_metrics(metrics.clone());
        }

        executor.init().await?;
        Ok(Arc::new(executor))
    }

    async fn require_executor(&self, rule_chain_id: Uuid) -> Result<Arc<RuleChainExecutor>, RuleError> {
        self.get_executor(rule_chain_id, None)
            .await?
            .ok_or(RuleError::ChainNotFound(rule_chain_id))
    }
}

#[async_trait]
impl RuleEngineTrait for RuleEngine {
    async fn submit(&self, rule_chain_id: Uuid, msg: Msg) -> Result<(), RuleError> {
        let executor = self.require_executor(rule_chain_id).await?;
        match executor.process_message(msg.clone()).await {
            // 取得引用后执行器被重载或销毁,改用缓存中的当前执行器
            Err(RuleError::ExecutorUnavailable(_)) => {
                debug!("规则链 {} 执行器已被替换, 重新提交消息 {}", rule_chain_id, msg.id);
                self.require_executor(rule_chain_id)
                    .await?
                    .process_message(msg)
                    .await
            }
            other => other,
        }
    }

    async fn reload(&self, rule_chain_id: Uuid, metadata: ChainMetadata) -> Result<(), RuleError> {
        self.reload_executor(rule_chain_id, metadata).await?;
        Ok(())
    }

    async fn destroy(&self, rule_chain_id: Uuid) {
        self.destroy_executor(rule_chain_id).await
    }

    async fn shutdown(&self) {
        self.shutdown_executors().await
    }

    async fn loaded_chains(&self) -> Vec<Uuid> {
        let mut ids: Vec<_> = self.executors.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    async fn get_registered_components(&self) -> Vec<NodeDescriptor> {
        self.node_registry.get_descriptors().await
    }

    async fn register_node_type(&self, type_name: &str, factory: NodeFactory) {
        self.node_registry.register(type_name, factory).await;
    }
}
