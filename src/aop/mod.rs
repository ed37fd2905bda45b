use crate::engine::NodeOutput;
use crate::types::{Msg, NodeContext, RuleError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 节点拦截器特征,用于在节点执行的不同阶段进行拦截处理
#[async_trait]
pub trait NodeInterceptor: Send + Sync + std::fmt::Debug {
    /// 节点执行前的拦截处理
    ///
    /// # Arguments
    /// * `ctx` - 节点调用上下文
    /// * `msg` - 待处理的消息
    async fn before<'a>(&self, ctx: &NodeContext<'a>, msg: &Msg) -> Result<(), RuleError>;

    /// 节点执行后的拦截处理
    ///
    /// # Arguments
    /// * `ctx` - 节点调用上下文
    /// * `outputs` - 节点输出
    async fn after<'a>(&self, ctx: &NodeContext<'a>, outputs: &[NodeOutput])
        -> Result<(), RuleError>;

    /// 节点执行出错时的拦截处理
    ///
    /// # Arguments
    /// * `ctx` - 节点调用上下文
    /// * `error` - 错误信息
    async fn error<'a>(&self, ctx: &NodeContext<'a>, error: &RuleError) -> Result<(), RuleError>;
}

/// 消息拦截器特征,用于在消息处理的不同阶段进行拦截处理
#[async_trait]
pub trait MessageInterceptor: Send + Sync + std::fmt::Debug {
    /// 消息进入规则链前
    async fn before_process(&self, msg: &Msg) -> Result<(), RuleError>;

    /// 消息在规则链中的遍历结束后
    async fn after_process(&self, msg: &Msg) -> Result<(), RuleError>;
}

/// 拦截器管理器,用于管理和执行所有注册的拦截器
///
/// 拦截器失败只记录日志,不会影响消息路由。
#[derive(Debug, Clone, Default)]
pub struct InterceptorManager {
    /// 已注册的节点拦截器列表
    node_interceptors: Vec<Arc<dyn NodeInterceptor>>,
    /// 已注册的消息拦截器列表
    msg_interceptors: Vec<Arc<dyn MessageInterceptor>>,
}

impl InterceptorManager {
    /// 创建新的拦截器管理器实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建包含调试日志拦截器的管理器
    pub fn with_debug_logging() -> Self {
        let mut manager = Self::new();
        manager.register_node_interceptor(Arc::new(DebugInterceptor));
        manager
    }

    /// 注册节点拦截器
    pub fn register_node_interceptor(&mut self, interceptor: Arc<dyn NodeInterceptor>) {
        self.node_interceptors.push(interceptor);
    }

    /// 注册消息拦截器
    pub fn register_msg_interceptor(&mut self, interceptor: Arc<dyn MessageInterceptor>) {
        self.msg_interceptors.push(interceptor);
    }

    /// 执行所有节点前置拦截器
    pub async fn before_node<'a>(&self, ctx: &NodeContext<'a>, msg: &Msg) {
        for interceptor in &self.node_interceptors {
            if let Err(e) = interceptor.before(ctx, msg).await {
                error!("节点前置拦截器 {:?} 执行失败: {}", interceptor, e);
            }
        }
    }

    /// 执行所有节点后置拦截器
    pub async fn after_node<'a>(&self, ctx: &NodeContext<'a>, outputs: &[NodeOutput]) {
        for interceptor in &self.node_interceptors {
            if let Err(e) = interceptor.after(ctx, outputs).await {
                error!("节点后置拦截器 {:?} 执行失败: {}", interceptor, e);
            }
        }
    }

    /// 执行所有节点错误拦截器
    pub async fn node_error<'a>(&self, ctx: &NodeContext<'a>, err: &RuleError) {
        for interceptor in &self.node_interceptors {
            if let Err(e) = interceptor.error(ctx, err).await {
                error!("节点错误拦截器 {:?} 执行失败: {}", interceptor, e);
            }
        }
    }

    /// 执行所有消息前置拦截器
    pub async fn before_process(&self, msg: &Msg) {
        debug!("执行消息前置拦截器");
        for interceptor in &self.msg_interceptors {
            if let Err(e) = interceptor.before_process(msg).await {
                error!("消息前置拦截器 {:?} 执行失败: {}", interceptor, e);
            }
        }
    }

    /// 执行所有消息后置拦截器
    pub async fn after_process(&self, msg: &Msg) {
        debug!("执行消息后置拦截器");
        for interceptor in &self.msg_interceptors {
            if let Err(e) = interceptor.after_process(msg).await {
                error!("消息后置拦截器 {:?} 执行失败: {}", interceptor, e);
            }
        }
    }
}

/// 调试拦截器,只记录开启了 `debug_mode` 的节点
#[derive(Debug)]
pub struct DebugInterceptor;

#[async_trait]
impl NodeInterceptor for DebugInterceptor {
    async fn before<'a>(&self, ctx: &NodeContext<'a>, msg: &Msg) -> Result<(), RuleError> {
        if ctx.node.debug_mode {
            info!(
                execution_id = %ctx.rule.execution_id,
                "节点 [{}] 输入消息: id={}, type={}, data={}",
                ctx.node.label(),
                msg.id,
                msg.msg_type,
                msg.data
            );
        }
        Ok(())
    }

    async fn after<'a>(
        &self,
        ctx: &NodeContext<'a>,
        outputs: &[NodeOutput],
    ) -> Result<(), RuleError> {
        if ctx.node.debug_mode {
            for output in outputs {
                info!(
                    execution_id = %ctx.rule.execution_id,
                    "节点 [{}] 输出 [{}]: id={}, data={}",
                    ctx.node.label(),
                    output.label,
                    output.msg.id,
                    output.msg.data
                );
            }
        }
        Ok(())
    }

    async fn error<'a>(&self, ctx: &NodeContext<'a>, error: &RuleError) -> Result<(), RuleError> {
        if ctx.node.debug_mode {
            info!(
                execution_id = %ctx.rule.execution_id,
                "节点 [{}] 执行出错: {}",
                ctx.node.label(),
                error
            );
        }
        Ok(())
    }
}

/// 消息日志拦截器,用于记录消息处理的关键信息
#[derive(Debug)]
pub struct MessageLoggingInterceptor;

#[async_trait]
impl MessageInterceptor for MessageLoggingInterceptor {
    async fn before_process(&self, msg: &Msg) -> Result<(), RuleError> {
        debug!("开始处理消息: {:?}", msg);
        Ok(())
    }

    async fn after_process(&self, msg: &Msg) -> Result<(), RuleError> {
        debug!("消息处理完成: {}", msg.id);
        Ok(())
    }
}
