use crate::types::relation::{FAILURE, FALSE, SUCCESS, TRUE};
use crate::types::{Msg, NodeDescriptor, RuleContext, RuleError, RuleNode};
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// 节点输出:一条消息及其连接标签
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    pub msg: Msg,
    pub label: String,
}

impl NodeOutput {
    pub fn labelled(msg: Msg, label: impl Into<String>) -> Self {
        Self {
            msg,
            label: label.into(),
        }
    }

    pub fn success(msg: Msg) -> Self {
        Self::labelled(msg, SUCCESS)
    }

    pub fn failure(msg: Msg) -> Self {
        Self::labelled(msg, FAILURE)
    }

    pub fn filter_result(msg: Msg, passed: bool) -> Self {
        Self::labelled(msg, if passed { TRUE } else { FALSE })
    }
}

/// 节点生命周期
#[async_trait]
pub trait NodeComponent: Send + Sync + std::fmt::Debug {
    /// 初始化节点,每个执行器生命周期内只调用一次
    ///
    /// 返回错误会导致整条规则链初始化失败。
    async fn init(&mut self, _definition: &RuleNode) -> Result<(), RuleError> {
        Ok(())
    }

    /// 释放节点资源,即使 `init` 失败也可以安全调用
    async fn destroy(&self) {}

    /// 获取节点描述符
    fn get_descriptor(&self) -> NodeDescriptor;
}

/// 节点处理器特征,所有节点都通过它被执行器调用
#[async_trait]
pub trait NodeHandler: NodeComponent {
    /// 处理消息
    ///
    /// # Arguments
    /// * `ctx` - 执行上下文
    /// * `msg` - 输入消息
    ///
    /// # Returns
    /// * 输出消息及其连接标签;返回错误时由执行器按 `Failure` 连接处理
    async fn on_msg(&self, ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError>;
}

/// 过滤节点:输出 `True` / `False`
#[async_trait]
pub trait FilterNode: NodeComponent {
    async fn filter(&self, ctx: &RuleContext, msg: &Msg) -> Result<bool, RuleError>;
}

/// 转换节点:输出新消息
#[async_trait]
pub trait TransformNode: NodeComponent {
    async fn transform(&self, ctx: &RuleContext, msg: &Msg) -> Result<Msg, RuleError>;
}

/// 动作节点:只产生副作用
#[async_trait]
pub trait ActionNode: NodeComponent {
    async fn execute(&self, ctx: &RuleContext, msg: &Msg) -> Result<(), RuleError>;
}

/// 富化节点:为消息补充信息
#[async_trait]
pub trait EnrichNode: NodeComponent {
    async fn enrich(&self, ctx: &RuleContext, msg: &Msg) -> Result<Msg, RuleError>;
}

/// 转换/富化的结果是新的逻辑消息:必须拥有新 `id`,并沿用原消息的 `rule_chain_id`
fn derive_msg(original: &Msg, mut derived: Msg) -> Msg {
    if derived.id == original.id {
        derived.id = Uuid::new_v4();
    }
    if derived.rule_chain_id.is_none() {
        derived.rule_chain_id = original.rule_chain_id;
    }
    derived
}

macro_rules! delegate_component {
    ($wrapper:ident, $bound:ident) => {
        #[async_trait]
        impl<N: $bound> NodeComponent for $wrapper<N> {
            async fn init(&mut self, definition: &RuleNode) -> Result<(), RuleError> {
                self.0.init(definition).await
            }

            async fn destroy(&self) {
                self.0.destroy().await
            }

            fn get_descriptor(&self) -> NodeDescriptor {
                self.0.get_descriptor()
            }
        }

        impl<N: $bound> $wrapper<N> {
            pub fn new(node: N) -> Self {
                Self(node)
            }

            pub fn boxed(node: N) -> Box<dyn NodeHandler>
            where
                N: 'static,
            {
                Box::new(Self(node))
            }

            pub fn inner(&self) -> &N {
                &self.0
            }
        }
    };
}

/// 过滤节点适配器
#[derive(Debug)]
pub struct Filter<N>(N);

/// 转换节点适配器
#[derive(Debug)]
pub struct Transformation<N>(N);

/// 动作节点适配器
#[derive(Debug)]
pub struct Action<N>(N);

/// 富化节点适配器
#[derive(Debug)]
pub struct Enrichment<N>(N);

delegate_component!(Filter, FilterNode);
delegate_component!(Transformation, TransformNode);
delegate_component!(Action, ActionNode);
delegate_component!(Enrichment, EnrichNode);

#[async_trait]
impl<N: FilterNode> NodeHandler for Filter<N> {
    async fn on_msg(&self, ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        let output = match self.0.filter(ctx, &msg).await {
            Ok(passed) => NodeOutput::filter_result(msg, passed),
            Err(e) => {
                debug!("过滤节点执行失败,转入 Failure: {}", e);
                NodeOutput::failure(msg)
            }
        };
        Ok(vec![output])
    }
}

#[async_trait]
impl<N: TransformNode> NodeHandler for Transformation<N> {
    async fn on_msg(&self, ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        let output = match self.0.transform(ctx, &msg).await {
            Ok(transformed) => NodeOutput::success(derive_msg(&msg, transformed)),
            Err(e) => {
                debug!("转换节点执行失败,转入 Failure: {}", e);
                NodeOutput::failure(msg)
            }
        };
        Ok(vec![output])
    }
}

#[async_trait]
impl<N: ActionNode> NodeHandler for Action<N> {
    async fn on_msg(&self, ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        let output = match self.0.execute(ctx, &msg).await {
            Ok(()) => NodeOutput::success(msg),
            Err(e) => {
                debug!("动作节点执行失败,转入 Failure: {}", e);
                NodeOutput::failure(msg)
            }
        };
        Ok(vec![output])
    }
}

#[async_trait]
impl<N: EnrichNode> NodeHandler for Enrichment<N> {
    async fn on_msg(&self, ctx: &RuleContext, msg: Msg) -> Result<Vec<NodeOutput>, RuleError> {
        let output = match self.0.enrich(ctx, &msg).await {
            Ok(enriched) => NodeOutput::success(derive_msg(&msg, enriched)),
            Err(e) => {
                debug!("富化节点执行失败,转入 Failure: {}", e);
                NodeOutput::failure(msg)
            }
        };
        Ok(vec![output])
    }
}
