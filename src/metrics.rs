//! 规则引擎监控指标
//!
//! 开启 `metrics` 特性时基于 prometheus 计数,否则所有方法为空操作。

/// 分支被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 节点失败且没有 `Failure` 连接
    NoFailureRoute,
    /// 节点下标不存在
    UnknownNode,
    /// 超过单次遍历的节点调用上限
    ExecutionLimit,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoFailureRoute => "no_failure_route",
            DropReason::UnknownNode => "unknown_node",
            DropReason::ExecutionLimit => "execution_limit",
        }
    }
}

#[cfg(feature = "metrics")]
mod imp {
    use super::DropReason;
    use crate::types::RuleError;
    use prometheus::{IntCounterVec, Opts, Registry};
    use std::fmt;
    use uuid::Uuid;

    #[derive(Clone)]
    pub struct EngineMetrics {
        registry: Registry,
        messages: IntCounterVec,
        node_failures: IntCounterVec,
        dropped_branches: IntCounterVec,
    }

    impl EngineMetrics {
        pub fn new() -> Result<Self, RuleError> {
            Self::with_registry(Registry::new())
        }

        /// 在指定的 prometheus 注册表上创建指标
        pub fn with_registry(registry: Registry) -> Result<Self, RuleError> {
            let messages = IntCounterVec::new(
                Opts::new("rule_engine_messages_total", "Messages submitted to a rule chain"),
                &["chain"],
            )
            .map_err(metrics_error)?;
            let node_failures = IntCounterVec::new(
                Opts::new(
                    "rule_engine_node_failures_total",
                    "Node invocations that returned an error",
                ),
                &["chain"],
            )
            .map_err(metrics_error)?;
            let dropped_branches = IntCounterVec::new(
                Opts::new(
                    "rule_engine_dropped_branches_total",
                    "Branches abandoned during a graph walk",
                ),
                &["chain", "reason"],
            )
            .map_err(metrics_error)?;

            registry
                .register(Box::new(messages.clone()))
                .map_err(metrics_error)?;
            registry
                .register(Box::new(node_failures.clone()))
                .map_err(metrics_error)?;
            registry
                .register(Box::new(dropped_branches.clone()))
                .map_err(metrics_error)?;

            Ok(Self {
                registry,
                messages,
                node_failures,
                dropped_branches,
            })
        }

        pub fn registry(&self) -> &Registry {
            &self.registry
        }

        pub fn message_submitted(&self, chain: Uuid) {
            self.messages
                .with_label_values(&[&chain.to_string()])
                .inc();
        }

        pub fn node_failed(&self, chain: Uuid) {
            self.node_failures
                .with_label_values(&[&chain.to_string()])
                .inc();
        }

        pub fn branch_dropped(&self, chain: Uuid, reason: DropReason) {
            self.dropped_branches
                .with_label_values(&[&chain.to_string(), reason.as_str()])
                .inc();
        }

        pub fn messages_total(&self, chain: Uuid) -> u64 {
            self.messages.with_label_values(&[&chain.to_string()]).get()
        }

        pub fn node_failures_total(&self, chain: Uuid) -> u64 {
            self.node_failures
                .with_label_values(&[&chain.to_string()])
                .get()
        }

        pub fn dropped_total(&self, chain: Uuid, reason: DropReason) -> u64 {
            self.dropped_branches
                .with_label_values(&[&chain.to_string(), reason.as_str()])
                .get()
        }
    }

    impl fmt::Debug for EngineMetrics {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("EngineMetrics")
                .field("registry", &"<prometheus registry>")
                .finish()
        }
    }

    fn metrics_error(e: prometheus::Error) -> RuleError {
        RuleError::Metrics(e.to_string())
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    use super::DropReason;
    use crate::types::RuleError;
    use uuid::Uuid;

    #[derive(Debug, Clone, Default)]
    pub struct EngineMetrics;

    impl EngineMetrics {
        pub fn new() -> Result<Self, RuleError> {
            Ok(Self)
        }

        pub fn message_submitted(&self, _chain: Uuid) {}

        pub fn node_failed(&self, _chain: Uuid) {}

        pub fn branch_dropped(&self, _chain: Uuid, _reason: DropReason) {}

        pub fn messages_total(&self, _chain: Uuid) -> u64 {
            0
        }

        pub fn node_failures_total(&self, _chain: Uuid) -> u64 {
            0
        }

        pub fn dropped_total(&self, _chain: Uuid, _reason: DropReason) -> u64 {
            0
        }
    }
}

pub use imp::EngineMetrics;
