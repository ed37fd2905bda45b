use crate::config::LogConfig;
use crate::types::RuleError;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// `RUST_LOG` 环境变量优先于配置中的日志级别。重复初始化返回错误。
pub fn init_tracing(config: &LogConfig) -> Result<(), RuleError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RuleError::Config(format!("无效的日志级别 {}: {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| RuleError::Config(format!("日志初始化失败: {}", e)))
}
