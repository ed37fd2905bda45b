pub mod aop;
pub mod components;
pub mod config;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod types;

pub use config::{EngineConfig, LogConfig};
pub use engine::{RuleChainExecutor, RuleEngine, RuleEngineTrait};
pub use types::*;
