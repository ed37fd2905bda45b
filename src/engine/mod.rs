mod executor;
mod node;
mod registry;
pub mod rule;
mod store;
mod version;

pub use executor::*;
pub use node::*;
pub use registry::*;
pub use rule::{DynRuleEngine, RuleEngine, RuleEngineTrait};
pub use store::*;
pub use version::*;
