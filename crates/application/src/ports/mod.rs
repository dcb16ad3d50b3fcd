pub mod cache;
pub mod resolver;
pub mod rule_store;

pub use cache::Cache;
pub use resolver::Resolver;
pub use rule_store::{BlockSource, RuleStore};
