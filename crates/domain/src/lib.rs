//! Gudgeon domain layer: pure value types shared by every other crate.
//! Nothing here depends on tokio, sqlx, or any wire-format crate — those
//! concerns live in the infrastructure layer.

pub mod cache_key;
pub mod config;
pub mod errors;
pub mod group;
pub mod protocol;
pub mod question;
pub mod record;
pub mod resolution;
pub mod resolver_def;
pub mod response;
pub mod rule;
pub mod source;

pub use cache_key::CacheKey;
pub use config::{CliOverrides, Config, ListActionConfig};
pub use errors::DomainError;
pub use group::{classify, BlockResponse, Consumer, Group, IpMatch, DEFAULT_GROUP, DEFAULT_RESOLVER};
pub use protocol::Protocol;
pub use question::{normalize_name, Question, Request};
pub use record::{RecordData, RecordType, ResourceRecord};
pub use resolution::{ResolutionResult, RuleMatch};
pub use resolver_def::{domain_glob_matches, BalanceStrategy, ResolverDef};
pub use response::{Response, ResponseCode};
pub use rule::{List, Rule, RuleAction, RuleStoreBackend};
pub use source::{Source, SourceSpec, Upstream, WorkerPoolConfig};
