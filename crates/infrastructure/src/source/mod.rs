mod dns;
mod hostfile;
mod zonefile;

pub use dns::DnsSource;
pub use hostfile::HostFileSource;
pub use zonefile::ZoneFileSource;

use async_trait::async_trait;
use gudgeon_domain::{DomainError, Question, Response};

/// A leaf origin of answers: a hosts file, a zone file, or a pool of
/// upstream DNS servers. `Named` sources are resolved by the resolver
/// graph itself (it needs visibility into the whole graph for cycle
/// detection), so they have no adapter here.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn resolve(&self, question: &Question) -> Result<Response, DomainError>;
}
