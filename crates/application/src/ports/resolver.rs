use async_trait::async_trait;
use gudgeon_domain::{DomainError, Question, Response};

/// The resolver graph: dispatches a question to a specific named resolver,
/// retrying non-FQDN names under its `search` suffixes and fanning out to
/// its sources in `balance` order. The engine — not the graph — decides
/// *which* resolver to try for a given group, since resolver scoping is a
/// per-group concern; the graph only knows how to run one resolver once
/// it's been named. Named-source references are internal recursion, not
/// separate ports, so cycle detection can use one request-scoped visited
/// set (see the resolver graph's design notes).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `question` via the resolver named `resolver_name`. On
    /// success, returns the response plus the identifier (a source or
    /// nested-resolver name) that ultimately produced it, for attribution.
    /// `DomainError::ResolverNotFound` means the name isn't configured at
    /// all; `DomainError::ResolverSkipped` means it exists but its
    /// `domains` glob doesn't cover this query — distinct signals so the
    /// engine can tell "nothing here" from "try the next group".
    async fn resolve_named(
        &self,
        resolver_name: &str,
        question: &Question,
    ) -> Result<(Response, String), DomainError>;
}
