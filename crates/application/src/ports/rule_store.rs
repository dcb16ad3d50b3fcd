use async_trait::async_trait;
use gudgeon_domain::DomainError;

/// Which filter layer produced a block decision, surfaced for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    Blocklist,
    ManagedDomain,
}

/// The compiled allow/block rule set for every group. Implementations own
/// the backend (memory, hash, bloom, sqlite, or a composite of those) but
/// all expose the same domain-fan-out contract: a domain is blocked for a
/// group if it (or any of its parent domains) appears in a block list
/// scoped to that group, unless it (or a parent) also appears in an allow
/// list scoped to that group — allow always wins over block.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Checks a domain against every group in `groups`, in order. An allow
    /// match in *any* of them suppresses a block from *any* of them; failing
    /// that, the first group (in order) with a block match wins. `None`
    /// means the domain is not blocked for this consumer at all.
    fn check(&self, domain: &str, groups: &[String]) -> Option<BlockSource>;

    /// Recompiles the rule set from its configured lists/sources. Returns
    /// the number of exact-match block entries after recompilation.
    async fn reload(&self) -> Result<usize, DomainError>;
}
