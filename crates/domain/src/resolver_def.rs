#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceStrategy {
    #[default]
    Sequential,
    RoundRobin,
}

/// A named resolver: an ordered list of source names to try, filtered to the
/// domains it is responsible for and the search suffixes it should retry
/// non-FQDN queries under.
#[derive(Debug, Clone)]
pub struct ResolverDef {
    pub name: String,
    /// Glob patterns this resolver answers for. `*` (or an empty list)
    /// matches every domain.
    pub domains: Vec<String>,
    /// Suffixes appended, in order, to retry a query that the bare name
    /// failed to resolve (NXDOMAIN) under.
    pub search: Vec<String>,
    pub balance: BalanceStrategy,
    pub sources: Vec<String>,
}

impl ResolverDef {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            domains: Vec::new(),
            search: Vec::new(),
            balance: BalanceStrategy::Sequential,
            sources,
        }
    }

    /// Whether this resolver claims responsibility for `name`, per its
    /// `domains` glob list. An empty list (or a literal `"*"` entry) means
    /// "handles everything".
    pub fn handles(&self, name: &str) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        self.domains.iter().any(|pat| domain_glob_matches(pat, name))
    }
}

/// Matches a single glob pattern against a normalized (lower-case, no
/// trailing dot) domain name. Supports:
/// - `*` alone: matches anything.
/// - `*.suffix`: matches `suffix` itself and any strict subdomain of it.
/// - a bare domain: matches itself and any subdomain (so `corp.example`
///   covers `a.corp.example` too), mirroring how the rule store's domain
///   fan-out treats a listed domain as covering its subdomains.
pub fn domain_glob_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let suffix = pattern.strip_prefix("*.").unwrap_or(pattern);
    name == suffix || name.ends_with(&format!(".{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(domain_glob_matches("*", "anything.example"));
    }

    #[test]
    fn suffix_pattern_matches_subdomains_and_itself() {
        assert!(domain_glob_matches("*.corp.example", "corp.example"));
        assert!(domain_glob_matches("*.corp.example", "a.corp.example"));
        assert!(!domain_glob_matches("*.corp.example", "notcorp.example"));
    }

    #[test]
    fn bare_domain_covers_subdomains() {
        assert!(domain_glob_matches("corp.example", "a.b.corp.example"));
        assert!(!domain_glob_matches("corp.example", "othercorp.example"));
    }
}
