use super::backend::Backend;
use super::suffix_trie::SuffixTrie;
use gudgeon_application::ports::BlockSource;
use std::collections::HashMap;

/// The compiled rule set for a single group: an allow trie (always exact,
/// lists are typically small) checked ahead of the configured block
/// backend. Allow always wins over block.
pub struct GroupIndex {
    allow: SuffixTrie,
    block: Backend,
    block_is_managed: bool,
}

impl GroupIndex {
    pub fn new(allow: SuffixTrie, block: Backend, block_is_managed: bool) -> Self {
        Self {
            allow,
            block,
            block_is_managed,
        }
    }

    pub fn allow_matches(&self, domain: &str) -> bool {
        self.allow.lookup(domain)
    }

    pub fn block_source(&self, domain: &str) -> Option<BlockSource> {
        if self.block.contains(domain) {
            Some(if self.block_is_managed {
                BlockSource::ManagedDomain
            } else {
                BlockSource::Blocklist
            })
        } else {
            None
        }
    }

    pub fn check(&self, domain: &str) -> Option<BlockSource> {
        if self.allow_matches(domain) {
            return None;
        }
        self.block_source(domain)
    }
}

/// All compiled group indexes, swapped in atomically on reload.
pub struct RuleIndex {
    pub groups: HashMap<String, GroupIndex>,
    pub total_blocked_domains: usize,
}

impl RuleIndex {
    pub fn check(&self, domain: &str, group: &str) -> Option<BlockSource> {
        self.groups.get(group).and_then(|g| g.check(domain))
    }

    /// Checks `domain` across every group in `groups`: an allow match in
    /// *any* of them suppresses a block from *any* of them, and only then
    /// does the first group (in order) with a block match win.
    pub fn check_any(&self, domain: &str, groups: &[String]) -> Option<BlockSource> {
        let allowed = groups
            .iter()
            .filter_map(|g| self.groups.get(g))
            .any(|g| g.allow_matches(domain));
        if allowed {
            return None;
        }

        groups
            .iter()
            .filter_map(|g| self.groups.get(g))
            .find_map(|g| g.block_source(domain))
    }
}
