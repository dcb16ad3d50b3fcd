use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap;

/// Domain-fan-out matcher: a trie of reversed labels. Inserting `domain`
/// marks it and everything under it as matched, mirroring the rule store's
/// contract that listing `ads.example` also blocks `tracker.ads.example`.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
}

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// An exact (or bare subdomain-fanout) entry ends here: matches this
    /// node and everything under it.
    terminal: bool,
    /// A `*.suffix` entry ends here: matches everything under it, but not
    /// the node itself.
    wildcard: bool,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `domain`. A `*.` prefix marks the entry as matching only
    /// strict subdomains, leaving the bare suffix itself unmatched.
    pub fn insert(&mut self, domain: &str) {
        match domain.strip_prefix("*.") {
            Some(suffix) => self.insert_at(suffix, false),
            None => self.insert_at(domain, true),
        }
    }

    fn insert_at(&mut self, domain: &str, terminal: bool) {
        let mut node = &mut self.root;
        for label in domain.rsplit('.') {
            node = node
                .children
                .entry(CompactString::new(label))
                .or_default();
        }
        if terminal {
            node.terminal = true;
        } else {
            node.wildcard = true;
        }
    }

    /// True if `domain` or any of its parent domains was inserted, honoring
    /// `*.suffix` entries that exclude the bare suffix itself.
    pub fn lookup(&self, domain: &str) -> bool {
        let mut node = &self.root;
        let mut labels = domain.rsplit('.').peekable();
        while let Some(label) = labels.next() {
            match node.children.get(label) {
                Some(next) => {
                    if next.terminal {
                        return true;
                    }
                    if next.wildcard && labels.peek().is_some() {
                        return true;
                    }
                    node = next;
                }
                None => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_and_subdomains() {
        let mut trie = SuffixTrie::new();
        trie.insert("ads.example");
        assert!(trie.lookup("ads.example"));
        assert!(trie.lookup("tracker.ads.example"));
        assert!(!trie.lookup("example"));
        assert!(!trie.lookup("otherads.example"));
    }

    #[test]
    fn unrelated_domain_does_not_match() {
        let mut trie = SuffixTrie::new();
        trie.insert("ads.example");
        assert!(!trie.lookup("clean.example"));
    }

    #[test]
    fn wildcard_entry_excludes_bare_suffix() {
        let mut trie = SuffixTrie::new();
        trie.insert("*.tracker.example");
        assert!(trie.lookup("pixel.tracker.example"));
        assert!(!trie.lookup("tracker.example"));
    }
}
