use super::bloom::AtomicBloom;
use super::suffix_trie::SuffixTrie;
use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use std::collections::HashSet;

/// Candidate suffixes to test for domain fan-out, longest first:
/// `a.b.example` yields `a.b.example`, `b.example`, `example`.
fn fan_out(domain: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(domain);
    std::iter::from_fn(move || {
        let current = rest?;
        rest = current.split_once('.').map(|(_, tail)| tail);
        Some(current)
    })
}

fn hash64(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

fn hash32(s: &str) -> u32 {
    (hash64(s) & 0xFFFF_FFFF) as u32
}

/// Hash/bloom backends have no trie structure to anchor a "subdomains only,
/// not the suffix itself" match on, so a `*.suffix` entry degrades to a
/// plain fan-out entry on the bare suffix (over-blocking the suffix itself
/// rather than under-blocking its subdomains).
fn strip_wildcard(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// A compiled, queryable form of a group's exact/fan-out domain set. Each
/// variant trades memory footprint against false-positive tolerance; all
/// expose the same `contains` contract (true if `domain` or a parent of it
/// was loaded).
pub enum Backend {
    /// Reversed-label trie; exact, no false positives, moderate memory use.
    Memory(SuffixTrie),
    /// Fan-out exact match against a 32-bit hash set. Cheaper than `Memory`
    /// for very large lists at the cost of rare hash collisions.
    Hash32(HashSet<u32, FxBuildHasher>),
    Hash64(HashSet<u64, FxBuildHasher>),
    /// Fan-out probabilistic membership only: every hit is authoritative
    /// for "blocked", since the bloom filter is the only structure backing
    /// this variant — configured only when the list is trusted to be
    /// false-positive-tolerant.
    Bloom(AtomicBloom),
    /// Bloom fast-reject in front of an exact set sourced from sqlite.
    BloomSqlite(AtomicBloom, HashSet<CompactString, FxBuildHasher>),
    /// Hash fast-reject in front of an exact set sourced from sqlite.
    HashSqlite(HashSet<u64, FxBuildHasher>, HashSet<CompactString, FxBuildHasher>),
}

impl Backend {
    pub fn memory(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut trie = SuffixTrie::new();
        for d in domains {
            trie.insert(d.as_ref());
        }
        Backend::Memory(trie)
    }

    pub fn hash32(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let set = domains
            .into_iter()
            .map(|d| hash32(strip_wildcard(d.as_ref())))
            .collect();
        Backend::Hash32(set)
    }

    pub fn hash64(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let set = domains
            .into_iter()
            .map(|d| hash64(strip_wildcard(d.as_ref())))
            .collect();
        Backend::Hash64(set)
    }

    pub fn bloom(domains: impl IntoIterator<Item = impl AsRef<str>>, capacity: usize) -> Self {
        let bloom = AtomicBloom::new(capacity.max(1000), 0.001);
        for d in domains {
            bloom.set(strip_wildcard(d.as_ref()));
        }
        Backend::Bloom(bloom)
    }

    pub fn bloom_sqlite(
        domains: impl IntoIterator<Item = impl AsRef<str>>,
        capacity: usize,
    ) -> Self {
        let bloom = AtomicBloom::new(capacity.max(1000), 0.001);
        let mut exact = HashSet::with_hasher(FxBuildHasher);
        for d in domains {
            let d = strip_wildcard(d.as_ref());
            bloom.set(d);
            exact.insert(CompactString::new(d));
        }
        Backend::BloomSqlite(bloom, exact)
    }

    pub fn hash_sqlite(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut hashes = HashSet::with_hasher(FxBuildHasher);
        let mut exact = HashSet::with_hasher(FxBuildHasher);
        for d in domains {
            let d = strip_wildcard(d.as_ref());
            hashes.insert(hash64(d));
            exact.insert(CompactString::new(d));
        }
        Backend::HashSqlite(hashes, exact)
    }

    pub fn contains(&self, domain: &str) -> bool {
        match self {
            Backend::Memory(trie) => trie.lookup(domain),
            Backend::Hash32(set) => fan_out(domain).any(|s| set.contains(&hash32(s))),
            Backend::Hash64(set) => fan_out(domain).any(|s| set.contains(&hash64(s))),
            Backend::Bloom(bloom) => fan_out(domain).any(|s| bloom.check(s)),
            Backend::BloomSqlite(bloom, exact) => fan_out(domain)
                .any(|s| bloom.check(s) && exact.contains(s)),
            Backend::HashSqlite(hashes, exact) => fan_out(domain)
                .any(|s| hashes.contains(&hash64(s)) && exact.contains(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_matches_subdomains() {
        let backend = Backend::memory(["ads.example"]);
        assert!(backend.contains("tracker.ads.example"));
        assert!(!backend.contains("clean.example"));
    }

    #[test]
    fn hash64_backend_matches_subdomains() {
        let backend = Backend::hash64(["ads.example"]);
        assert!(backend.contains("ads.example"));
        assert!(backend.contains("x.ads.example"));
        assert!(!backend.contains("clean.example"));
    }

    #[test]
    fn bloom_sqlite_requires_exact_confirmation() {
        let backend = Backend::bloom_sqlite(["ads.example"], 100);
        assert!(backend.contains("ads.example"));
        assert!(!backend.contains("unrelated.example"));
    }
}
