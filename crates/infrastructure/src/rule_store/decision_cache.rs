use compact_str::CompactString;
use dashmap::DashMap;
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(60);
const L0_CAPACITY: usize = 256;

type Key = (CompactString, CompactString);
type BlockL0Cache = LruCache<Key, (Option<bool>, Instant), FxBuildHasher>;

thread_local! {
    static BLOCK_L0: RefCell<BlockL0Cache> = RefCell::new(LruCache::with_hasher(
        NonZeroUsize::new(L0_CAPACITY).unwrap(),
        FxBuildHasher,
    ));
}

#[inline]
pub fn decision_l0_get(domain: &str, group: &str) -> Option<Option<bool>> {
    BLOCK_L0.with(|c| {
        let mut c = c.borrow_mut();
        let key = (CompactString::new(domain), CompactString::new(group));
        if let Some((blocked, inserted_at)) = c.get(&key) {
            if inserted_at.elapsed() < TTL {
                return Some(*blocked);
            }
            c.pop(&key);
        }
        None
    })
}

#[inline]
pub fn decision_l0_set(domain: &str, group: &str, blocked: Option<bool>) {
    BLOCK_L0.with(|c| {
        c.borrow_mut().put(
            (CompactString::new(domain), CompactString::new(group)),
            (blocked, Instant::now()),
        );
    });
}

pub fn decision_l0_clear() {
    BLOCK_L0.with(|c| c.borrow_mut().clear());
}

/// Shared (cross-thread) decision cache, consulted when the thread-local L0
/// misses. `blocked` here is a simple bool (is this domain blocked for this
/// group); which `BlockSource` applies is re-derived from the index on the
/// rare miss path, since that only matters for logging.
pub struct DecisionCache {
    inner: DashMap<Key, (bool, Instant), FxBuildHasher>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self {
            inner: DashMap::with_hasher(FxBuildHasher),
        }
    }

    #[inline]
    pub fn get(&self, domain: &str, group: &str) -> Option<bool> {
        let key = (CompactString::new(domain), CompactString::new(group));
        if let Some(entry) = self.inner.get(&key) {
            let (blocked, inserted_at) = *entry;
            if inserted_at.elapsed() < TTL {
                return Some(blocked);
            }
            drop(entry);
            self.inner.remove(&key);
        }
        None
    }

    #[inline]
    pub fn set(&self, domain: &str, group: &str, blocked: bool) {
        self.inner.insert(
            (CompactString::new(domain), CompactString::new(group)),
            (blocked, Instant::now()),
        );
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new()
    }
}
