use super::coarse_clock::coarse_now_secs;
use dashmap::DashMap;
use gudgeon_domain::{CacheKey, Response};
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::num::NonZeroUsize;
use std::sync::Mutex;

struct Entry {
    response: Response,
    stored_at: u64,
    ttl: u32,
}

/// A single group's bounded LRU cache. Records carry their own TTL; a read
/// past expiry is treated as a miss and evicted lazily rather than swept.
struct GroupCache {
    entries: Mutex<LruCache<CacheKey, Entry, FxBuildHasher>>,
}

impl GroupCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::with_hasher(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
                FxBuildHasher,
            )),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Response> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        let elapsed = coarse_now_secs().saturating_sub(entry.stored_at);
        if elapsed >= entry.ttl as u64 {
            entries.pop(key);
            return None;
        }
        let remaining = entry.ttl - elapsed as u32;
        let mut response = entry.response.clone();
        for answer in &mut response.answers {
            answer.ttl = answer.ttl.min(remaining);
        }
        Some(response)
    }

    fn put(&self, key: CacheKey, response: Response, ttl: u32) {
        let mut entries = self.entries.lock().unwrap();
        entries.put(
            key,
            Entry {
                response,
                stored_at: coarse_now_secs(),
                ttl,
            },
        );
    }
}

/// Per-group response cache implementing the application's `Cache` port.
/// Groups are created lazily on first use, each with its own LRU bound
/// (`capacity_per_group`), so one noisy group cannot evict another's
/// entries.
pub struct InMemoryCache {
    groups: DashMap<String, GroupCache, FxBuildHasher>,
    capacity_per_group: usize,
}

impl InMemoryCache {
    pub fn new(capacity_per_group: usize) -> Self {
        Self {
            groups: DashMap::with_hasher(FxBuildHasher),
            capacity_per_group,
        }
    }
}

impl gudgeon_application::ports::Cache for InMemoryCache {
    fn get(&self, group: &str, key: &CacheKey) -> Option<Response> {
        self.groups.get(group).and_then(|g| g.get(key))
    }

    fn put(&self, group: &str, key: CacheKey, response: Response, ttl: u32) {
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| GroupCache::new(self.capacity_per_group))
            .put(key, response, ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gudgeon_application::ports::Cache;
    use gudgeon_domain::{RecordType, ResourceRecord};
    use std::net::Ipv4Addr;

    fn sample_response(ttl: u32) -> Response {
        Response {
            code: gudgeon_domain::ResponseCode::NoError,
            answers: vec![ResourceRecord::new(
                "example.com",
                ttl,
                gudgeon_domain::RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
            )],
            authoritative: false,
        }
    }

    #[test]
    fn stores_and_retrieves_per_group() {
        let cache = InMemoryCache::new(10);
        let key = CacheKey::new("example.com", RecordType::A, 1);
        cache.put("default", key.clone(), sample_response(300), 300);
        assert!(cache.get("default", &key).is_some());
        assert!(cache.get("kids", &key).is_none());
    }
}
