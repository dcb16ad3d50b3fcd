use gudgeon_domain::{CacheKey, Response};

/// Per-group response memoization. Implementations own TTL clamping and
/// eviction; this port only exposes the read/write contract the engine
/// needs.
pub trait Cache: Send + Sync {
    /// Returns a copy of the cached response for `(group, key)` with its
    /// answer TTLs decremented by the time elapsed since it was stored (never
    /// below 1), or `None` on a miss or fully-expired entry.
    fn get(&self, group: &str, key: &CacheKey) -> Option<Response>;

    /// Stores `response` for `(group, key)`. A TTL of 0 (computed by the
    /// caller as `clamp(minTTL-of-RRset, globalMin, globalMax)`) means the
    /// response must not be cached at all.
    fn put(&self, group: &str, key: CacheKey, response: Response, ttl: u32);

    /// Checks every group in order, returning the first hit. Mirrors the
    /// rule store's `IsMatchAny` fan-out so a consumer with several groups
    /// isn't limited to its first one.
    fn get_any(&self, groups: &[String], key: &CacheKey) -> Option<Response> {
        groups.iter().find_map(|group| self.get(group, key))
    }
}
